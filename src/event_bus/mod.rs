//! A small pub/sub facade over `tokio::sync::broadcast`, used to deliver
//! `ToolCompleted`/`ToolFailed` telemetry (§4.2.4) and server lifecycle
//! notices without coupling callers to a transport.
//!
//! Publish failures — no subscribers, a lagging receiver — are swallowed:
//! emitting one of these events is always a best-effort side effect, never
//! a reason to fail the call that triggered it.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AppEvent {
    ToolCompleted {
        tool: String,
        duration_ms: u64,
        profile_hash: String,
    },
    ToolFailed {
        tool: String,
        duration_ms: u64,
        profile_hash: String,
        error: String,
    },
    ServerStarted {
        addr: String,
    },
    Error {
        message: String,
    },
}

pub trait EventBus: Send + Sync {
    fn publish(&self, event: AppEvent);
    fn subscribe(&self) -> broadcast::Receiver<AppEvent>;
}

/// Production sink: a bounded broadcast channel. Slow or absent
/// subscribers never block a publisher.
pub struct TokioBroadcastBus {
    sender: broadcast::Sender<AppEvent>,
}

impl TokioBroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for TokioBroadcastBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus for TokioBroadcastBus {
    fn publish(&self, event: AppEvent) {
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

/// Default sink when nothing is listening: publishing is a no-op and
/// `subscribe` hands back a receiver on a channel that never sends.
pub struct NullBus {
    sender: broadcast::Sender<AppEvent>,
}

impl NullBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }
}

impl Default for NullBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for NullBus {
    fn publish(&self, _event: AppEvent) {}

    fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

/// Truncated hash of a profile name for `ToolCompleted`/`ToolFailed`
/// events, so the bus carries a stable-but-opaque profile identifier
/// rather than the name itself.
pub fn profile_hash(profile_name: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(profile_name.as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bus_publish_never_panics() {
        let bus = NullBus::new();
        bus.publish(AppEvent::ServerStarted { addr: "x".into() });
    }

    #[test]
    fn broadcast_bus_delivers_to_subscriber() {
        let bus = TokioBroadcastBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(AppEvent::ServerStarted {
            addr: "0.0.0.0:8080".into(),
        });
        let received = rx.try_recv().unwrap();
        matches!(received, AppEvent::ServerStarted { .. });
    }

    #[test]
    fn profile_hash_is_16_chars_and_stable() {
        let a = profile_hash("default");
        let b = profile_hash("default");
        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
    }
}
