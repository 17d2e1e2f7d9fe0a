//! Teams-style Adaptive Card webhook effector.

use serde_json::json;

use crate::config::ActionsConfig;
use crate::errors::{BctbError, Result};
use crate::types::{ActionDetails, RequestedAction, Severity};

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "attention",
        Severity::Medium => "warning",
        Severity::Low => "good",
    }
}

pub async fn send(
    request: &RequestedAction,
    agent_name: &str,
    config: &ActionsConfig,
    client: &reqwest::Client,
) -> Result<ActionDetails> {
    let url = config
        .teams_webhook
        .url
        .as_deref()
        .ok_or_else(|| BctbError::action("chat-webhook: no URL configured"))?;

    let card = json!({
        "type": "message",
        "attachments": [{
            "contentType": "application/vnd.microsoft.card.adaptive",
            "content": {
                "type": "AdaptiveCard",
                "version": "1.4",
                "body": [
                    {"type": "TextBlock", "text": request.title, "weight": "bolder", "color": severity_color(request.severity)},
                    {"type": "TextBlock", "text": request.message, "wrap": true},
                    {"type": "FactSet", "facts": [
                        {"title": "Severity", "value": format!("{:?}", request.severity)},
                        {"title": "Agent", "value": agent_name},
                    ]},
                ],
            },
        }],
    });

    let resp = client.post(url).json(&card).send().await?;
    if !resp.status().is_success() {
        return Err(BctbError::action(format!(
            "chat-webhook failed with status {}",
            resp.status()
        )));
    }

    Ok(ActionDetails {
        title: Some(request.title.clone()),
        severity: Some(format!("{:?}", request.severity).to_lowercase()),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_card_color() {
        assert_eq!(severity_color(Severity::High), "attention");
        assert_eq!(severity_color(Severity::Medium), "warning");
        assert_eq!(severity_color(Severity::Low), "good");
    }
}
