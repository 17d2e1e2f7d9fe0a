//! Generic outbound webhook effector.

use serde_json::json;

use crate::config::ActionsConfig;
use crate::errors::{BctbError, Result};
use crate::types::{ActionDetails, RequestedAction};

pub async fn send(
    request: &RequestedAction,
    agent_name: &str,
    config: &ActionsConfig,
    client: &reqwest::Client,
) -> Result<ActionDetails> {
    let webhook = &config.generic_webhook;
    let url = webhook
        .url
        .as_deref()
        .ok_or_else(|| BctbError::action("generic-webhook: no URL configured"))?;
    let method = webhook.method.as_deref().unwrap_or("POST").to_uppercase();

    let body = request.webhook_payload.clone().unwrap_or_else(|| {
        json!({
            "title": request.title,
            "message": request.message,
            "severity": format!("{:?}", request.severity).to_lowercase(),
            "agent": agent_name,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    });

    let mut builder = match method.as_str() {
        "PUT" => client.put(url),
        "PATCH" => client.patch(url),
        _ => client.post(url),
    };
    for (key, value) in &webhook.headers {
        builder = builder.header(key, value);
    }

    let resp = builder
        .json(&body)
        .send()
        .await
        .map_err(|e| BctbError::action(format!("generic-webhook: request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(BctbError::action(format!(
            "generic-webhook: request failed with status {}",
            resp.status()
        )));
    }

    Ok(ActionDetails {
        title: Some(request.title.clone()),
        severity: Some(format!("{:?}", request.severity).to_lowercase()),
        error: None,
    })
}
