//! Microsoft Graph `sendMail` effector: client-credentials token
//! acquisition followed by a `sendMail` POST.

use std::env;

use serde_json::json;

use crate::config::ActionsConfig;
use crate::errors::{BctbError, Result};
use crate::types::{ActionDetails, RequestedAction, Severity};

async fn acquire_graph_token(tenant_id: &str, client_id: &str, client: &reqwest::Client) -> Result<String> {
    let client_secret = env::var("GRAPH_CLIENT_SECRET")
        .map_err(|_| BctbError::action("email-graph: GRAPH_CLIENT_SECRET is not set"))?;

    let resp = client
        .post(format!(
            "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"
        ))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret.as_str()),
            ("scope", "https://graph.microsoft.com/.default"),
        ])
        .send()
        .await
        .map_err(|e| BctbError::action(format!("email-graph: token request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(BctbError::action(format!(
            "email-graph: token request failed with status {}",
            resp.status()
        )));
    }

    let body: serde_json::Value = resp.json().await?;
    body.get("access_token")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| BctbError::action("email-graph: token response missing access_token"))
}

pub async fn send(
    request: &RequestedAction,
    config: &ActionsConfig,
    client: &reqwest::Client,
) -> Result<ActionDetails> {
    let graph = &config.email_graph;
    let tenant_id = graph
        .tenant_id
        .as_deref()
        .ok_or_else(|| BctbError::action("email-graph: no tenantId configured"))?;
    let client_id = graph
        .client_id
        .as_deref()
        .ok_or_else(|| BctbError::action("email-graph: no clientId configured"))?;
    let from = graph
        .from
        .as_deref()
        .ok_or_else(|| BctbError::action("email-graph: no from address configured"))?;

    let recipients = request
        .recipients
        .clone()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| graph.default_recipients.clone());
    if recipients.is_empty() {
        return Err(BctbError::action("email-graph: no recipients"));
    }

    let token = acquire_graph_token(tenant_id, client_id, client).await?;

    let body = json!({
        "message": {
            "subject": request.title,
            "body": {"contentType": "Text", "content": request.message},
            "toRecipients": recipients.iter().map(|r| json!({"emailAddress": {"address": r}})).collect::<Vec<_>>(),
        },
        "saveToSentItems": false,
    });

    let resp = client
        .post(format!("https://graph.microsoft.com/v1.0/users/{from}/sendMail"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .map_err(|e| BctbError::action(format!("email-graph: send failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(BctbError::action(format!(
            "email-graph: send failed with status {}",
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

    #[tokio::test]
    async fn missing_tenant_id_fails_before_any_network_call() {
        let config = ActionsConfig::default();
        let client = reqwest::Client::new();
        let request = RequestedAction {
            action_type: crate::types::ActionType::EmailGraph,
            title: "t".into(),
            message: "m".into(),
            severity: Severity::Low,
            recipients: Some(vec!["a@b.com".into()]),
            webhook_payload: None,
            investigation_id: None,
            issue_id: None,
        };
        let err = send(&request, &config, &client).await.unwrap_err();
        assert!(err.to_string().contains("tenantId"));
    }
}
