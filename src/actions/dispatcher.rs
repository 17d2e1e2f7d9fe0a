//! `dispatch(requested, agentName) -> AgentAction[]` (§4.4). Every
//! requested action is attempted independently; one effector's failure
//! never prevents another from running. `run` is always left at `0` —
//! only `Context::update_state` (see [`crate::context::update_state`])
//! assigns the real run id.

use chrono::Utc;

use crate::config::ActionsConfig;
use crate::types::{ActionStatus, ActionType, AgentAction, RequestedAction};

use super::effectors::{email_graph, email_smtp, pipeline, teams, webhook};

#[tracing::instrument(name = "actions.dispatch", skip(requested, config, client), fields(agent = %agent_name, count = requested.len()))]
pub async fn dispatch(
    requested: &[RequestedAction],
    agent_name: &str,
    config: &ActionsConfig,
    client: &reqwest::Client,
) -> Vec<AgentAction> {
    let mut actions = Vec::with_capacity(requested.len());
    for request in requested {
        let result = match request.action_type {
            ActionType::TeamsWebhook => teams::send(request, agent_name, config, client).await,
            ActionType::EmailSmtp => email_smtp::send(request, config).await,
            ActionType::EmailGraph => email_graph::send(request, config, client).await,
            ActionType::GenericWebhook => webhook::send(request, agent_name, config, client).await,
            ActionType::PipelineTrigger => pipeline::send(request, agent_name, config, client).await,
        };

        let timestamp = Utc::now().to_rfc3339();
        let action = match result {
            Ok(details) => AgentAction {
                run: 0,
                action_type: request.action_type,
                timestamp,
                status: ActionStatus::Sent,
                details: Some(details),
                issue_id: request.issue_id.clone(),
            },
            Err(e) => AgentAction {
                run: 0,
                action_type: request.action_type,
                timestamp,
                status: ActionStatus::Failed,
                details: Some(crate::types::ActionDetails {
                    title: Some(request.title.clone()),
                    severity: Some(format!("{:?}", request.severity).to_lowercase()),
                    error: Some(e.to_string()),
                }),
                issue_id: request.issue_id.clone(),
            },
        };
        actions.push(action);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[tokio::test]
    async fn unconfigured_action_fails_without_blocking_others() {
        let requests = vec![
            RequestedAction {
                action_type: ActionType::TeamsWebhook,
                title: "A".into(),
                message: "m".into(),
                severity: Severity::High,
                recipients: None,
                webhook_payload: None,
                investigation_id: None,
                issue_id: None,
            },
            RequestedAction {
                action_type: ActionType::GenericWebhook,
                title: "B".into(),
                message: "m".into(),
                severity: Severity::Low,
                recipients: None,
                webhook_payload: None,
                investigation_id: None,
                issue_id: None,
            },
        ];
        let config = ActionsConfig::default();
        let client = reqwest::Client::new();
        let actions = dispatch(&requests, "perf", &config, &client).await;
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.status == ActionStatus::Failed));
        assert!(actions.iter().all(|a| a.run == 0));
    }
}
