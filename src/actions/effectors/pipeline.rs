//! Azure DevOps Pipelines trigger effector.

use std::env;

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
    let pipeline = &config.pipeline_trigger;
    let org_url = pipeline
        .org_url
        .as_deref()
        .ok_or_else(|| BctbError::action("pipeline-trigger: no orgUrl configured"))?;
    let project = pipeline
        .project
        .as_deref()
        .ok_or_else(|| BctbError::action("pipeline-trigger: no project configured"))?;
    let pipeline_id = pipeline
        .pipeline_id
        .ok_or_else(|| BctbError::action("pipeline-trigger: no pipelineId configured"))?;
    let pat = env::var("DEVOPS_PAT")
        .ok()
        .or_else(|| pipeline.pat.clone())
        .ok_or_else(|| BctbError::action("pipeline-trigger: DEVOPS_PAT is not set"))?;

    let mut template_parameters = json!({ "agentName": agent_name });
    if let Some(investigation_id) = &request.investigation_id {
        template_parameters["investigationId"] = json!(investigation_id);
    }

    let body = json!({
        "templateParameters": template_parameters,
        "resources": { "repositories": { "self": { "refName": "refs/heads/main" } } },
    });

    let url = format!(
        "{}/{}/_apis/pipelines/{}/runs?api-version=7.0",
        org_url.trim_end_matches('/'),
        project,
        pipeline_id
    );

    let resp = client
        .post(url)
        .basic_auth("", Some(pat))
        .json(&body)
        .send()
        .await
        .map_err(|e| BctbError::action(format!("pipeline-trigger: request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(BctbError::action(format!(
            "pipeline-trigger: request failed with status {}",
            resp.status()
        )));
    }

    Ok(ActionDetails {
        title: Some(request.title.clone()),
        severity: Some(format!("{:?}", request.severity).to_lowercase()),
        error: None,
    })
}
