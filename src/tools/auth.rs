//! Access-token acquisition for the telemetry cluster, and the
//! `get_auth_status` tool.
//!
//! Secrets are read at the moment of use (§5): `BCTB_ACCESS_TOKEN` is
//! checked first (a pre-provisioned token, e.g. for local development or
//! a CI runner), falling back to the profile's configured client
//! credentials flow against the cluster's tenant.

use serde_json::{json, Value};
use std::env;

use crate::config::ProfileConfig;
use crate::errors::{BctbError, Result};

/// Obtain an access token for the telemetry cluster. Read at the point of
/// use; never cached by this function (a longer-lived cache, if wanted, is
/// the caller's responsibility and out of scope here).
pub async fn acquire_access_token(profile: &ProfileConfig) -> Result<String> {
    if let Ok(token) = env::var("BCTB_ACCESS_TOKEN") {
        return Ok(token);
    }

    let tenant_id = profile
        .tenant_id
        .as_deref()
        .ok_or_else(|| BctbError::auth("profile is missing tenantId"))?;
    let client_id = profile
        .client_id
        .as_deref()
        .ok_or_else(|| BctbError::auth("profile is missing clientId"))?;

    // Client-credentials grant against the same tenant the cluster lives
    // in, mirroring the Graph effector's token flow (§4.4).
    let client = reqwest::Client::new();
    let resp = client
        .post(format!(
            "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"
        ))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("scope", "https://api.loganalytics.io/.default"),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(BctbError::auth(format!(
            "token request failed with status {}",
            resp.status()
        )));
    }
    let body: Value = resp.json().await?;
    body.get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BctbError::auth("token response missing access_token"))
}

/// `get_auth_status`: returns authentication state, or (without throwing)
/// a structured `configurationIssues` list when the profile is
/// incomplete.
pub fn auth_status(profile: &ProfileConfig) -> Value {
    let has_token_env = env::var("BCTB_ACCESS_TOKEN").is_ok();
    let mut issues = Vec::new();
    if profile.cluster_url.is_none() {
        issues.push("missing clusterUrl".to_string());
    }
    if profile.workspace_id.is_none() {
        issues.push("missing workspaceId".to_string());
    }
    if !has_token_env {
        if profile.tenant_id.is_none() {
            issues.push("missing tenantId".to_string());
        }
        if profile.client_id.is_none() {
            issues.push("missing clientId".to_string());
        }
    }

    if issues.is_empty() {
        json!({"authenticated": true})
    } else {
        json!({"authenticated": false, "configurationIssues": issues})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_profile_reports_authenticated() {
        let profile = ProfileConfig {
            cluster_url: Some("https://cluster".into()),
            workspace_id: Some("ws".into()),
            tenant_id: Some("t".into()),
            client_id: Some("c".into()),
            ..Default::default()
        };
        let status = auth_status(&profile);
        assert_eq!(status["authenticated"], json!(true));
    }

    #[test]
    fn incomplete_profile_lists_issues_without_erroring() {
        let profile = ProfileConfig::default();
        let status = auth_status(&profile);
        assert_eq!(status["authenticated"], json!(false));
        let issues = status["configurationIssues"].as_array().unwrap();
        assert!(!issues.is_empty());
    }
}
