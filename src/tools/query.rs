//! `query_telemetry`: validate, check cache, obtain a token, execute over
//! HTTP, parse, cache, and (optionally) scrub PII.

use serde_json::{json, Value};

use crate::config::{CacheConfig, ProfileConfig, SanitizeConfig};
use crate::errors::{BctbError, Result};

use super::auth::acquire_access_token;
use super::cache::QueryCache;

const EMPTY_KQL_MESSAGE: &str = "KQL query must not be empty";

/// Thin HTTP client over the remote log-analytics cluster. The core does
/// not parse or execute KQL itself (§1 Non-goals) — it hands the query
/// text to the cluster and parses the cluster's tabular response shape.
pub struct QueryClient {
    client: reqwest::Client,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Execute `kql` against `profile`'s cluster, returning
    /// `{columns, rows}`. A cluster HTTP failure is fatal for this call
    /// (§7 TelemetryError); a KQL validation failure is recoverable and
    /// returned as a `type:"error"` result rather than propagated.
    pub async fn execute(&self, profile: &ProfileConfig, kql: &str, token: &str) -> Result<Value> {
        let cluster_url = profile
            .cluster_url
            .as_deref()
            .ok_or_else(|| BctbError::config("profile is missing clusterUrl"))?;
        let workspace_id = profile
            .workspace_id
            .as_deref()
            .ok_or_else(|| BctbError::config("profile is missing workspaceId"))?;

        let resp = self
            .client
            .post(format!(
                "{}/v1/workspaces/{}/query",
                cluster_url.trim_end_matches('/'),
                workspace_id
            ))
            .bearer_auth(token)
            .json(&json!({ "query": kql }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BctbError::telemetry(format!(
                "cluster query failed with status {}",
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        parse_tabular_response(&body)
    }
}

/// Parse the cluster's `{tables:[{columns:[{name}], rows:[[...]]}]}`
/// shape into `{columns, rows}`.
fn parse_tabular_response(body: &Value) -> Result<Value> {
    let table = body
        .get("tables")
        .and_then(|t| t.get(0))
        .ok_or_else(|| BctbError::telemetry("cluster response missing tables[0]"))?;

    let columns: Vec<String> = table
        .get("columns")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let rows = table.get("rows").cloned().unwrap_or(json!([]));

    Ok(json!({ "columns": columns, "rows": rows }))
}

fn validate_kql(kql: &str) -> Result<()> {
    if kql.trim().is_empty() {
        return Err(BctbError::telemetry(EMPTY_KQL_MESSAGE));
    }
    Ok(())
}

/// Redact common PII-looking columns (`email`, `userId`, `ipAddress`) by
/// replacing their values with a fixed placeholder, when
/// `sanitize.removePii` is enabled.
fn sanitize_pii(result: &mut Value, sanitize: &SanitizeConfig) {
    if !sanitize.remove_pii {
        return;
    }
    let pii_patterns = ["email", "userid", "ipaddress", "upn"];
    let Some(columns) = result.get("columns").and_then(Value::as_array).cloned() else {
        return;
    };
    let pii_indices: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.as_str()
                .map(|s| pii_patterns.iter().any(|p| s.to_lowercase().contains(p)))
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();
    if pii_indices.is_empty() {
        return;
    }
    if let Some(Value::Array(rows)) = result.get_mut("rows") {
        for row in rows.iter_mut() {
            if let Value::Array(cells) = row {
                for &i in &pii_indices {
                    if let Some(cell) = cells.get_mut(i) {
                        *cell = json!("[redacted]");
                    }
                }
            }
        }
    }
}

pub struct QueryContext<'a> {
    pub profile: &'a ProfileConfig,
    pub cache_config: &'a CacheConfig,
    pub sanitize: &'a SanitizeConfig,
}

pub async fn query_telemetry(
    ctx: QueryContext<'_>,
    client: &QueryClient,
    cache: &mut QueryCache,
    kql: &str,
) -> Result<Value> {
    validate_kql(kql)?;

    if ctx.cache_config.enabled {
        if let Some(cached) = cache.get(kql) {
            return Ok(cached);
        }
    }

    let token = acquire_access_token(ctx.profile).await?;
    let raw = client.execute(ctx.profile, kql, &token).await?;

    let row_count = raw
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    let mut result = json!({
        "columns": raw["columns"],
        "rows": raw["rows"],
        "summary": format!("{row_count} row(s) returned"),
        "cached": false,
    });

    sanitize_pii(&mut result, ctx.sanitize);

    if ctx.cache_config.enabled {
        cache.set(kql, result.clone());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_kql_fails_with_fixed_message() {
        let err = validate_kql("   ").unwrap_err();
        assert_eq!(err.to_string(), format!("telemetry error: {EMPTY_KQL_MESSAGE}"));
    }

    #[test]
    fn parse_tabular_response_extracts_columns_and_rows() {
        let body = json!({
            "tables": [{
                "columns": [{"name": "eventId"}, {"name": "count_"}],
                "rows": [["RequestExecuted", 42]],
            }]
        });
        let parsed = parse_tabular_response(&body).unwrap();
        assert_eq!(parsed["columns"], json!(["eventId", "count_"]));
        assert_eq!(parsed["rows"], json!([["RequestExecuted", 42]]));
    }

    #[test]
    fn sanitize_redacts_pii_columns() {
        let mut result = json!({
            "columns": ["eventId", "userEmail"],
            "rows": [["X", "a@b.com"]],
        });
        sanitize_pii(&mut result, &SanitizeConfig { remove_pii: true });
        assert_eq!(result["rows"][0][1], json!("[redacted]"));
        assert_eq!(result["rows"][0][0], json!("X"));
    }

    #[test]
    fn sanitize_noop_when_disabled() {
        let mut result = json!({
            "columns": ["userEmail"],
            "rows": [["a@b.com"]],
        });
        sanitize_pii(&mut result, &SanitizeConfig { remove_pii: false });
        assert_eq!(result["rows"][0][0], json!("a@b.com"));
    }
}
