//! `get_external_queries`: fetch KQL samples from a workspace's
//! configured remote references (§4.2, `references[]`).

use serde_json::{json, Value};

use crate::config::ProfileConfig;
use crate::errors::Result;

pub async fn get_external_queries(profile: &ProfileConfig, client: &reqwest::Client) -> Result<Value> {
    let references = profile.references.clone().unwrap_or_default();
    let mut sources = Vec::new();

    for reference in references {
        match fetch_one(client, &reference.url).await {
            Ok(queries) => sources.push(json!({
                "name": reference.name,
                "url": reference.url,
                "queries": queries,
            })),
            Err(e) => sources.push(json!({
                "name": reference.name,
                "url": reference.url,
                "error": e.to_string(),
            })),
        }
    }

    Ok(json!({ "sources": sources }))
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Result<Value> {
    let resp = client.get(url).send().await?;
    let body: Value = resp.json().await?;
    Ok(body)
}
