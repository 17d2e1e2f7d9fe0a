//! `get_tenant_mapping`: `companyName → aadTenantId` with occurrence
//! counts, optionally filtered by a substring of the company name.

use serde_json::{json, Value};

use crate::config::ProfileConfig;
use crate::errors::Result;

use super::auth::acquire_access_token;
use super::query::QueryClient;

pub async fn get_tenant_mapping(
    profile: &ProfileConfig,
    client: &QueryClient,
    filter: Option<&str>,
) -> Result<Value> {
    let token = acquire_access_token(profile).await?;
    let kql = "traces | extend companyName = tostring(customDimensions.companyName), \
               aadTenantId = tostring(customDimensions.aadTenantId) \
               | where isnotempty(companyName) and isnotempty(aadTenantId) \
               | summarize count_ = count() by companyName, aadTenantId \
               | order by count_ desc";
    let raw = client.execute(profile, kql, &token).await?;

    let rows = raw.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();
    let filter_lower = filter.map(str::to_lowercase);

    let mappings: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let company = row.get(0).and_then(Value::as_str)?;
            let tenant_id = row.get(1).and_then(Value::as_str)?;
            let count = row.get(2).and_then(Value::as_i64).unwrap_or(0);
            if let Some(f) = &filter_lower {
                if !company.to_lowercase().contains(f.as_str()) {
                    return None;
                }
            }
            Some(json!({
                "companyName": company,
                "aadTenantId": tenant_id,
                "count": count,
            }))
        })
        .collect();

    Ok(json!({ "mappings": mappings }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive_substring() {
        let lower = Some("contoso".to_string());
        assert!("Contoso Ltd".to_lowercase().contains(lower.unwrap().as_str()));
    }
}
