//! `get_event_catalog`, `get_event_field_samples`, `get_event_schema`.
//!
//! All three issue a KQL query through the shared [`QueryClient`] and then
//! post-process the tabular result in-process; the core never interprets
//! KQL itself.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

use crate::config::ProfileConfig;
use crate::errors::{BctbError, Result};

use super::auth::acquire_access_token;
use super::query::QueryClient;

static TIMESPAN_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.)?\d{1,2}:\d{2}:\d{2}(\.\d+)?$").unwrap());

const TIMESPAN_FIELD_PATTERNS: &[&str] = &[
    "time$", "duration", "elapsed", "latency", "delay", "wait", "runtime",
];

fn field_name_suggests_timespan(field: &str) -> bool {
    let lower = field.to_lowercase();
    TIMESPAN_FIELD_PATTERNS.iter().any(|p| {
        if let Some(stripped) = p.strip_suffix('$') {
            lower.ends_with(stripped)
        } else {
            lower.contains(p)
        }
    })
}

/// Detect a value's data type, recognizing timespans per §4.2.1: either
/// the value's string form matches the `HH:MM:SS` literal shape, or the
/// field name itself suggests a duration.
fn detect_data_type(field: &str, value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(s) => {
            if TIMESPAN_LITERAL.is_match(s) || field_name_suggests_timespan(field) {
                "timespan"
            } else {
                "string"
            }
        }
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn timespan_hint() -> &'static str {
    "timespan values are 100-nanosecond ticks; convert with the cluster's \
     timespan-to-real function and divide by 10,000 to obtain milliseconds"
}

pub enum StatusFilter {
    All,
    Success,
    Error,
    TooSlow,
    Unknown,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "error" => Self::Error,
            "too slow" => Self::TooSlow,
            "unknown" => Self::Unknown,
            _ => Self::All,
        }
    }

    /// Categorize an event id's apparent status via the lookup/heuristic
    /// pair the cluster's own telemetry convention uses: BC event ids
    /// ending `Failed`/`Error` are errors, `TooSlow` marks slow
    /// operations, everything else recognized is a success.
    fn categorize(event_id: &str) -> &'static str {
        let lower = event_id.to_lowercase();
        if lower.contains("error") || lower.contains("failed") || lower.contains("exception") {
            "error"
        } else if lower.contains("tooslow") || lower.contains("longrunning") {
            "too slow"
        } else if lower.is_empty() {
            "unknown"
        } else {
            "success"
        }
    }

    fn matches(&self, event_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Success => Self::categorize(event_id) == "success",
            Self::Error => Self::categorize(event_id) == "error",
            Self::TooSlow => Self::categorize(event_id) == "too slow",
            Self::Unknown => Self::categorize(event_id) == "unknown",
        }
    }
}

fn prevalence_bucket(fraction: f64) -> &'static str {
    if fraction >= 0.8 {
        "universal"
    } else if fraction >= 0.5 {
        "common"
    } else if fraction >= 0.2 {
        "occasional"
    } else {
        "rare"
    }
}

pub struct CatalogArgs {
    pub days: u32,
    pub status: String,
    pub include_common_fields: bool,
}

impl Default for CatalogArgs {
    fn default() -> Self {
        Self {
            days: 10,
            status: "all".to_string(),
            include_common_fields: true,
        }
    }
}

pub async fn get_event_catalog(
    profile: &ProfileConfig,
    client: &QueryClient,
    args: &CatalogArgs,
) -> Result<Value> {
    let token = acquire_access_token(profile).await?;
    let kql = format!(
        "traces | where timestamp > ago({}d) | extend eventId = tostring(customDimensions.eventId) \
         | summarize count_ = count() by eventId | order by count_ desc | take 200",
        args.days
    );
    let raw = client.execute(profile, &kql, &token).await?;

    let filter = StatusFilter::parse(&args.status);
    let rows = raw.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut events: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let event_id = row.get(0).and_then(Value::as_str)?;
            let count = row.get(1).and_then(Value::as_i64).unwrap_or(0);
            if !filter.matches(event_id) {
                return None;
            }
            Some(json!({
                "eventId": event_id,
                "count": count,
                "status": StatusFilter::categorize(event_id),
            }))
        })
        .collect();

    if args.include_common_fields {
        let top_ids: Vec<&str> = events
            .iter()
            .take(50)
            .filter_map(|e| e["eventId"].as_str())
            .collect();
        if !top_ids.is_empty() {
            let common_fields = common_field_prevalence(profile, client, &token, args.days, &top_ids).await?;
            events.push(json!({ "commonFields": common_fields }));
        }
    }

    Ok(json!({ "events": events, "days": args.days, "status": args.status }))
}

fn kql_string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}

/// Second pass (§4.2.1): for the top `event_ids`, expand each sampled
/// row's `customDimensions` bag into its field names and count, per
/// field, the number of distinct event types it appears under.
/// `prevalence` is that count as a fraction of `event_ids.len()`.
async fn common_field_prevalence(
    profile: &ProfileConfig,
    client: &QueryClient,
    token: &str,
    days: u32,
    event_ids: &[&str],
) -> Result<Vec<Value>> {
    let ids_literal = event_ids
        .iter()
        .map(|id| kql_string_literal(id))
        .collect::<Vec<_>>()
        .join(", ");
    let kql = format!(
        "traces | where timestamp > ago({days}d) | extend eventId = tostring(customDimensions.eventId) \
         | where eventId in ({ids_literal}) | extend fieldNames = bag_keys(customDimensions) \
         | mv-expand fieldName = fieldNames to typeof(string) \
         | summarize eventsWithField = dcount(eventId) by fieldName"
    );
    let raw = client.execute(profile, &kql, token).await?;
    let rows = raw.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();
    let total = event_ids.len() as f64;

    let fields: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            let field = row.first()?.as_str()?;
            let event_count = row.get(1).and_then(Value::as_i64).unwrap_or(0);
            let fraction = event_count as f64 / total;
            Some(json!({
                "field": field,
                "prevalence": prevalence_bucket(fraction),
            }))
        })
        .collect();
    Ok(fields)
}

pub async fn get_event_field_samples(
    profile: &ProfileConfig,
    client: &QueryClient,
    event_id: &str,
    sample_size: u32,
) -> Result<Value> {
    let token = acquire_access_token(profile).await?;
    let kql = format!(
        "traces | where customDimensions.eventId == '{event_id}' | take {sample_size}"
    );
    let raw = client.execute(profile, &kql, &token).await?;

    let columns = raw
        .get("columns")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let rows = raw.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();

    if rows.is_empty() {
        return Err(BctbError::telemetry(format!(
            "no samples found for event '{event_id}'"
        )));
    }

    let first_row = rows[0].as_array().cloned().unwrap_or_default();
    let fields: Vec<Value> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let name = col.as_str().unwrap_or_default();
            let value = first_row.get(i).cloned().unwrap_or(Value::Null);
            let data_type = detect_data_type(name, &value);
            let mut field = json!({
                "field": name,
                "dataType": data_type,
                "example": value,
            });
            if data_type == "timespan" {
                field["hint"] = json!(timespan_hint());
            }
            field
        })
        .collect();

    Ok(json!({
        "eventId": event_id,
        "sampleCount": rows.len(),
        "fields": fields,
        "exampleKql": kql,
    }))
}

pub async fn get_event_schema(
    profile: &ProfileConfig,
    client: &QueryClient,
    event_id: &str,
) -> Result<Value> {
    let token = acquire_access_token(profile).await?;
    let kql = format!(
        "traces | where customDimensions.eventId == '{event_id}' | take 5"
    );
    let raw = client.execute(profile, &kql, &token).await?;

    let columns = raw
        .get("columns")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let rows = raw.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();

    let fields: Vec<Value> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let name = col.as_str().unwrap_or_default().to_string();
            let examples: Vec<Value> = rows
                .iter()
                .filter_map(|r| r.as_array().and_then(|a| a.get(i)).cloned())
                .take(5)
                .collect();
            json!({ "field": name, "examples": examples })
        })
        .collect();

    Ok(json!({ "eventId": event_id, "fields": fields }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespan_literal_is_detected_by_value_shape() {
        assert_eq!(
            detect_data_type("anyField", &json!("1.02:03:04.5")),
            "timespan"
        );
        assert_eq!(detect_data_type("anyField", &json!("02:03:04")), "timespan");
    }

    #[test]
    fn timespan_is_detected_by_field_name_when_value_is_not_literal() {
        assert_eq!(detect_data_type("executionTime", &json!("abc")), "timespan");
        assert_eq!(detect_data_type("requestDuration", &json!(42)), "timespan");
        assert_eq!(detect_data_type("networkLatencyMs", &json!(42)), "timespan");
    }

    #[test]
    fn plain_string_field_is_not_a_timespan() {
        assert_eq!(detect_data_type("companyName", &json!("Contoso")), "string");
    }

    #[test]
    fn status_categorization_matches_known_suffixes() {
        assert_eq!(StatusFilter::categorize("RequestFailed"), "error");
        assert_eq!(StatusFilter::categorize("RequestTooSlow"), "too slow");
        assert_eq!(StatusFilter::categorize("RequestExecuted"), "success");
        assert_eq!(StatusFilter::categorize(""), "unknown");
    }

    #[test]
    fn prevalence_buckets_match_thresholds() {
        assert_eq!(prevalence_bucket(0.95), "universal");
        assert_eq!(prevalence_bucket(0.6), "common");
        assert_eq!(prevalence_bucket(0.25), "occasional");
        assert_eq!(prevalence_bucket(0.05), "rare");
    }
}
