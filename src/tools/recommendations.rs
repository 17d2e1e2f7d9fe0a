//! `get_recommendations`: static heuristics over KQL text and result
//! size (§4.2.2). No cluster round trip of its own — callers pass the
//! query text and, when available, the row count from a prior
//! `query_telemetry` call.

use serde_json::{json, Value};

/// A bare `where` with no preceding pipe filters the whole table before
/// any narrowing stage runs.
fn has_unpiped_where(kql: &str) -> bool {
    let trimmed = kql.trim_start();
    trimmed.to_lowercase().starts_with("where ") && !kql.contains('|')
}

fn projects_star(kql: &str) -> bool {
    kql.to_lowercase().contains("project *")
}

fn missing_time_filter(kql: &str) -> bool {
    !kql.to_lowercase().contains("ago(")
}

pub fn get_recommendations(kql: &str, row_count: Option<usize>) -> Value {
    let mut recommendations = Vec::new();

    if has_unpiped_where(kql) {
        recommendations.push(json!({
            "kind": "unpiped-where",
            "message": "a leading `where` with no preceding pipe scans the entire table before narrowing; pipe it after the first stage",
        }));
    }
    if projects_star(kql) {
        recommendations.push(json!({
            "kind": "project-star",
            "message": "`project *` returns every column; project only the fields you need",
        }));
    }
    if missing_time_filter(kql) {
        recommendations.push(json!({
            "kind": "missing-time-filter",
            "message": "no `ago(...)` time filter found; unbounded queries scan the full retention window",
        }));
    }
    if let Some(count) = row_count {
        if count > 10_000 {
            recommendations.push(json!({
                "kind": "large-result-set",
                "message": format!("query returned {count} rows; consider narrowing the time range or adding a `take`/`summarize`"),
            }));
        }
    }

    json!({ "recommendations": recommendations })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_unpiped_where() {
        let result = get_recommendations("where timestamp > ago(1d)", None);
        let kinds: Vec<&str> = result["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["kind"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"unpiped-where"));
    }

    #[test]
    fn piped_where_is_not_flagged() {
        let result = get_recommendations("traces | where timestamp > ago(1d)", None);
        let kinds: Vec<&str> = result["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["kind"].as_str().unwrap())
            .collect();
        assert!(!kinds.contains(&"unpiped-where"));
    }

    #[test]
    fn flags_project_star_and_missing_time_filter() {
        let result = get_recommendations("traces | project *", None);
        let kinds: Vec<&str> = result["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["kind"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"project-star"));
        assert!(kinds.contains(&"missing-time-filter"));
    }

    #[test]
    fn flags_large_result_sets() {
        let result = get_recommendations("traces | where timestamp > ago(1d)", Some(10_001));
        let kinds: Vec<&str> = result["recommendations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["kind"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"large-result-set"));
    }

    #[test]
    fn clean_query_has_no_recommendations() {
        let result = get_recommendations("traces | where timestamp > ago(1d) | project eventId", Some(5));
        assert!(result["recommendations"].as_array().unwrap().is_empty());
    }
}
