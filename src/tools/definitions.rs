//! Static tool metadata: `{name, description, jsonSchema, annotations}`,
//! discoverable by the LLM's function-calling surface and the MCP
//! `GET /tools` route alike (§6).

use serde::Serialize;
use serde_json::{json, Value};

use crate::llm::ToolDef;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    pub read_only_hint: bool,
    pub destructive_hint: bool,
    pub idempotent_hint: bool,
    pub open_world_hint: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub json_schema: Value,
    pub annotations: ToolAnnotations,
}

fn read_only(openworld: bool) -> ToolAnnotations {
    ToolAnnotations {
        read_only_hint: true,
        destructive_hint: false,
        idempotent_hint: true,
        open_world_hint: openworld,
    }
}

fn mutating(idempotent: bool) -> ToolAnnotations {
    ToolAnnotations {
        read_only_hint: false,
        destructive_hint: false,
        idempotent_hint: idempotent,
        open_world_hint: false,
    }
}

macro_rules! schema {
    ($($field:literal : $ty:literal $(required)?),* $(,)?) => {
        json!({ "type": "object", "properties": { $($field: {"type": $ty}),* } })
    };
}

/// The fixed tool set, read-only entries first. `tool_scope` (§4.5)
/// filters this list down to the read-only subset for agents not
/// authorized to save queries or switch profiles.
pub fn all_tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get_event_catalog".into(),
            description: "List recent telemetry event ids grouped by status, optionally with common-field prevalence.".into(),
            json_schema: schema!("days": "number", "status": "string", "includeCommonFields": "boolean"),
            annotations: read_only(true),
        },
        ToolDescriptor {
            name: "get_event_field_samples".into(),
            description: "Sample recent events for one event id and infer each field's data type.".into(),
            json_schema: schema!("eventId": "string", "sampleSize": "number"),
            annotations: read_only(true),
        },
        ToolDescriptor {
            name: "get_event_schema".into(),
            description: "Return the field list and example values for one event id.".into(),
            json_schema: schema!("eventId": "string"),
            annotations: read_only(true),
        },
        ToolDescriptor {
            name: "get_tenant_mapping".into(),
            description: "Map companyName to aadTenantId with occurrence counts.".into(),
            json_schema: schema!("filter": "string"),
            annotations: read_only(true),
        },
        ToolDescriptor {
            name: "query_telemetry".into(),
            description: "Execute a KQL query against the active profile's cluster.".into(),
            json_schema: schema!("kql": "string"),
            annotations: read_only(true),
        },
        ToolDescriptor {
            name: "get_saved_queries".into(),
            description: "List saved KQL queries, optionally filtered by category.".into(),
            json_schema: schema!("category": "string"),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "search_queries".into(),
            description: "Search saved queries by name, KQL text, or description.".into(),
            json_schema: schema!("term": "string"),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "save_query".into(),
            description: "Save or overwrite a named KQL query under a category.".into(),
            json_schema: schema!("name": "string", "category": "string", "kql": "string", "description": "string"),
            annotations: mutating(true),
        },
        ToolDescriptor {
            name: "get_categories".into(),
            description: "List distinct saved-query categories.".into(),
            json_schema: schema!(),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "get_recommendations".into(),
            description: "Static heuristics flagging likely-inefficient KQL.".into(),
            json_schema: schema!("kql": "string", "rowCount": "number"),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "get_external_queries".into(),
            description: "Fetch KQL samples from the profile's configured external references.".into(),
            json_schema: schema!(),
            annotations: read_only(true),
        },
        ToolDescriptor {
            name: "get_cache_stats".into(),
            description: "Return query-cache hit/miss counters and size.".into(),
            json_schema: schema!(),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "clear_cache".into(),
            description: "Drop all cached query results.".into(),
            json_schema: schema!(),
            annotations: mutating(true),
        },
        ToolDescriptor {
            name: "cleanup_cache".into(),
            description: "Evict only expired cache entries.".into(),
            json_schema: schema!(),
            annotations: mutating(true),
        },
        ToolDescriptor {
            name: "get_auth_status".into(),
            description: "Report whether the active profile is authenticated, or list missing configuration.".into(),
            json_schema: schema!(),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "list_profiles".into(),
            description: "List the workspace's configured connection profiles.".into(),
            json_schema: schema!(),
            annotations: read_only(false),
        },
        ToolDescriptor {
            name: "switch_profile".into(),
            description: "Switch the active connection profile, replacing all profile-scoped services.".into(),
            json_schema: schema!("name": "string"),
            annotations: mutating(false),
        },
    ]
}

/// Tool names an agent with `toolScope:"read-only"` (§4.5) may call —
/// excludes `save_query` and `switch_profile`, the two tools that mutate
/// durable state outside a run's own directory.
pub fn read_only_tool_names() -> Vec<String> {
    all_tool_descriptors()
        .into_iter()
        .map(|d| d.name)
        .filter(|n| n != "save_query" && n != "switch_profile")
        .collect()
}

pub fn to_tool_def(descriptor: &ToolDescriptor) -> ToolDef {
    ToolDef {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        json_schema: descriptor.json_schema.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_scope_excludes_mutating_tools() {
        let names = read_only_tool_names();
        assert!(!names.contains(&"save_query".to_string()));
        assert!(!names.contains(&"switch_profile".to_string()));
        assert!(names.contains(&"query_telemetry".to_string()));
    }

    #[test]
    fn all_tools_have_unique_names() {
        let names: Vec<String> = all_tool_descriptors().into_iter().map(|d| d.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names.len(), sorted.len());
    }
}
