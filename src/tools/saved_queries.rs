//! Workspace-local saved-query storage: `get_saved_queries`,
//! `search_queries`, `save_query`, `get_categories`.
//!
//! Queries live in a single JSON array file under the profile's
//! `queriesFolder` (default `.bctb-queries`), written atomically via the
//! same temp-then-rename primitive the context manager uses for agent
//! state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{atomic_write, ProfileConfig};
use crate::errors::Result;

const DEFAULT_QUERIES_FOLDER: &str = ".bctb-queries";
const QUERIES_FILE_NAME: &str = "queries.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuery {
    pub id: String,
    pub name: String,
    pub category: String,
    pub kql: String,
    #[serde(default)]
    pub description: String,
}

fn queries_file(workspace_root: &Path, profile: &ProfileConfig) -> PathBuf {
    let folder = profile
        .queries_folder
        .clone()
        .unwrap_or_else(|| DEFAULT_QUERIES_FOLDER.to_string());
    workspace_root.join(folder).join(QUERIES_FILE_NAME)
}

fn load_all(workspace_root: &Path, profile: &ProfileConfig) -> Result<Vec<SavedQuery>> {
    let path = queries_file(workspace_root, profile);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&contents).unwrap_or_default())
}

fn persist_all(workspace_root: &Path, profile: &ProfileConfig, queries: &[SavedQuery]) -> Result<()> {
    let path = queries_file(workspace_root, profile);
    let contents = serde_json::to_string_pretty(queries)?;
    atomic_write(&path, &contents)
}

pub fn get_saved_queries(workspace_root: &Path, profile: &ProfileConfig, category: Option<&str>) -> Result<Value> {
    let all = load_all(workspace_root, profile)?;
    let filtered: Vec<&SavedQuery> = all
        .iter()
        .filter(|q| category.map(|c| q.category == c).unwrap_or(true))
        .collect();
    Ok(json!({ "queries": filtered }))
}

pub fn search_queries(workspace_root: &Path, profile: &ProfileConfig, term: &str) -> Result<Value> {
    let all = load_all(workspace_root, profile)?;
    let needle = term.to_lowercase();
    let matches: Vec<&SavedQuery> = all
        .iter()
        .filter(|q| {
            q.name.to_lowercase().contains(&needle)
                || q.kql.to_lowercase().contains(&needle)
                || q.description.to_lowercase().contains(&needle)
        })
        .collect();
    Ok(json!({ "queries": matches }))
}

pub fn save_query(
    workspace_root: &Path,
    profile: &ProfileConfig,
    name: &str,
    category: &str,
    kql: &str,
    description: &str,
) -> Result<Value> {
    let mut all = load_all(workspace_root, profile)?;
    let id = format!("{:x}", sha2::Sha256::digest(format!("{name}:{category}").as_bytes()))
        [..16]
        .to_string();

    let entry = SavedQuery {
        id: id.clone(),
        name: name.to_string(),
        category: category.to_string(),
        kql: kql.to_string(),
        description: description.to_string(),
    };

    if let Some(existing) = all.iter_mut().find(|q| q.id == id) {
        *existing = entry.clone();
    } else {
        all.push(entry.clone());
    }

    persist_all(workspace_root, profile, &all)?;
    Ok(json!({ "saved": entry }))
}

pub fn get_categories(workspace_root: &Path, profile: &ProfileConfig) -> Result<Value> {
    let all = load_all(workspace_root, profile)?;
    let mut categories: Vec<String> = all.into_iter().map(|q| q.category).collect();
    categories.sort();
    categories.dedup();
    Ok(json!({ "categories": categories }))
}

use sha2::Digest;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_list_round_trips() {
        let dir = TempDir::new().unwrap();
        let profile = ProfileConfig::default();
        save_query(dir.path(), &profile, "Slow requests", "performance", "traces | take 1", "").unwrap();
        let listed = get_saved_queries(dir.path(), &profile, None).unwrap();
        assert_eq!(listed["queries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn save_same_name_and_category_overwrites() {
        let dir = TempDir::new().unwrap();
        let profile = ProfileConfig::default();
        save_query(dir.path(), &profile, "Slow requests", "performance", "A", "").unwrap();
        save_query(dir.path(), &profile, "Slow requests", "performance", "B", "").unwrap();
        let listed = get_saved_queries(dir.path(), &profile, None).unwrap();
        let queries = listed["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0]["kql"], "B");
    }

    #[test]
    fn search_matches_name_kql_or_description() {
        let dir = TempDir::new().unwrap();
        let profile = ProfileConfig::default();
        save_query(dir.path(), &profile, "Slow requests", "performance", "traces | take 1", "latency hunt").unwrap();
        let found = search_queries(dir.path(), &profile, "latency").unwrap();
        assert_eq!(found["queries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn categories_are_sorted_and_deduped() {
        let dir = TempDir::new().unwrap();
        let profile = ProfileConfig::default();
        save_query(dir.path(), &profile, "A", "zeta", "x", "").unwrap();
        save_query(dir.path(), &profile, "B", "alpha", "y", "").unwrap();
        let cats = get_categories(dir.path(), &profile).unwrap();
        assert_eq!(cats["categories"], json!(["alpha", "zeta"]));
    }
}
