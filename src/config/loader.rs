//! Workspace config loading, profile resolution, and the atomic-write
//! primitive shared by the config and context modules.
//!
//! # Loading order
//! 1. Determine the workspace root: `BCTB_WORKSPACE_PATH` env var, else the
//!    directory containing an explicit `configFilePath`, else the current
//!    working directory.
//! 2. Read `<workspace>/.bctb-config.json` (or the explicit path).
//! 3. Resolve profile inheritance (`extends` chains).
//!
//! # Atomic write
//! Writes to `<path>.tmp`, then renames to `<path>`, so a crash mid-write
//! never corrupts the previous contents. Reused by the Context Manager for
//! `state.json`.

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::errors::{BctbError, Result};

use super::schema::{ProfileConfig, WorkspaceConfig};

pub const CONFIG_FILE_NAME: &str = ".bctb-config.json";

/// Resolve the workspace root per the precedence in §6: `BCTB_WORKSPACE_PATH`
/// env var, else the directory of an explicit config path, else cwd.
pub fn resolve_workspace_root(config_file_path: Option<&Path>) -> Result<PathBuf> {
    if let Ok(path) = env::var("BCTB_WORKSPACE_PATH") {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = config_file_path {
        if let Some(parent) = path.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    env::current_dir().map_err(BctbError::from)
}

/// Read and parse `.bctb-config.json` at `path`. A missing file is not an
/// error: it yields the default (empty, single implicit "default" profile)
/// config, since a brand-new workspace has no config yet.
pub fn load_workspace_config(path: &Path) -> Result<WorkspaceConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str::<WorkspaceConfig>(&content)
            .map_err(|e| BctbError::config(format!("failed to parse {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WorkspaceConfig::default()),
        Err(e) => Err(BctbError::config(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Load the workspace config from `<root>/.bctb-config.json`, or an
/// explicit override path.
pub fn load_default_workspace_config(explicit_path: Option<&Path>) -> Result<WorkspaceConfig> {
    let root = resolve_workspace_root(explicit_path)?;
    let path = explicit_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    load_workspace_config(&path)
}

/// Resolve the initial active profile name per §4.2.3: `BCTB_PROFILE` env
/// var, else `defaultProfile`, else the literal `"default"`.
pub fn initial_profile_name(config: &WorkspaceConfig) -> String {
    if let Ok(name) = env::var("BCTB_PROFILE") {
        return name;
    }
    if let Some(name) = &config.default_profile {
        return name.clone();
    }
    "default".to_string()
}

/// Resolve a named profile's `extends` chain, depth-first, child overriding
/// base. Returns an error listing available profiles when `name` is
/// unknown, or when the config defines no profiles at all (flat-profile
/// mode always resolves the flat profile directly, ignoring `name`).
pub fn resolve_profile(config: &WorkspaceConfig, name: &str) -> Result<ProfileConfig> {
    if !config.is_multi_profile() {
        return Ok(config.flat_profile.clone());
    }
    resolve_profile_chain(config, name, &mut Vec::new())
}

fn resolve_profile_chain(
    config: &WorkspaceConfig,
    name: &str,
    visiting: &mut Vec<String>,
) -> Result<ProfileConfig> {
    let profile = config.profiles.get(name).ok_or_else(|| {
        let mut names: Vec<&str> = config
            .profiles
            .keys()
            .map(String::as_str)
            .filter(|n| !n.starts_with('_'))
            .collect();
        names.sort_unstable();
        BctbError::config(format!(
            "unknown profile '{name}'. Available profiles: {}",
            names.join(", ")
        ))
    })?;

    if visiting.contains(&name.to_string()) {
        return Err(BctbError::config(format!(
            "profile inheritance cycle detected at '{name}'"
        )));
    }
    visiting.push(name.to_string());

    let resolved = match &profile.extends {
        Some(base_name) => {
            let base = resolve_profile_chain(config, base_name, visiting)?;
            profile.clone().merge_over(&base)
        }
        None => profile.clone(),
    };

    visiting.pop();
    Ok(resolved)
}

/// Profile names the config defines, excluding `_`-prefixed bases.
pub fn visible_profile_names(config: &WorkspaceConfig) -> Vec<String> {
    let mut names: Vec<String> = config
        .profiles
        .keys()
        .filter(|n| !n.starts_with('_'))
        .cloned()
        .collect();
    names.sort_unstable();
    names
}

/// Atomically write `contents` to `path`: write to `<path>.tmp`, then
/// rename. Creates parent directories as needed.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")
    ));
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ExternalReference, ProfileConfig};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn profile_with_ws(id: &str) -> ProfileConfig {
        ProfileConfig {
            workspace_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn load_missing_file_returns_default_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = load_workspace_config(&path).unwrap();
        assert!(!config.is_multi_profile());
    }

    #[test]
    fn flat_profile_resolves_directly() {
        let mut config = WorkspaceConfig::default();
        config.flat_profile = profile_with_ws("ws-1");
        let resolved = resolve_profile(&config, "ignored").unwrap();
        assert_eq!(resolved.workspace_id.as_deref(), Some("ws-1"));
    }

    #[test]
    fn extends_chain_merges_child_over_base() {
        let mut profiles = HashMap::new();
        profiles.insert(
            "_base".to_string(),
            ProfileConfig {
                cluster_url: Some("https://cluster".to_string()),
                references: Some(vec![ExternalReference {
                    name: "shared".into(),
                    url: "https://shared".into(),
                }]),
                ..Default::default()
            },
        );
        profiles.insert(
            "alpha".to_string(),
            ProfileConfig {
                extends: Some("_base".to_string()),
                workspace_id: Some("alpha-ws".to_string()),
                ..Default::default()
            },
        );
        let config = WorkspaceConfig {
            default_profile: Some("alpha".to_string()),
            profiles,
            ..Default::default()
        };

        let resolved = resolve_profile(&config, "alpha").unwrap();
        assert_eq!(resolved.workspace_id.as_deref(), Some("alpha-ws"));
        assert_eq!(resolved.cluster_url.as_deref(), Some("https://cluster"));
        assert_eq!(resolved.references.unwrap().len(), 1);
    }

    #[test]
    fn unknown_profile_lists_available_names() {
        let mut profiles = HashMap::new();
        profiles.insert("alpha".to_string(), ProfileConfig::default());
        profiles.insert("_hidden".to_string(), ProfileConfig::default());
        let config = WorkspaceConfig {
            profiles,
            ..Default::default()
        };
        let err = resolve_profile(&config, "missing").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("alpha"));
        assert!(!msg.contains("_hidden"));
    }

    #[test]
    fn inheritance_cycle_detected() {
        let mut profiles = HashMap::new();
        profiles.insert(
            "a".to_string(),
            ProfileConfig {
                extends: Some("b".to_string()),
                ..Default::default()
            },
        );
        profiles.insert(
            "b".to_string(),
            ProfileConfig {
                extends: Some("a".to_string()),
                ..Default::default()
            },
        );
        let config = WorkspaceConfig {
            profiles,
            ..Default::default()
        };
        assert!(resolve_profile(&config, "a").is_err());
    }

    #[test]
    fn initial_profile_prefers_env_then_default_then_literal() {
        let config = WorkspaceConfig::default();
        assert_eq!(initial_profile_name(&config), "default");

        let config = WorkspaceConfig {
            default_profile: Some("alpha".to_string()),
            ..Default::default()
        };
        assert_eq!(initial_profile_name(&config), "alpha");
    }

    #[test]
    fn atomic_write_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        atomic_write(&path, "{\"a\":1}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}");
        // Overwrite and confirm no .tmp file is left behind.
        atomic_write(&path, "{\"a\":2}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":2}");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
