//! `list_profiles` and the profile-resolution half of `switch_profile`
//! (§4.2.3). The state swap itself — replacing the cache, query client,
//! and saved-query root — is [`ToolHandlers`](super::ToolHandlers)'s job,
//! since this module has no owned state to swap.

use serde_json::{json, Value};

use crate::config::{resolve_profile, visible_profile_names, ProfileConfig, WorkspaceConfig};
use crate::errors::{BctbError, Result};

pub fn list_profiles(config: &WorkspaceConfig, active: &str) -> Value {
    if !config.is_multi_profile() {
        return json!({ "mode": "flat", "active": active, "profiles": [active] });
    }
    json!({
        "mode": "multi",
        "active": active,
        "profiles": visible_profile_names(config),
    })
}

/// Resolve the profile named `name`, failing with a structured error
/// (listing available names) when the config defines no profiles, or
/// `name` is unknown.
pub fn resolve_switch(config: &WorkspaceConfig, name: &str) -> Result<ProfileConfig> {
    if !config.is_multi_profile() {
        return Err(BctbError::config(
            "no profiles are defined in this workspace",
        ));
    }
    resolve_profile(config, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn flat_mode_reports_single_implicit_profile() {
        let config = WorkspaceConfig::default();
        let listed = list_profiles(&config, "default");
        assert_eq!(listed["mode"], "flat");
        assert_eq!(listed["profiles"], json!(["default"]));
    }

    #[test]
    fn switch_fails_with_no_profiles_defined() {
        let config = WorkspaceConfig::default();
        assert!(resolve_switch(&config, "alpha").is_err());
    }

    #[test]
    fn switch_to_unknown_profile_lists_available_names() {
        let mut profiles = HashMap::new();
        profiles.insert("alpha".to_string(), ProfileConfig::default());
        let config = WorkspaceConfig {
            profiles,
            ..Default::default()
        };
        let err = resolve_switch(&config, "beta").unwrap_err();
        assert!(err.to_string().contains("alpha"));
    }
}
