//! Policy file resolution and loading.

use std::path::{Path, PathBuf};

use vision_trigger::{PolicyConfig, VisionTriggerPolicy};

use crate::types::{McpError, McpResult};

/// Environment variable naming a policy file.
pub const POLICY_ENV: &str = "VISION_TRIGGER_POLICY";

/// Resolve the policy file path.
///
/// An explicit path or `VISION_TRIGGER_POLICY` must point at an existing
/// file. Otherwise `./.vision-trigger/policy.yaml` and then
/// `~/.vision-trigger/policy.yaml` are used if present, and `None` means the
/// built-in defaults.
pub fn resolve_policy_path(explicit: Option<&str>) -> McpResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        return require_file(PathBuf::from(path)).map(Some);
    }

    if let Ok(env_path) = std::env::var(POLICY_ENV) {
        if !env_path.trim().is_empty() {
            return require_file(PathBuf::from(env_path)).map(Some);
        }
    }

    let cwd_policy = PathBuf::from(".vision-trigger/policy.yaml");
    if cwd_policy.is_file() {
        return Ok(Some(cwd_policy));
    }

    let home_policy = default_policy_path();
    if home_policy.is_file() {
        return Ok(Some(home_policy));
    }

    Ok(None)
}

fn require_file(path: PathBuf) -> McpResult<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(McpError::InvalidParams(format!(
            "Policy file not found: {}",
            path.display()
        )))
    }
}

fn default_policy_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".vision-trigger/policy.yaml")
}

/// Load and validate the policy at `path`, or the defaults when `None`.
pub fn load_policy(path: Option<&Path>) -> McpResult<VisionTriggerPolicy> {
    let policy = match path {
        Some(p) => VisionTriggerPolicy::from_file(p)?,
        None => {
            tracing::info!("No policy file found, using built-in defaults");
            VisionTriggerPolicy::new(PolicyConfig::default())?
        }
    };
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let err = resolve_policy_path(Some(missing.to_str().unwrap()));
        assert!(matches!(err, Err(McpError::InvalidParams(_))));
    }

    #[test]
    fn test_explicit_path_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, "max_candidates: 4\nuse_saved_first: false\n").unwrap();

        let resolved = resolve_policy_path(Some(path.to_str().unwrap()))
            .unwrap()
            .unwrap();
        let policy = load_policy(Some(&resolved)).unwrap();
        assert_eq!(policy.config().max_candidates, 4);
        assert!(!policy.config().use_saved_first);
    }

    #[test]
    fn test_invalid_policy_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"lexical_patterns": ["(unclosed"]}"#).unwrap();
        assert!(matches!(load_policy(Some(&path)), Err(McpError::Policy(_))));
    }

    #[test]
    fn test_defaults_when_none() {
        let policy = load_policy(None).unwrap();
        assert!(policy.config().use_saved_first);
    }
}
