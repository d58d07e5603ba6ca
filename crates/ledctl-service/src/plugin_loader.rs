//! Turns a directory of plugin manifests into a populated registry.
//!
//! The registry crate deliberately never instantiates a concrete plugin
//! type from a manifest id; that responsibility belongs to whatever binary
//! composes the daemon. This module is that binary's half of the contract:
//! it scans `--plugins-dir` for `*.json` manifests, and for every manifest
//! whose `id` matches a plugin compiled into this binary, constructs the
//! instance and registers the pair.

use std::path::Path;

use ledctl_errors::{LedCtlError, Result};
use ledctl_plugin::{PluginManifest, PluginRegistry};
use tracing::warn;

use crate::plugins;

/// Scan `plugins_dir` for manifest files and register every recognized
/// plugin.
///
/// # Errors
///
/// Returns [`LedCtlError::NoPlugins`] if `plugins_dir` does not exist or
/// contains no manifest that resolves to a known built-in plugin.
pub fn load_registry(plugins_dir: &Path) -> Result<PluginRegistry> {
    if !plugins_dir.is_dir() {
        return Err(LedCtlError::NoPlugins(plugins_dir.to_path_buf()));
    }

    let mut registry = PluginRegistry::new();
    let mut manifest_paths: Vec<_> = std::fs::read_dir(plugins_dir)
        .map_err(|_| LedCtlError::NoPlugins(plugins_dir.to_path_buf()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    manifest_paths.sort();

    for path in manifest_paths {
        let manifest = match load_manifest(&path) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(?path, %err, "skipping unreadable plugin manifest");
                continue;
            }
        };

        let Some(instance) = plugins::construct(&manifest.id) else {
            warn!(plugin_id = %manifest.id, ?path, "no built-in plugin matches this manifest id");
            continue;
        };

        if let Err(err) = registry.register(manifest, instance) {
            warn!(?path, %err, "failed to register plugin");
        }
    }

    if registry.available_modes().is_empty() {
        return Err(LedCtlError::NoPlugins(plugins_dir.to_path_buf()));
    }

    Ok(registry)
}

fn load_manifest(path: &Path) -> std::result::Result<PluginManifest, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join(format!("ledctl-plugins-missing-{}", std::process::id()));
        assert!(load_registry(&dir).is_err());
    }

    #[test]
    fn recognizes_the_built_in_clock_plugin() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("clock.json"),
            r#"{"id": "clock", "display_name": "Clock"}"#,
        )
        .expect("write manifest");

        let registry = load_registry(dir.path()).expect("load registry");
        assert_eq!(registry.available_modes().len(), 1);
    }

    #[test]
    fn unknown_plugin_id_is_skipped_without_failing_the_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("clock.json"),
            r#"{"id": "clock", "display_name": "Clock"}"#,
        )
        .expect("write manifest");
        fs::write(
            dir.path().join("unknown.json"),
            r#"{"id": "does_not_exist", "display_name": "Ghost"}"#,
        )
        .expect("write manifest");

        let registry = load_registry(dir.path()).expect("load registry");
        assert_eq!(registry.available_modes().len(), 1);
    }

    #[test]
    fn directory_with_no_recognized_plugins_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("unknown.json"),
            r#"{"id": "does_not_exist", "display_name": "Ghost"}"#,
        )
        .expect("write manifest");

        assert!(load_registry(dir.path()).is_err());
    }
}
