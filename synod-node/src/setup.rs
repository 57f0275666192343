use std::path::Path;

use tracing::info;
use synod_common::Result;

use crate::config::RunConfig;

/// Loads the run configuration at `path`, writing the defaults there first if it is missing.
pub fn ensure_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        info!("⚠️ No config at {}, writing defaults", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        RunConfig::default().save_to_file(path)?;
    }
    Ok(RunConfig::load_from_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");
        let config = ensure_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_existing_config_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let custom = RunConfig { n: 5, f: 2, ..Default::default() };
        custom.save_to_file(&path).unwrap();
        assert_eq!(ensure_config(&path).unwrap(), custom);
    }
}
