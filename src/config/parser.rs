use crate::config::types::{Config, StorageConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads, validates and anchors a configuration file
///
/// Relative storage paths are resolved against the directory holding the
/// configuration file, so a scheduled run finds the same state file
/// whatever its working directory.
///
/// ```no_run
/// use std::path::Path;
/// use outreach_scout::config::load_config;
///
/// let config = load_config(Path::new("outreach.toml")).unwrap();
/// println!("State file: {}", config.storage.state_path);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    validate(&config)?;

    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        anchor_storage_paths(&mut config.storage, base);
    }

    Ok(config)
}

fn anchor_storage_paths(storage: &mut StorageConfig, base: &Path) {
    for path in [
        &mut storage.state_path,
        &mut storage.session_path,
        &mut storage.diagnostics_dir,
    ] {
        if Path::new(path.as_str()).is_relative() {
            *path = base.join(path.as_str()).display().to_string();
        }
    }
}
