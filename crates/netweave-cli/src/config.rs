//! Configuration and shape-library loading for the CLI
//!
//! This module finds the TOML configuration file (explicit path, local
//! directory, system directory) and loads the master catalog it points at.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info, warn};
use thiserror::Error;

use netweave::{NetweaveError, config::AppConfig, library::MasterCatalog};

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Failed to parse shape library {path}: {message}")]
    Library { path: PathBuf, message: String },

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for NetweaveError {
    fn from(err: ConfigError) -> Self {
        NetweaveError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (netweave/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, NetweaveError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("netweave/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "netweave", "netweave") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, NetweaveError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok(config)
}

/// Load the master catalog at `path`.
///
/// Without a path the catalog is empty, which is enough for networks that
/// contain no links or spotters.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a valid catalog.
pub fn load_library(path: Option<&Path>) -> Result<MasterCatalog, NetweaveError> {
    let Some(path) = path else {
        warn!("No shape library configured, every link and spotter will lack a master");
        return Ok(MasterCatalog::default());
    };

    info!(path = path.display().to_string(); "Loading shape library");
    let content = fs::read_to_string(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("cannot read shape library {}: {err}", path.display()),
        )
    })?;
    let catalog: MasterCatalog = toml::from_str(&content).map_err(|e| ConfigError::Library {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(masters = catalog.len(); "Shape library loaded");

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[compile]\nreconcile = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(!config.compile().reconcile());
        assert!(config.compile().prune_grounds());
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, NetweaveError::Config(message) if message.contains("absent.toml")));
    }

    #[test]
    fn test_invalid_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.toml");
        fs::write(&path, "[[master]]\ntype = \"Gadget\"\n").unwrap();

        let err = load_library(Some(&path)).unwrap_err();
        assert!(matches!(err, NetweaveError::Config(_)));
    }

    #[test]
    fn test_no_library_is_empty() {
        assert!(load_library(None).unwrap().is_empty());
    }
}
