//! Configuration types for Netweave compilation.
//!
//! All types implement [`serde::Deserialize`] with a default for every field,
//! so a partial configuration file only overrides what it names.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`LibraryConfig`] - Where the shape-library catalog lives.
//! - [`CompileConfig`] - Sub-network compilation switches.
//! - [`AssemblyConfig`] - Super-network assembly switches.
//!
//! # Example
//!
//! ```
//! # use netweave::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.compile().prune_grounds());
//! assert!(config.assembly().seed().is_none());
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn enabled() -> bool {
    true
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Shape-library section.
    #[serde(default)]
    library: LibraryConfig,

    /// Compilation section.
    #[serde(default)]
    compile: CompileConfig,

    /// Assembly section.
    #[serde(default)]
    assembly: AssemblyConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(library: LibraryConfig, compile: CompileConfig, assembly: AssemblyConfig) -> Self {
        Self {
            library,
            compile,
            assembly,
        }
    }

    pub fn library(&self) -> &LibraryConfig {
        &self.library
    }

    pub fn compile(&self) -> &CompileConfig {
        &self.compile
    }

    pub fn assembly(&self) -> &AssemblyConfig {
        &self.assembly
    }
}

/// Location of the shape-library catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    /// Path to a TOML master catalog.
    #[serde(default)]
    path: Option<PathBuf>,
}

impl LibraryConfig {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Switches for compiling one sub-network.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileConfig {
    /// Remove Ground nodes no port is attached to.
    #[serde(default = "enabled")]
    prune_grounds: bool,

    /// Repair drift between instance fields and their master definitions.
    #[serde(default = "enabled")]
    reconcile: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            prune_grounds: true,
            reconcile: true,
        }
    }
}

impl CompileConfig {
    pub fn new(prune_grounds: bool, reconcile: bool) -> Self {
        Self {
            prune_grounds,
            reconcile,
        }
    }

    pub fn prune_grounds(&self) -> bool {
        self.prune_grounds
    }

    pub fn reconcile(&self) -> bool {
        self.reconcile
    }
}

/// Switches for super-network assembly.
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblyConfig {
    /// Re-import every instance that names a drawing, instead of reusing the
    /// embedded copy.
    #[serde(default = "enabled")]
    refresh: bool,

    /// Seed for generated identities. Unset means a fresh seed per run.
    #[serde(default)]
    seed: Option<u64>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            refresh: true,
            seed: None,
        }
    }
}

impl AssemblyConfig {
    pub fn new(refresh: bool, seed: Option<u64>) -> Self {
        Self { refresh, seed }
    }

    pub fn refresh(&self) -> bool {
        self.refresh
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: AppConfig = toml::from_str(
            r#"
[compile]
prune_grounds = false

[assembly]
seed = 7
"#,
        )
        .unwrap();

        assert!(!config.compile().prune_grounds());
        assert!(config.compile().reconcile());
        assert!(config.assembly().refresh());
        assert_eq!(config.assembly().seed(), Some(7));
        assert!(config.library().path().is_none());
    }

    #[test]
    fn test_empty_config_matches_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert_eq!(config.compile().prune_grounds(), default.compile().prune_grounds());
        assert_eq!(config.assembly().refresh(), default.assembly().refresh());
    }
}
