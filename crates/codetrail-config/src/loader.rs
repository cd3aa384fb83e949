//! Layered config loading: global → local → CLI overrides.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;
use crate::{ConfigOverrides, CoreConfig};

const CONFIG_DIR_NAME: &str = ".codetrail";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Loads and merges `CoreConfig` from the global home-directory config, a
/// per-codebase local config, and CLI overrides, in that precedence order.
pub struct ConfigLoader {
    global_config_dir: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { global_config_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME)) }
    }

    /// Overrides the global config directory, bypassing home-directory
    /// detection. Used in tests.
    pub fn with_global_dir(dir: impl Into<PathBuf>) -> Self {
        Self { global_config_dir: Some(dir.into()) }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir.as_ref().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    pub fn local_config_path(codebase_root: &Path) -> PathBuf {
        codebase_root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Loads the merged configuration for a codebase: defaults, then the
    /// global file if present, then the local file if present, then
    /// `overrides`.
    pub fn load(&self, codebase_root: &Path, overrides: &ConfigOverrides) -> Result<CoreConfig, ConfigError> {
        let mut config = CoreConfig::default();

        if let Some(path) = self.global_config_path() {
            if let Some(global) = load_config_file(&path)? {
                debug!(path = %path.display(), "applying global config");
                config = merge_configs(config, global);
            }
        }

        let local_path = Self::local_config_path(codebase_root);
        if let Some(local) = load_config_file(&local_path)? {
            debug!(path = %local_path.display(), "applying local config");
            config = merge_configs(config, local);
        }

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn load_global(&self) -> Result<Option<CoreConfig>, ConfigError> {
        match self.global_config_path() {
            Some(path) => load_config_file(&path),
            None => Ok(None),
        }
    }

    pub fn load_local(codebase_root: &Path) -> Result<Option<CoreConfig>, ConfigError> {
        load_config_file(&Self::local_config_path(codebase_root))
    }

    pub fn save_global(&self, config: &CoreConfig) -> Result<(), ConfigError> {
        let path = self.global_config_path().ok_or(ConfigError::NoHomeDir)?;
        save_config_file(&path, config)
    }

    pub fn save_local(codebase_root: &Path, config: &CoreConfig) -> Result<(), ConfigError> {
        save_config_file(&Self::local_config_path(codebase_root), config)
    }

    /// Writes a global config file with defaults if one does not exist yet.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let path = self.global_config_path().ok_or(ConfigError::NoHomeDir)?;
        if !path.exists() {
            save_config_file(&path, &CoreConfig::default())?;
        }
        Ok(path)
    }

    /// Writes a local config file with defaults if one does not exist yet.
    pub fn init_local(codebase_root: &Path) -> Result<PathBuf, ConfigError> {
        let path = Self::local_config_path(codebase_root);
        if !path.exists() {
            save_config_file(&path, &CoreConfig::default())?;
        }
        Ok(path)
    }
}

fn load_config_file(path: &Path) -> Result<Option<CoreConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config: CoreConfig = toml::from_str(&contents).map_err(|e| ConfigError::parse_toml(path, e))?;
    Ok(Some(config))
}

fn save_config_file(path: &Path, config: &CoreConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }
    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))
}

/// Merges `overlay` onto `base`: any field in `overlay` that differs from
/// the default value wins, field by field. List fields (`ignore_patterns`)
/// are concatenated rather than replaced, so a local config can add to the
/// global one without repeating it.
fn merge_configs(base: CoreConfig, overlay: CoreConfig) -> CoreConfig {
    let defaults = CoreConfig::default();

    CoreConfig {
        splitter: if overlay.splitter != defaults.splitter { overlay.splitter } else { base.splitter },
        ignore_patterns: {
            let mut patterns = base.ignore_patterns;
            for pattern in overlay.ignore_patterns {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
            patterns
        },
        indexing: if overlay.indexing != defaults.indexing { overlay.indexing } else { base.indexing },
        vector_db: if overlay.vector_db != defaults.vector_db { overlay.vector_db } else { base.vector_db },
        graph_db: if overlay.graph_db != defaults.graph_db { overlay.graph_db } else { base.graph_db },
        embedding: if overlay.embedding != defaults.embedding { overlay.embedding } else { base.embedding },
        explainer: if overlay.explainer != defaults.explainer { overlay.explainer } else { base.explainer },
        storage: if overlay.storage != defaults.storage { overlay.storage } else { base.storage },
        logging: if overlay.logging != defaults.logging { overlay.logging } else { base.logging },
    }
}
