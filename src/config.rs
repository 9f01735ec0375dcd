use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub shortcuts: ShortcutConfig,
    pub copy: CopyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    /// Shortcut file extension, without the dot.
    pub extension: String,
    /// Text the shell appends to names of newly created shortcuts.
    pub name_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyConfig {
    pub preserve_hierarchy: bool,
    pub check_free_space: bool,
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        default_config().shortcuts
    }
}

fn default_config() -> Config {
    Config {
        shortcuts: ShortcutConfig {
            extension: "lnk".to_string(),
            name_suffix: " - Shortcut".to_string(),
        },
        copy: CopyConfig {
            preserve_hierarchy: true,
            check_free_space: true,
        },
    }
}

fn lnkview_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirectory)?;
    let dir = home.join("lnkview");

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(ConfigError::CreateDirectory)?;
    }

    Ok(dir)
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(lnkview_dir()?.join("config.toml"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path()?)
}

pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    save_config_to(config, &config_path()?)
}

/// Reads the config at `path`, writing the defaults there first if it is missing.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        let config = default_config();
        save_config_to(&config, path)?;
        info!(path = %path.display(), "wrote default config");
        return Ok(config);
    }

    let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
    Ok(toml::from_str::<Config>(&content)?)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let serialized = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirectory)?;
        }
    }

    fs::write(path, serialized).map_err(ConfigError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let config = default_config();
        let serialized = toml::to_string(&config).expect("serialize");
        let parsed = toml::from_str::<Config>(&serialized).expect("parse");
        assert_eq!(parsed.shortcuts.extension, "lnk");
        assert_eq!(parsed.shortcuts.name_suffix, " - Shortcut");
    }

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded, Config::default());
        assert!(path.exists());

        let mut changed = loaded;
        changed.copy.check_free_space = false;
        save_config_to(&changed, &path).expect("save");

        let reloaded = load_config_from(&path).expect("reload");
        assert!(!reloaded.copy.check_free_space);
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "shortcuts = 3").expect("write");

        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
