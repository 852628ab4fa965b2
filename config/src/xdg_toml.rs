//! Load `$XDG_CONFIG_HOME/<app>/config.toml`: the `[env]` table and the `[engine]` table.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::LoadError;

/// Base config dir: `XDG_CONFIG_HOME` when set, else the platform config dir.
fn config_home() -> Result<PathBuf, LoadError> {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => dirs::config_dir()
            .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".into())),
    }
}

fn config_path(app_name: &str) -> Result<Option<PathBuf>, LoadError> {
    let path = config_home()?.join(app_name).join("config.toml");
    Ok(path.is_file().then_some(path))
}

/// `[engine]` table: defaults for every run of a compiled graph. Unset keys keep the
/// engine's built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    pub max_steps: Option<usize>,
    pub run_timeout_ms: Option<u64>,
    pub node_timeout_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    engine: EngineSection,
}

fn load_file(app_name: &str) -> Result<ConfigFile, LoadError> {
    let Some(path) = config_path(app_name)? else {
        return Ok(ConfigFile::default());
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    Ok(toml::from_str(&content)?)
}

/// Key-value pairs from `[env]`. Missing file or section returns an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    Ok(load_file(app_name)?.env)
}

/// The `[engine]` table. Missing file or section returns an all-`None` section.
pub fn load_engine_section(app_name: &str) -> Result<EngineSection, LoadError> {
    Ok(load_file(app_name)?.engine)
}
