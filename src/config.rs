use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::llm::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Consulted when neither the config file nor `gemini.api_key_env` supply a key.
pub const SECONDARY_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/publicadmin-sim/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(model) = overrides.model {
            self.gemini.model = model;
        }
        if let Some(base_url) = overrides.base_url {
            self.gemini.base_url = base_url;
        }
        if let Some(api_key) = overrides.api_key {
            self.gemini.api_key = api_key;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    /// Copy safe to print or serve: the inline key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.gemini.api_key.is_empty() {
            copy.gemini.api_key = "***".to_string();
        }
        copy
    }

    pub fn default_template() -> String {
        let template = r#"[gemini]
# Leave empty to read the key from the environment variable below.
api_key = ""
api_key_env = "API_KEY"
model = "gemini-2.5-flash"
base_url = "https://generativelanguage.googleapis.com"
timeout_secs = 60
connect_timeout_secs = 10

[server]
host = "127.0.0.1"
port = 3001
"#;
        template.to_string()
    }
}

impl GeminiConfig {
    /// Inline key first, then the configured environment variable, then
    /// `GEMINI_API_KEY`. Empty when none is set.
    pub fn resolve_api_key(&self) -> String {
        self.resolve_api_key_with(|name| env::var(name).ok())
    }

    fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        if !self.api_key.trim().is_empty() {
            return self.api_key.trim().to_string();
        }
        [self.api_key_env.as_str(), SECONDARY_API_KEY_ENV]
            .into_iter()
            .filter(|name| !name.is_empty())
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("template");
        let defaults = Config::default();
        assert_eq!(parsed.gemini.model, defaults.gemini.model);
        assert_eq!(parsed.gemini.api_key_env, "API_KEY");
        assert_eq!(parsed.server.port, defaults.server.port);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(Some(&dir.path().join("absent.toml"))).expect("config");
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[gemini]\nmodel = \"gemini-2.0-pro\"\n").expect("write");

        let config = Config::load(Some(&path)).expect("config");
        assert_eq!(config.gemini.model, "gemini-2.0-pro");
        assert_eq!(config.gemini.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn write_template_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/dir/config.toml");
        Config::write_template(&path).expect("write template");
        assert!(Config::load(Some(&path)).is_ok());
    }

    #[test]
    fn overrides_replace_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            model: Some("custom".to_string()),
            base_url: None,
            api_key: Some("k".to_string()),
        });
        assert_eq!(config.gemini.model, "custom");
        assert_eq!(config.gemini.api_key, "k");
        assert_eq!(config.redacted().gemini.api_key, "***");
    }

    #[test]
    fn api_key_resolution_order() {
        let env = HashMap::from([
            ("API_KEY".to_string(), "from-env".to_string()),
            ("GEMINI_API_KEY".to_string(), "secondary".to_string()),
        ]);
        let lookup = |name: &str| env.get(name).cloned();

        let mut gemini = GeminiConfig::default();
        assert_eq!(gemini.resolve_api_key_with(lookup), "from-env");

        gemini.api_key_env = "UNSET_VAR".to_string();
        assert_eq!(gemini.resolve_api_key_with(lookup), "secondary");

        gemini.api_key = "inline".to_string();
        assert_eq!(gemini.resolve_api_key_with(lookup), "inline");

        let empty = |_: &str| None;
        assert_eq!(GeminiConfig::default().resolve_api_key_with(empty), "");
    }
}
