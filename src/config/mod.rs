use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Env var naming the optional TOML config file
pub const CONFIG_PATH_ENV: &str = "INTENT_BRIDGE_CONFIG";

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub semantic: SemanticConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8089".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Control server connection
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token forwarded on every request
    #[serde(default)]
    pub token: String,
    /// Per-call timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Where the device directory document lives
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_path")]
    pub path: PathBuf,
}

fn default_directory_path() -> PathBuf {
    PathBuf::from("devices.json")
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            path: default_directory_path(),
        }
    }
}

/// Presence gate configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresenceConfig {
    /// Takes precedence over the directory's presence entity
    #[serde(default)]
    pub entity_override: Option<String>,
}

/// Semantic-model fallback parser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemanticConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ServiceConfig {
    /// Defaults, then the TOML file named by `INTENT_BRIDGE_CONFIG` (if set
    /// and present), then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if Path::new(&path).exists() => load_config(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Unparseable numeric values are ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("INTENT_BRIDGE_BIND") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("HA_BASE_URL") {
            self.control.base_url = v;
        }
        if let Some(v) = var("HA_TOKEN") {
            self.control.token = v;
        }
        if let Some(v) = var("HA_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.control.timeout_seconds = n;
            }
        }
        if let Some(v) = var("DEVICES_PATH") {
            self.directory.path = PathBuf::from(v);
        }
        if let Some(v) = var("HOME_PRESENCE_ENTITY") {
            self.presence.entity_override = Some(v);
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.semantic.api_key = Some(v);
        }

        self.control.base_url = self.control.base_url.trim_end_matches('/').to_string();
        self.presence.entity_override = self
            .presence
            .entity_override
            .take()
            .filter(|e| !e.trim().is_empty());
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<ServiceConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ServiceConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8089");
        assert_eq!(config.control.base_url, "http://homeassistant.local:8123");
        assert_eq!(config.control.token, "");
        assert_eq!(config.control.timeout_seconds, 10);
        assert_eq!(config.directory.path, PathBuf::from("devices.json"));
        assert_eq!(config.presence.entity_override, None);
        assert_eq!(config.semantic.api_key, None);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind_addr = "127.0.0.1:9000"

            [control]
            base_url = "http://ha.lan:8123"
            token = "abc"
            timeout_seconds = 3

            [directory]
            path = "/var/lib/intent-bridge/devices.json"

            [presence]
            entity_override = "person.alex"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.control.base_url, "http://ha.lan:8123");
        assert_eq!(config.control.token, "abc");
        assert_eq!(config.control.timeout_seconds, 3);
        assert_eq!(
            config.directory.path,
            PathBuf::from("/var/lib/intent-bridge/devices.json")
        );
        assert_eq!(config.presence.entity_override.as_deref(), Some("person.alex"));
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [control]
            token = "abc"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.control.token, "abc");
        assert_eq!(config.control.timeout_seconds, 10);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8089");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HA_BASE_URL", "http://10.0.0.5:8123/"),
            ("HA_TOKEN", "secret"),
            ("HA_TIMEOUT_SECONDS", "not-a-number"),
            ("DEVICES_PATH", "/tmp/devices.json"),
            ("HOME_PRESENCE_ENTITY", "binary_sensor.occupancy"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.control.base_url, "http://10.0.0.5:8123");
        assert_eq!(config.control.token, "secret");
        assert_eq!(config.control.timeout_seconds, 10);
        assert_eq!(config.directory.path, PathBuf::from("/tmp/devices.json"));
        assert_eq!(
            config.presence.entity_override.as_deref(),
            Some("binary_sensor.occupancy")
        );
        assert_eq!(config.semantic.api_key, None);
    }

    #[test]
    fn test_blank_presence_override_is_ignored() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(|k| (k == "HOME_PRESENCE_ENTITY").then(|| "  ".to_string()));
        assert_eq!(config.presence.entity_override, None);
    }

    #[test]
    fn test_load_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("intent-bridge.toml");
        std::fs::write(&path, "[server]\nbind_addr = \"127.0.0.1:7000\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:7000");

        std::fs::write(&path, "[server\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
