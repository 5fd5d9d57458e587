use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::rotation::Backend;
use crate::transport::TransportConfig;

const CONFIG_FILE_NAME: &str = "credrotate.toml";

/// Transport defaults applied to every backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportDefaults {
    /// Skip TLS verification for all backends. Unset keeps each backend's
    /// own default.
    pub accept_invalid_certs: Option<bool>,

    /// Override the `User-Agent` header.
    pub user_agent: Option<String>,
}

/// Per-backend overrides, keyed by backend name in `[backends.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOverride {
    pub accept_invalid_certs: Option<bool>,

    /// Replace the backend's default endpoint (regional clouds, proxies).
    pub base_url: Option<String>,
}

/// Operator configuration. Never carries secrets; those arrive on stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportDefaults,
    pub backends: BTreeMap<String, BackendOverride>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        for name in config.backends.keys() {
            name.parse::<Backend>()
                .with_context(|| format!("Invalid [backends] table in {}", path.display()))?;
        }

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Transport settings for one backend.
    ///
    /// Precedence: the `[backends.<name>]` table, then `[transport]`, then
    /// the backend's built-in default.
    pub fn transport_for(&self, backend: Backend) -> TransportConfig {
        let overrides = self
            .backends
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(backend.name()))
            .map(|(_, o)| o.clone())
            .unwrap_or_default();

        TransportConfig {
            accept_invalid_certs: overrides
                .accept_invalid_certs
                .or(self.transport.accept_invalid_certs)
                .unwrap_or_else(|| backend.accepts_invalid_certs_by_default()),
            base_url: overrides.base_url,
            user_agent: self.transport.user_agent.clone(),
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./credrotate.toml` if it exists in current directory
/// 2. `<config dir>/credrotate/credrotate.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("credrotate").join(CONFIG_FILE_NAME);
    }

    local_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::load_or_default(&dir.path().join("absent.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert!(config.backends.is_empty());
        assert_eq!(config.transport.accept_invalid_certs, None);
        Ok(())
    }

    #[test]
    fn test_backend_override_wins() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[transport]")?;
        writeln!(file, "accept_invalid_certs = false")?;
        writeln!(file, "user_agent = \"rotator/1\"")?;
        writeln!(file, "[backends.tenable-io-user]")?;
        writeln!(file, "base_url = \"https://fedcloud.tenable.com\"")?;
        writeln!(file, "[backends.cisco-ios-xe]")?;
        writeln!(file, "accept_invalid_certs = true")?;

        let config = Config::load(&config_path)?;

        let tenable = config.transport_for(Backend::TenableIoUser);
        assert_eq!(tenable.base_url.as_deref(), Some("https://fedcloud.tenable.com"));
        assert!(!tenable.accept_invalid_certs);
        assert_eq!(tenable.user_agent.as_deref(), Some("rotator/1"));

        assert!(config.transport_for(Backend::CiscoIosXe).accept_invalid_certs);
        assert!(!config.transport_for(Backend::Meraki).accept_invalid_certs);
        Ok(())
    }

    #[test]
    fn test_builtin_cert_defaults() {
        let config = Config::default();
        assert!(config.transport_for(Backend::CiscoIosXe).accept_invalid_certs);
        assert!(!config.transport_for(Backend::Snowflake).accept_invalid_certs);
        assert_eq!(config.transport_for(Backend::Snowflake).base_url, None);
    }

    #[test]
    fn test_unknown_backend_table_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[backends.nessus]\nbase_url = \"https://x\"\n")?;

        assert!(Config::load(&config_path).is_err());
        Ok(())
    }
}
