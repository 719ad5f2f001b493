use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use lexchat_session::DirectoryConfig;
use lexchat_transport::TransportConfig;
use serde::{Deserialize, Serialize};

const APP_DIRECTORY_NAME: &str = "lexchat";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Runtime configuration: defaults, then the config file, then
/// `LEXCHAT_`-prefixed environment variables, last writer wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
    pub history_ttl_secs: u64,
    pub sessions_ttl_secs: u64,
    pub history_limit: u32,
    pub sessions_limit: u32,
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
            stream_idle_timeout_secs: 120,
            history_ttl_secs: 30 * 60,
            sessions_ttl_secs: 30 * 60,
            history_limit: 50,
            sessions_limit: 20,
            data_dir: None,
            cache_dir: None,
        }
    }
}

impl CliConfig {
    pub fn load() -> Self {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(Self::default_config_path()))
            .merge(Env::prefixed("LEXCHAT_"));

        match figment.extract::<Self>() {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(error = %error, "invalid configuration, using defaults");
                Self::default()
            }
        }
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(APP_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".lexchat"))
    }

    fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|path| path.join(APP_DIRECTORY_NAME))
                .unwrap_or_else(|| PathBuf::from(".lexchat"))
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|path| path.join(APP_DIRECTORY_NAME))
                .unwrap_or_else(|| PathBuf::from(".lexchat-cache"))
        })
    }

    pub fn identity_path(&self) -> PathBuf {
        self.data_dir().join("identity.json")
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stream_idle_timeout: Duration::from_secs(self.stream_idle_timeout_secs),
        }
    }

    pub fn directory(&self) -> DirectoryConfig {
        DirectoryConfig {
            history_ttl: Duration::from_secs(self.history_ttl_secs),
            sessions_ttl: Duration::from_secs(self.sessions_ttl_secs),
            history_limit: self.history_limit,
            sessions_limit: self.sessions_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_backend_dev_setup() {
        let config = CliConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.directory().history_ttl, Duration::from_secs(1800));
        assert_eq!(config.transport().request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_variables_override_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LEXCHAT_BASE_URL", "http://10.0.0.2:9000");
            jail.set_env("LEXCHAT_HISTORY_LIMIT", "5");

            let config: CliConfig = Figment::from(Serialized::defaults(CliConfig::default()))
                .merge(Env::prefixed("LEXCHAT_"))
                .extract()?;
            assert_eq!(config.base_url, "http://10.0.0.2:9000");
            assert_eq!(config.history_limit, 5);
            Ok(())
        });
    }
}
