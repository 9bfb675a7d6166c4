use intake_audit::AuditConfig;
use intake_core::CommandPhrases;
use intake_dispatch::DispatchConfig;
use intake_storage::StorageConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const ENV_DOWNSTREAM_URL: &str = "INTAKE_DOWNSTREAM_URL";
pub const ENV_NEXT_ACTION_WEBHOOK: &str = "INTAKE_NEXT_ACTION_WEBHOOK";

#[derive(Debug, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub commands: CommandPhrases,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            dispatch: DispatchConfig::default(),
            commands: CommandPhrases::default(),
            audit: AuditConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionsConfig {
    /// Idle time after which a session is evicted.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SessionsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    10000
}
fn default_ttl_secs() -> u64 {
    86_400
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl IntakeConfig {
    /// Reads the config file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text).map_err(|e| {
                anyhow::anyhow!("Failed to parse config file '{}': {e}", path.display())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file '{}': {e}",
                path.display()
            )),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_DOWNSTREAM_URL).filter(|v| !v.trim().is_empty()) {
            self.dispatch.downstream_url = url;
        }
        if let Some(url) = lookup(ENV_NEXT_ACTION_WEBHOOK).filter(|v| !v.trim().is_empty()) {
            self.dispatch.next_action_webhook = Some(url);
        }
    }

    /// Checks settings that have no usable default.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dispatch.downstream_url.trim().is_empty() {
            anyhow::bail!(
                "dispatch.downstream_url is not set (config file or {ENV_DOWNSTREAM_URL})"
            );
        }
        if self.dispatch.workers == 0 {
            anyhow::bail!("dispatch.workers must be at least 1");
        }
        Ok(())
    }
}
