use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str =
    "wikidump/0.1 (+https://www.mediawiki.org/wiki/API:Etiquette)";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LIST_DELAY_MS: u64 = 100;
pub const DEFAULT_DOWNLOAD_DELAY_MS: u64 = 500;

pub const ENV_USER_AGENT: &str = "WIKI_USER_AGENT";
pub const ENV_TIMEOUT_MS: &str = "WIKI_HTTP_TIMEOUT_MS";
pub const ENV_LIST_DELAY_MS: &str = "WIKI_LIST_DELAY_MS";
pub const ENV_DOWNLOAD_DELAY_MS: &str = "WIKI_DOWNLOAD_DELAY_MS";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub pacing: PacingSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct HttpSection {
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PacingSection {
    pub list_delay_ms: Option<u64>,
    pub download_delay_ms: Option<u64>,
}

/// Effective settings for a run: env > config file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
    pub list_delay_ms: u64,
    pub download_delay_ms: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self::from_file(&ConfigFile::default())
    }
}

impl DownloaderConfig {
    pub fn from_file(file: &ConfigFile) -> Self {
        Self::resolve(file, |key| env::var(key).ok())
    }

    /// Layer `lookup` (normally the process environment) over `file`, then
    /// fill the gaps with defaults.
    pub fn resolve(file: &ConfigFile, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());

        Self {
            user_agent: text(ENV_USER_AGENT).unwrap_or_else(|| {
                file.http
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
            }),
            timeout_ms: number(ENV_TIMEOUT_MS)
                .or(file.http.timeout_ms)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            list_delay_ms: number(ENV_LIST_DELAY_MS)
                .or(file.pacing.list_delay_ms)
                .unwrap_or(DEFAULT_LIST_DELAY_MS),
            download_delay_ms: number(ENV_DOWNLOAD_DELAY_MS)
                .or(file.pacing.download_delay_ms)
                .unwrap_or(DEFAULT_DOWNLOAD_DELAY_MS),
        }
    }

    /// Resolve from an optional TOML file. A missing path means defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };
        Ok(Self::from_file(&file))
    }

    pub fn list_delay(&self) -> Duration {
        Duration::from_millis(self.list_delay_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

/// Read `wikidump.toml`-style settings. An absent file yields empty sections so
/// a fresh checkout runs on defaults.
pub fn load_config_file(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}
