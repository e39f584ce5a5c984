use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::import::ImportOptions;

pub const ENV_URL: &str = "RACE_TRACKER_URL";
pub const ENV_API_KEY: &str = "RACE_TRACKER_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "RACE_TRACKER_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub import: ImportOptions,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Hosted PostgREST-style table.
    #[default]
    Rest,
    /// Local SQLite file with the same table shape.
    Sqlite,
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rest => write!(f, "rest"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" | "hosted" => Ok(Self::Rest),
            "sqlite" | "local" => Ok(Self::Sqlite),
            _ => Err(anyhow!("unknown store backend: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub access_token: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
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
    pub backend: Option<StoreBackend>,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
}

impl ConfigOverrides {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            backend: None,
            url: read(ENV_URL),
            api_key: read(ENV_API_KEY),
            access_token: read(ENV_ACCESS_TOKEN),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/race-tracker/config.toml")
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
        Self::parse(&data).with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.backend {
            self.store.backend = backend;
        }
        if let Some(url) = overrides.url {
            self.store.url = url;
        }
        if let Some(api_key) = overrides.api_key {
            self.store.api_key = api_key;
        }
        if let Some(token) = overrides.access_token {
            self.store.access_token = token;
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

    pub fn resolved_sqlite_path(&self) -> PathBuf {
        expand_tilde(&self.store.sqlite_path)
    }

    pub fn default_template() -> String {
        let template = r#"[store]
# "rest" for the hosted table, "sqlite" for a local file
backend = "rest"
url = "https://your-project.example.co"
api_key = "your-anon-key"
table = "races"
timeout_secs = 15
connect_timeout_secs = 6
sqlite_path = "~/.local/share/race-tracker/races.db"

[import]
dialect = "naive"
strategy = "year_keyed"

[server]
host = "127.0.0.1"
port = 3001
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: String::new(),
            api_key: String::new(),
            access_token: String::new(),
            table: default_table(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            sqlite_path: default_sqlite_path(),
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

fn default_table() -> String {
    "races".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    6
}

fn default_sqlite_path() -> String {
    "~/.local/share/race-tracker/races.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigOverrides, StoreBackend};
    use crate::import::{CsvDialect, MappingStrategy};

    #[test]
    fn template_parses_to_defaults() {
        let config = Config::parse(&Config::default_template()).expect("template should parse");
        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert_eq!(config.store.table, "races");
        assert_eq!(config.import.dialect, CsvDialect::Naive);
        assert_eq!(config.import.strategy, MappingStrategy::YearKeyed);
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config = Config::parse("[store]\nbackend = \"sqlite\"\n[import]\ndialect = \"quoted\"\n")
            .expect("partial config should parse");
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.timeout_secs, 15);
        assert_eq!(config.import.dialect, CsvDialect::Quoted);
        assert_eq!(config.import.strategy, MappingStrategy::YearKeyed);
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let mut config = Config::default();
        config.store.api_key = "from-file".to_string();
        config.apply_overrides(ConfigOverrides {
            backend: Some(StoreBackend::Sqlite),
            url: Some("http://localhost:54321".to_string()),
            api_key: None,
            access_token: Some("jwt".to_string()),
        });
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.url, "http://localhost:54321");
        assert_eq!(config.store.api_key, "from-file");
        assert_eq!(config.store.access_token, "jwt");
    }

    #[test]
    fn access_token_is_never_shown() {
        let mut config = Config::default();
        config.store.access_token = "jwt".to_string();
        let shown = serde_json::to_string(&config).expect("config should encode");
        assert!(!shown.contains("jwt"));
    }
}
