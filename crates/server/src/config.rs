use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use haulbook_finance::EngineConfig;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "HAULBOOK_CONFIG";
pub const DB_PATH_ENV: &str = "HAULBOOK_DB_PATH";
pub const BIND_ADDR_ENV: &str = "HAULBOOK_BIND_ADDR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("haulbook.db"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_format: LogFormat::Text,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the file named by `HAULBOOK_CONFIG` if it exists, then applies
    /// the environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let file = match std::env::var_os(CONFIG_ENV) {
            Some(path) => read_if_present(Path::new(&path))?,
            None => None,
        };
        Self::from_sources(
            file.as_deref(),
            std::env::var(DB_PATH_ENV).ok(),
            std::env::var(BIND_ADDR_ENV).ok(),
        )
    }

    pub fn from_sources(
        file: Option<&str>,
        database_path: Option<String>,
        bind_addr: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = match file {
            Some(contents) => toml::from_str(contents).context("invalid configuration file")?,
            None => ServerConfig::default(),
        };
        if let Some(path) = database_path.filter(|p| !p.is_empty()) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(addr) = bind_addr.filter(|a| !a.is_empty()) {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("{BIND_ADDR_ENV} is not a socket address: {addr}"))?;
        }
        Ok(config)
    }
}

fn read_if_present(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}
