// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_APP_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const DEFAULT_APP_CONFIG_PATH: &str = "config/app.toml";

const ENV_SOURCES_PATH: &str = "SOURCES_PATH";
const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
const ENV_FETCH_MAX_REDIRECTS: &str = "FETCH_MAX_REDIRECTS";
const ENV_STATIC_DIR: &str = "STATIC_DIR";

fn default_sources_path() -> PathBuf {
    PathBuf::from("source_list.json")
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_fetch_max_redirects() -> usize {
    5
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

/// Service settings. File values come first, environment variables win.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_fetch_max_redirects")]
    pub fetch_max_redirects: usize,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources_path: default_sources_path(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_max_redirects: default_fetch_max_redirects(),
            static_dir: default_static_dir(),
        }
    }
}

impl AppConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Parse a TOML file; every key is optional.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading app config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $APP_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    ///
    /// then apply the per-field environment overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_APP_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_APP_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_APP_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var(ENV_SOURCES_PATH) {
            self.sources_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_FETCH_TIMEOUT_SECS}={v:?} is not a number"))?;
        }
        if let Ok(v) = std::env::var(ENV_FETCH_MAX_REDIRECTS) {
            self.fetch_max_redirects = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_FETCH_MAX_REDIRECTS}={v:?} is not a number"))?;
        }
        if let Ok(v) = std::env::var(ENV_STATIC_DIR) {
            self.static_dir = PathBuf::from(v);
        }
        Ok(())
    }
}
