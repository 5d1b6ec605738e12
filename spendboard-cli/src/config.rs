use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use spendboard_api::{RetryPolicy, DEFAULT_BASE_URL};
use spendboard_core::{Granularity, RangePreset};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_spendboard_home;

pub const API_URL_ENV: &str = "SPENDBOARD_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub fetch: FetchSection,
    pub display: DisplaySection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    /// Per-request timeout. Uploads wait on AI extraction, so keep this generous.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchSection {
    pub retries: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplaySection {
    pub currency_symbol: String,
    /// IANA zone used to decide what "this month" means
    pub timezone: String,
    pub default_range: RangePreset,
    pub default_view: Granularity,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_initial_ms: 1000,
            backoff_max_ms: 30_000,
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            currency_symbol: "Rp".to_string(),
            timezone: "Asia/Jakarta".to_string(),
            default_range: RangePreset::ThisMonth,
            default_view: Granularity::Daily,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.fetch.retries,
            initial_backoff: Duration::from_millis(self.fetch.backoff_initial_ms),
            max_backoff: Duration::from_millis(self.fetch.backoff_max_ms),
        }
    }

    /// Flag beats env beats file
    pub fn apply_api_url(&mut self, flag: Option<String>, env: Option<String>) {
        let set = |v: Option<String>| v.filter(|u| !u.trim().is_empty());
        if let Some(url) = set(flag).or(set(env)) {
            self.api.base_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("api.base_url must start with http:// or https:// (got {url:?})");
        }
        if self.api.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than 0");
        }
        if self.fetch.backoff_initial_ms > self.fetch.backoff_max_ms {
            bail!("fetch.backoff_initial_ms is larger than fetch.backoff_max_ms");
        }
        self.display
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("unknown timezone: {}", self.display.timezone))?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_spendboard_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(p: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Config after the `--api-url` / `SPENDBOARD_API_URL` overrides
pub fn effective_config(api_url: Option<String>) -> Result<Config> {
    let mut cfg = load_config()?;
    cfg.apply_api_url(api_url, std::env::var(API_URL_ENV).ok());
    cfg.validate()?;
    Ok(cfg)
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config(cfg: &Config) -> Result<()> {
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg).context("serialize config")?);
    Ok(())
}
