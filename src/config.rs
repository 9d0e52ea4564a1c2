// ⚙️ Configuration - TOML file with defaults for every field

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "price-list.toml";

/// VAT multiplier applied on top of the margin (18%).
pub const DEFAULT_VAT_RATE: f64 = 0.18;

/// Currency the supplier price document is quoted in.
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_db_path() -> String {
    "price_list.db".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
}

fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            vat_rate: DEFAULT_VAT_RATE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            default_currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: default_db_path(),
            pricing: PricingConfig::default(),
            extraction: ExtractionConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Parse a config file. The file must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `path` if given, else `price-list.toml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(content)?;
        cfg.extraction.default_currency = cfg.extraction.default_currency.trim().to_uppercase();
        if cfg.extraction.default_currency.is_empty() {
            cfg.extraction.default_currency = default_currency();
        }
        Ok(cfg)
    }
}
