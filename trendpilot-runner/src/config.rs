//! Bot configuration.
//!
//! One immutable [`BotConfig`] is read from a TOML file at start-up and handed
//! to every component. Each field defaults to the production setting, so an
//! empty file is a valid configuration. Broker credentials never live in the
//! file; they come from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendpilot_core::domain::{AssetClass, Instrument};
use trendpilot_core::params::{ParamError, RiskParams, SizingParams, StrategyParams};

pub const API_KEY_ENV: &str = "APCA_API_KEY_ID";
pub const API_SECRET_ENV: &str = "APCA_API_SECRET_KEY";

const PAPER_TRADING_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_TRADING_URL: &str = "https://api.alpaca.markets";
const DATA_URL: &str = "https://data.alpaca.markets";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing environment variable {0}")]
    MissingCredential(&'static str),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ParamError> for ConfigError {
    fn from(e: ParamError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

/// The traded instrument as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub asset_class: AssetClass,
    /// Overrides the asset-class default.
    pub always_open: Option<bool>,
    /// Overrides the asset-class default.
    pub fractional: Option<bool>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USD".to_string(),
            asset_class: AssetClass::Crypto,
            always_open: None,
            fractional: None,
        }
    }
}

impl InstrumentConfig {
    pub fn instrument(&self) -> Instrument {
        let mut instrument = Instrument::new(self.symbol.clone(), self.asset_class);
        if let Some(open) = self.always_open {
            instrument.always_open = open;
        }
        if let Some(fractional) = self.fractional {
            instrument.fractional = fractional;
        }
        instrument
    }
}

/// Bar history and polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub lookback_1h: usize,
    pub lookback_4h: usize,
    pub poll_seconds: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            lookback_1h: 300,
            lookback_4h: 300,
            poll_seconds: 60,
        }
    }
}

/// Broker endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub paper: bool,
    /// Defaults to the paper or live endpoint depending on `paper`.
    pub trading_url: Option<String>,
    pub data_url: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            paper: true,
            trading_url: None,
            data_url: DATA_URL.to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn trading_base_url(&self) -> &str {
        match &self.trading_url {
            Some(url) => url,
            None if self.paper => PAPER_TRADING_URL,
            None => LIVE_TRADING_URL,
        }
    }
}

/// Where state and logs are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("state"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Complete bot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub instrument: InstrumentConfig,
    pub strategy: StrategyParams,
    pub sizing: SizingParams,
    pub risk: RiskParams,
    pub data: DataConfig,
    pub broker: BrokerConfig,
    pub paths: PathsConfig,
    /// Log per-bar gate diagnostics at info level.
    pub debug_signals: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            instrument: InstrumentConfig::default(),
            strategy: StrategyParams::default(),
            sizing: SizingParams::default(),
            risk: RiskParams::default(),
            data: DataConfig::default(),
            broker: BrokerConfig::default(),
            paths: PathsConfig::default(),
            debug_signals: true,
        }
    }
}

impl BotConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("instrument.symbol is empty".into()));
        }
        self.strategy.validate()?;
        self.sizing.validate()?;
        self.risk.validate()?;
        if self.data.lookback_1h == 0 || self.data.lookback_4h == 0 {
            return Err(ConfigError::Invalid("data lookbacks must be >= 1".into()));
        }
        if self.data.poll_seconds == 0 {
            return Err(ConfigError::Invalid("data.poll_seconds must be >= 1".into()));
        }
        Ok(())
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument.instrument()
    }

    /// Content hash of the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Alpaca API key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key_id: String,
    pub secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let key_id = non_empty_env(API_KEY_ENV)?;
        let secret = non_empty_env(API_SECRET_ENV)?;
        Ok(Self { key_id, secret })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn non_empty_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}
