use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use drops_navigation::InflationParams;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::SettingsError;
use crate::link::LinkOptions;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Runtime settings for the poll loop and the link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// JSON file the file-backed fetch client reads each cycle.
    pub payload_path: PathBuf,
    pub constants_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    pub inflation_radius: i32,
    pub inflation_weight: f64,
    pub event_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            payload_path: PathBuf::from("config/payload.json"),
            constants_path: None,
            poll_interval_ms: 500,
            fetch_timeout_ms: 5_000,
            inflation_radius: drops_navigation::map::DEFAULT_INFLATION_RADIUS,
            inflation_weight: drops_navigation::map::DEFAULT_INFLATION_WEIGHT,
            event_capacity: 64,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn inflation(&self) -> Result<InflationParams, SettingsError> {
        Ok(InflationParams::new(self.inflation_radius, self.inflation_weight)?)
    }

    pub fn link_options(&self) -> Result<LinkOptions, SettingsError> {
        Ok(LinkOptions {
            fetch_timeout: self.fetch_timeout(),
            inflation: self.inflation()?,
            event_capacity: self.event_capacity,
        })
    }
}

pub fn load_settings() -> Result<Settings, SettingsError> {
    load_settings_from(DEFAULT_CONFIG_PATH)
}

/// Loads `path` (optional) overlaid with `DROPS_*` environment variables.
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    info!("Attempting to load configuration from {}", path.display());

    let settings = Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
        .add_source(Environment::with_prefix("DROPS").try_parsing(true))
        .build()
        .and_then(|c| c.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            settings.inflation()?;
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}
