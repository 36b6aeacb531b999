pub mod toml_config;

pub use toml_config::FarmConfig;

#[cfg(feature = "cli")]
use crate::domain::model::Coordinate;
#[cfg(feature = "cli")]
use crate::utils::error::{FarmError, Result};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "agrodesk")]
#[command(about = "Slaughterhouse ranking and cattle market board")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Reference latitude; without it the configured fallback point is used
    #[arg(long, allow_hyphen_values = true, requires = "longitude")]
    pub latitude: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    pub longitude: Option<f64>,

    /// Print the dashboard as JSON
    #[arg(long)]
    pub json: bool,

    /// Keep refreshing the market board until Ctrl-C
    #[arg(long)]
    pub watch: bool,

    /// Override the refresh interval from the config file
    #[arg(long)]
    pub interval_seconds: Option<u64>,

    /// JSON log lines instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the config file (defaults when none is given) and applies command-line overrides.
    pub fn load(&self) -> Result<FarmConfig> {
        let mut config = match &self.config {
            Some(path) => FarmConfig::from_file(path).map_err(|e| match e {
                FarmError::IoError(io) => FarmError::ConfigError {
                    message: format!("Failed to read config file '{}': {}", path, io),
                },
                other => other,
            })?,
            None => FarmConfig::default(),
        };

        if let Some(interval) = self.interval_seconds {
            config.market.refresh_interval_seconds = interval;
        }

        Ok(config)
    }

    pub fn explicit_reference(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }
}
