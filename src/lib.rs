pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::dashboard::{DashboardEngine, DashboardReport};
pub use config::FarmConfig;
pub use crate::core::facilities::FacilityBoard;
pub use crate::core::market::MarketSeriesGenerator;
pub use crate::core::refresh::{MarketBoard, MarketRefresher};
pub use crate::core::user_sync::UserDirectory;
pub use utils::error::{FarmError, Result};
