pub mod facilities;
pub mod format;
pub mod geo;
pub mod market;
pub mod refresh;
pub mod session;
pub mod user_sync;

pub use crate::domain::model::{
    ChangeEvent, Coordinate, DerivedVariations, Facility, FacilityInput, MarketData,
    MarketSnapshot, RegionSpec, RegionalPrice, UserRecord, UserRole,
};
pub use crate::domain::ports::{ConfigProvider, LocationProvider, MarketSource};
pub use crate::utils::error::Result;
