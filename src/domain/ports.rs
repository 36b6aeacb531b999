use crate::domain::model::{Coordinate, MarketData, RegionSpec};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Device/OS location service. May be denied, unavailable or slow.
pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> impl std::future::Future<Output = Result<Coordinate>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn fallback_reference(&self) -> Coordinate;
    fn location_timeout_seconds(&self) -> u64;
    fn base_price(&self) -> f64;
    fn history_days(&self) -> usize;
    fn regions(&self) -> &[RegionSpec];
    fn refresh_interval_seconds(&self) -> u64;
    fn currency_prefix(&self) -> &str;
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch(&self) -> Result<MarketData>;
}
