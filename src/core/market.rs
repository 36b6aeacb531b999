use crate::domain::model::{DerivedVariations, MarketData, MarketSnapshot, RegionSpec, RegionalPrice};
use crate::domain::ports::MarketSource;
use crate::utils::error::{FarmError, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_HISTORY_DAYS: usize = 30;
pub const SERIES_PRICE_SPREAD: f64 = 10.0;
pub const SERIES_VARIATION_SPREAD: f64 = 3.0;
pub const REGIONAL_PRICE_SPREAD: f64 = 5.0;
pub const REGIONAL_VARIATION_SPREAD: f64 = 2.0;

/// How the per-entry `variation` field is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationMode {
    /// Independently sampled decorative value, unrelated to the adjacent
    /// prices. This is what the dashboard has always shown.
    #[default]
    Sampled,
    /// Day-over-day change for the history, change against the base price
    /// for regional entries.
    Derived,
}

/// Synthetic market data for when no real feed is wired in.
pub struct MarketSeriesGenerator<R: Rng = StdRng> {
    rng: R,
    mode: VariationMode,
}

impl MarketSeriesGenerator<StdRng> {
    pub fn from_entropy(mode: VariationMode) -> Self {
        Self::new(StdRng::from_entropy(), mode)
    }

    pub fn seeded(seed: u64, mode: VariationMode) -> Self {
        Self::new(StdRng::seed_from_u64(seed), mode)
    }
}

impl<R: Rng> MarketSeriesGenerator<R> {
    pub fn new(rng: R, mode: VariationMode) -> Self {
        Self { rng, mode }
    }

    pub fn mode(&self) -> VariationMode {
        self.mode
    }

    /// One entry per calendar day, oldest first, the last one dated `base_date`.
    pub fn generate_series(
        &mut self,
        base_date: NaiveDate,
        base_price: f64,
        days: usize,
        region: &str,
    ) -> Vec<MarketSnapshot> {
        let mut series: Vec<MarketSnapshot> = Vec::with_capacity(days);

        for offset in (0..days).rev() {
            let date = base_date - ChronoDuration::days(offset as i64);
            let price = round2(base_price + self.spread(SERIES_PRICE_SPREAD));
            let sampled = self.spread(SERIES_VARIATION_SPREAD);

            let variation = match (self.mode, series.last()) {
                (VariationMode::Sampled, _) => round2(sampled),
                (VariationMode::Derived, Some(previous)) => percent_change(previous.price, price),
                (VariationMode::Derived, None) => 0.0,
            };

            series.push(MarketSnapshot {
                date,
                price,
                region: region.to_string(),
                variation,
            });
        }

        series
    }

    pub fn generate_regional_prices(&mut self, regions: &[RegionSpec]) -> Vec<RegionalPrice> {
        regions
            .iter()
            .map(|region| {
                let price = round2(region.base_price + self.spread(REGIONAL_PRICE_SPREAD));
                let sampled = self.spread(REGIONAL_VARIATION_SPREAD);
                let variation = match self.mode {
                    VariationMode::Sampled => round2(sampled),
                    VariationMode::Derived => percent_change(region.base_price, price),
                };
                RegionalPrice {
                    region: region.name.clone(),
                    price,
                    variation,
                }
            })
            .collect()
    }

    /// Uniform sample in `[-half_width, half_width)`.
    fn spread(&mut self, half_width: f64) -> f64 {
        self.rng.gen_range(-half_width..half_width)
    }
}

/// Daily, weekly and monthly change of the latest price, in percent.
///
/// Weekly compares against the eighth entry from the end and falls back to
/// the latest price (0 %) with fewer than eight entries; daily does the same
/// with a single entry.
pub fn compute_derived_variations(series: &[MarketSnapshot]) -> Result<DerivedVariations> {
    let last = series
        .last()
        .ok_or(FarmError::InsufficientData { needed: 1, got: 0 })?
        .price;

    let from_end = |n: usize| {
        series
            .len()
            .checked_sub(n)
            .map(|i| series[i].price)
            .unwrap_or(last)
    };

    Ok(DerivedVariations {
        daily: percent_change(from_end(2), last),
        weekly: percent_change(from_end(8), last),
        monthly: percent_change(series[0].price, last),
    })
}

/// Rounded to two decimals. A zero reference yields 0.
pub fn percent_change(reference: f64, current: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    round2((current - reference) / reference * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Stand-in market feed: waits `latency`, then generates a fresh history
/// and regional snapshot ending today.
pub struct SimulatedMarket {
    generator: Mutex<MarketSeriesGenerator>,
    base_price: f64,
    history_days: usize,
    region: String,
    regions: Vec<RegionSpec>,
    latency: Duration,
}

impl SimulatedMarket {
    pub fn new(
        generator: MarketSeriesGenerator,
        base_price: f64,
        history_days: usize,
        region: impl Into<String>,
        regions: Vec<RegionSpec>,
    ) -> Self {
        Self {
            generator: Mutex::new(generator),
            base_price,
            history_days,
            region: region.into(),
            regions,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Regenerates both collections. The two are independent of each other.
    pub fn generate(&self, base_date: NaiveDate) -> Result<MarketData> {
        let mut generator = self.generator.lock().map_err(|_| FarmError::MarketFetchError {
            message: "market generator lock poisoned".to_string(),
        })?;

        let regional = generator.generate_regional_prices(&self.regions);
        let history =
            generator.generate_series(base_date, self.base_price, self.history_days, &self.region);

        Ok(MarketData { history, regional })
    }
}

#[async_trait]
impl MarketSource for SimulatedMarket {
    async fn fetch(&self) -> Result<MarketData> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let today = Local::now().date_naive();
        self.generate(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flat_series(prices: &[f64]) -> Vec<MarketSnapshot> {
        let base = date(2024, 3, 1);
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| MarketSnapshot {
                date: base + ChronoDuration::days(i as i64),
                price,
                region: "GO".to_string(),
                variation: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_series_has_requested_length_and_ascending_dates() {
        let mut generator = MarketSeriesGenerator::seeded(7, VariationMode::Sampled);
        let series = generator.generate_series(date(2024, 3, 10), 285.0, 30, "Goiás");

        assert_eq!(series.len(), 30);
        assert_eq!(series.last().unwrap().date, date(2024, 3, 10));
        assert_eq!(series[0].date, date(2024, 2, 10));
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_series_values_stay_within_spread() {
        let mut generator = MarketSeriesGenerator::seeded(42, VariationMode::Sampled);
        let series = generator.generate_series(date(2024, 1, 31), 285.0, 90, "Goiás");

        for snapshot in &series {
            assert!(snapshot.price >= 275.0 && snapshot.price <= 295.0);
            assert!(snapshot.variation >= -3.0 && snapshot.variation <= 3.0);
            assert_eq!(snapshot.region, "Goiás");
        }
    }

    #[test]
    fn test_same_seed_same_series() {
        let mut a = MarketSeriesGenerator::seeded(99, VariationMode::Sampled);
        let mut b = MarketSeriesGenerator::seeded(99, VariationMode::Sampled);
        assert_eq!(
            a.generate_series(date(2024, 5, 1), 280.0, 30, "SP"),
            b.generate_series(date(2024, 5, 1), 280.0, 30, "SP")
        );
    }

    #[test]
    fn test_zero_days_is_empty() {
        let mut generator = MarketSeriesGenerator::seeded(1, VariationMode::Sampled);
        assert!(generator
            .generate_series(date(2024, 5, 1), 280.0, 0, "SP")
            .is_empty());
    }

    #[test]
    fn test_derived_mode_matches_price_deltas() {
        let mut generator = MarketSeriesGenerator::seeded(3, VariationMode::Derived);
        let series = generator.generate_series(date(2024, 5, 1), 280.0, 30, "SP");

        assert_eq!(series[0].variation, 0.0);
        for pair in series.windows(2) {
            assert_eq!(pair[1].variation, percent_change(pair[0].price, pair[1].price));
        }
    }

    #[test]
    fn test_regional_prices_follow_region_list() {
        let regions = vec![
            RegionSpec {
                name: "São Paulo".to_string(),
                base_price: 290.0,
            },
            RegionSpec {
                name: "Goiás".to_string(),
                base_price: 280.0,
            },
        ];
        let mut generator = MarketSeriesGenerator::seeded(11, VariationMode::Sampled);
        let prices = generator.generate_regional_prices(&regions);

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].region, "São Paulo");
        assert!((prices[0].price - 290.0).abs() <= 5.0);
        assert!((prices[1].price - 280.0).abs() <= 5.0);
        assert!(prices.iter().all(|p| p.variation.abs() <= 2.0));

        let mut derived = MarketSeriesGenerator::seeded(11, VariationMode::Derived);
        let prices = derived.generate_regional_prices(&regions);
        assert_eq!(prices[1].variation, percent_change(280.0, prices[1].price));
    }

    #[test]
    fn test_constant_series_has_zero_variations() {
        let series = flat_series(&[280.0; 30]);
        let v = compute_derived_variations(&series).unwrap();
        assert_eq!(v, DerivedVariations::default());
    }

    #[test]
    fn test_derived_variations() {
        let mut prices = vec![200.0; 30];
        prices[22] = 250.0; // eighth from last
        prices[28] = 400.0;
        prices[29] = 300.0;
        let v = compute_derived_variations(&flat_series(&prices)).unwrap();

        assert_eq!(v.daily, -25.0);
        assert_eq!(v.weekly, 20.0);
        assert_eq!(v.monthly, 50.0);
    }

    #[test]
    fn test_weekly_falls_back_with_short_series() {
        let v = compute_derived_variations(&flat_series(&[100.0, 101.0, 103.0])).unwrap();
        assert_eq!(v.weekly, 0.0);
        assert_eq!(v.daily, 1.98);
        assert_eq!(v.monthly, 3.0);

        let single = compute_derived_variations(&flat_series(&[100.0])).unwrap();
        assert_eq!(single, DerivedVariations::default());
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert!(matches!(
            compute_derived_variations(&[]),
            Err(FarmError::InsufficientData { got: 0, .. })
        ));
    }

    #[test]
    fn test_percent_change_rounding() {
        assert_eq!(percent_change(3.0, 4.0), 33.33);
        assert_eq!(percent_change(0.0, 4.0), 0.0);
    }

    #[tokio::test]
    async fn test_simulated_market_fetch() {
        let market = SimulatedMarket::new(
            MarketSeriesGenerator::seeded(5, VariationMode::Sampled),
            285.0,
            DEFAULT_HISTORY_DAYS,
            "Goiás",
            vec![RegionSpec {
                name: "Goiás".to_string(),
                base_price: 280.0,
            }],
        );

        let data = market.fetch().await.unwrap();
        assert_eq!(data.history.len(), 30);
        assert_eq!(data.regional.len(), 1);
        assert_eq!(data.current_price(), Some(data.history[29].price));
    }
}
