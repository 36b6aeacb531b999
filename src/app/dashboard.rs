use crate::config::FarmConfig;
use crate::core::facilities::{locate_reference, FacilityBoard, LocationFix};
use crate::core::format::{format_currency, format_distance, format_minutes, format_percent};
use crate::core::market::{MarketSeriesGenerator, SimulatedMarket};
use crate::core::{
    ConfigProvider, DerivedVariations, Facility, LocationProvider, MarketData, MarketSource,
};
use crate::utils::error::Result;
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

/// Everything the logistics and market pages show, in one value.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub location: LocationFix,
    /// Nearest first.
    pub ranked: Vec<Facility>,
    pub nearest: Option<Facility>,
    pub best_price: Option<Facility>,
    pub market: MarketData,
    pub variations: Option<DerivedVariations>,
}

pub fn simulated_market(config: &FarmConfig) -> SimulatedMarket {
    let generator = match config.market.seed {
        Some(seed) => MarketSeriesGenerator::seeded(seed, config.market.variation_mode),
        None => MarketSeriesGenerator::from_entropy(config.market.variation_mode),
    };

    SimulatedMarket::new(
        generator,
        config.base_price(),
        config.history_days(),
        config.market.series_region.clone(),
        config.regions().to_vec(),
    )
    .with_latency(Duration::from_millis(config.market.simulated_latency_ms))
}

pub struct DashboardEngine<'a, S: MarketSource> {
    config: &'a FarmConfig,
    market: S,
}

impl<'a, S: MarketSource> DashboardEngine<'a, S> {
    pub fn new(config: &'a FarmConfig, market: S) -> Self {
        Self { config, market }
    }

    pub async fn run<L: LocationProvider>(&self, location: &L) -> Result<DashboardReport> {
        tracing::info!("Resolving reference location...");
        let fix = locate_reference(
            location,
            Duration::from_secs(self.config.location_timeout_seconds()),
            self.config.fallback_reference(),
        )
        .await;

        let board = FacilityBoard::new(fix.coordinate, self.config.seed_facilities());
        tracing::info!("Ranked {} facilities", board.facilities().len());

        tracing::info!("Fetching market data...");
        let market = self.market.fetch().await?;
        let variations = crate::core::market::compute_derived_variations(&market.history).ok();
        tracing::info!(
            "Market history: {} days, {} regions",
            market.history.len(),
            market.regional.len()
        );

        Ok(DashboardReport {
            ranked: board.ranked(),
            nearest: board.nearest().cloned(),
            best_price: board.cheapest().cloned(),
            location: fix,
            market,
            variations,
        })
    }
}

pub fn render_text(report: &DashboardReport, currency: &str) -> String {
    let mut out = String::new();

    let reference = report.location.coordinate;
    let _ = writeln!(
        out,
        "📍 Reference: {:.4}, {:.4}",
        reference.latitude, reference.longitude
    );
    if let Some(advisory) = report.location.advisory() {
        let _ = writeln!(out, "⚠️  {}", advisory);
    }

    let _ = writeln!(out, "\nFrigoríficos (nearest first)");
    for facility in &report.ranked {
        let _ = writeln!(
            out,
            "  {:<28} {:>9} {:>7}  {}  ★{:.1}  {}",
            facility.name,
            format_distance(facility.distance_km),
            format_minutes(facility.travel_minutes),
            format_currency(facility.price_per_unit, currency),
            facility.rating,
            facility.capacity
        );
    }
    if let Some(nearest) = &report.nearest {
        let _ = writeln!(
            out,
            "  Mais próximo: {} ({})",
            nearest.name,
            format_distance(nearest.distance_km)
        );
    }
    if let Some(best) = &report.best_price {
        let _ = writeln!(
            out,
            "  Melhor preço: {} ({})",
            best.name,
            format_currency(best.price_per_unit, currency)
        );
    }

    if let (Some(first), Some(last)) = (report.market.history.first(), report.market.history.last())
    {
        let _ = writeln!(
            out,
            "\nArroba do boi ({}), {} to {}",
            last.region, first.date, last.date
        );
        let _ = writeln!(
            out,
            "  Current: {} ({})",
            format_currency(last.price, currency),
            format_percent(last.variation)
        );
    }
    if let Some(v) = &report.variations {
        let _ = writeln!(
            out,
            "  Day {}  Week {}  Month {}",
            format_percent(v.daily),
            format_percent(v.weekly),
            format_percent(v.monthly)
        );
    }

    let _ = writeln!(out, "\nRegional prices");
    for price in &report.market.regional {
        let _ = writeln!(
            out,
            "  {:<20} {}  {}",
            price.region,
            format_currency(price.price, currency),
            format_percent(price.variation)
        );
    }

    out
}
