use crate::core::geo;
use crate::domain::model::{Coordinate, Facility, FacilityInput};
use crate::domain::ports::LocationProvider;
use crate::utils::error::{FarmError, Result};
use crate::utils::validation::{parse_number, validate_non_empty_string, validate_range};
use serde::Serialize;
use std::time::Duration;

/// Goiânia city centre; used when no device location is available.
pub const DEFAULT_REFERENCE: Coordinate = Coordinate {
    latitude: -16.6869,
    longitude: -49.2648,
};

pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FixSource {
    Device,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub source: FixSource,
}

impl LocationFix {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, FixSource::Fallback { .. })
    }

    /// Message shown to the user when the fallback was used.
    pub fn advisory(&self) -> Option<String> {
        match &self.source {
            FixSource::Device => None,
            FixSource::Fallback { reason } => Some(format!(
                "Could not get your location ({}); distances are measured from the default point ({:.4}, {:.4})",
                reason, self.coordinate.latitude, self.coordinate.longitude
            )),
        }
    }
}

/// Asks the provider for a fix. Denial, errors, out-of-range fixes and
/// timeouts all resolve to `fallback`.
pub async fn locate_reference<L: LocationProvider>(
    provider: &L,
    timeout: Duration,
    fallback: Coordinate,
) -> LocationFix {
    let reason = match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(coordinate)) if coordinate.is_valid() => {
            tracing::debug!(
                "📍 Device location: {:.4}, {:.4}",
                coordinate.latitude,
                coordinate.longitude
            );
            return LocationFix {
                coordinate,
                source: FixSource::Device,
            };
        }
        Ok(Ok(coordinate)) => format!(
            "location service returned an invalid fix ({}, {})",
            coordinate.latitude, coordinate.longitude
        ),
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("no fix after {}s", timeout.as_secs()),
    };

    tracing::warn!("⚠️ Falling back to default reference point: {}", reason);
    LocationFix {
        coordinate: fallback,
        source: FixSource::Fallback { reason },
    }
}

/// Location that is already known, e.g. passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinate> {
        Ok(self.0)
    }
}

/// Platform without any location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocationService;

impl LocationProvider for NoLocationService {
    async fn current_position(&self) -> Result<Coordinate> {
        Err(FarmError::LocationUnavailable {
            reason: "location service not supported on this platform".to_string(),
        })
    }
}

pub fn seed_facilities() -> Vec<Facility> {
    let seed = |id: &str, name: &str, lat: f64, lng: f64, price: f64, capacity: &str, rating| {
        Facility {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(lat, lng),
            distance_km: 0.0,
            travel_minutes: 0,
            price_per_unit: price,
            capacity: capacity.to_string(),
            rating,
        }
    };

    vec![
        seed(
            "1",
            "Frigorífico Boi Gordo",
            -16.7150,
            -49.2360,
            285.50,
            "500 cabeças/dia",
            4.5,
        ),
        seed(
            "2",
            "Frigorífico Central",
            -16.6527,
            -49.2288,
            282.00,
            "800 cabeças/dia",
            4.2,
        ),
        seed(
            "3",
            "Frigorífico Vale Verde",
            -16.7350,
            -49.3050,
            288.00,
            "350 cabeças/dia",
            4.8,
        ),
    ]
}

/// The facility list together with the reference point it is measured from.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityBoard {
    reference: Coordinate,
    facilities: Vec<Facility>,
}

impl FacilityBoard {
    pub fn new(reference: Coordinate, facilities: Vec<Facility>) -> Self {
        let facilities = geo::recompute_all(reference, &facilities);
        Self {
            reference,
            facilities,
        }
    }

    pub fn with_seeds(reference: Coordinate) -> Self {
        Self::new(reference, seed_facilities())
    }

    pub fn reference(&self) -> Coordinate {
        self.reference
    }

    /// Insertion order.
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn recenter(&mut self, reference: Coordinate) {
        tracing::debug!(
            "Recentering {} facilities on {:.4}, {:.4}",
            self.facilities.len(),
            reference.latitude,
            reference.longitude
        );
        self.reference = reference;
        self.facilities = geo::recompute_all(reference, &self.facilities);
    }

    pub fn apply_fix(&mut self, fix: &LocationFix) {
        self.recenter(fix.coordinate);
    }

    /// Validates form input and appends the new facility. Duplicates are allowed.
    pub fn add_facility(&mut self, input: &FacilityInput) -> Result<&Facility> {
        let mut facility = parse_facility_input(input)?;
        geo::update_derived(self.reference, &mut facility);

        tracing::info!(
            "➕ Added facility '{}' at {:.1} km",
            facility.name,
            facility.distance_km
        );
        self.facilities.push(facility);

        let index = self.facilities.len() - 1;
        Ok(&self.facilities[index])
    }

    /// Nearest first.
    pub fn ranked(&self) -> Vec<Facility> {
        let mut ranked = self.facilities.clone();
        geo::sort_by_distance(&mut ranked);
        ranked
    }

    pub fn nearest(&self) -> Option<&Facility> {
        geo::nearest(&self.facilities)
    }

    pub fn cheapest(&self) -> Option<&Facility> {
        geo::cheapest(&self.facilities)
    }
}

fn parse_facility_input(input: &FacilityInput) -> Result<Facility> {
    let required = |field: &str, value: &str| {
        validate_non_empty_string(field, value).map_err(|_| FarmError::InvalidFieldError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Value is required".to_string(),
        })
    };
    required("name", &input.name)?;
    required("capacity", &input.capacity)?;

    let latitude = parse_number("latitude", &input.latitude)?;
    let longitude = parse_number("longitude", &input.longitude)?;
    let price_per_unit = parse_number("price_per_unit", &input.price_per_unit)?;
    let rating = match input.rating.as_deref().map(str::trim) {
        None | Some("") => 0.0,
        Some(raw) => parse_number("rating", raw)?,
    };

    in_range("latitude", latitude, -90.0, 90.0)?;
    in_range("longitude", longitude, -180.0, 180.0)?;
    in_range("rating", rating, 0.0, 5.0)?;
    if price_per_unit < 0.0 {
        return Err(FarmError::InvalidFieldError {
            field: "price_per_unit".to_string(),
            value: input.price_per_unit.clone(),
            reason: "Price cannot be negative".to_string(),
        });
    }

    Ok(Facility {
        id: uuid::Uuid::new_v4().to_string(),
        name: input.name.trim().to_string(),
        coordinate: Coordinate::new(latitude, longitude),
        distance_km: 0.0,
        travel_minutes: 0,
        price_per_unit,
        capacity: input.capacity.trim().to_string(),
        rating,
    })
}

fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    validate_range(field, value, min, max).map_err(|e| match e {
        FarmError::InvalidConfigValueError {
            field,
            value,
            reason,
        } => FarmError::InvalidFieldError {
            field,
            value,
            reason,
        },
        other => other,
    })
}
