use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// A slaughterhouse (frigorífico) that livestock can be delivered to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    /// Derived from the current reference coordinate.
    pub distance_km: f64,
    /// Derived from `distance_km`.
    pub travel_minutes: u32,
    pub price_per_unit: f64,
    pub capacity: String,
    /// 0 to 5, 0 when unrated.
    pub rating: f64,
}

/// Raw text as submitted from the "new facility" form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityInput {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub price_per_unit: String,
    pub capacity: String,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub date: NaiveDate,
    pub price: f64,
    pub region: String,
    /// Percent.
    pub variation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalPrice {
    pub region: String,
    pub price: f64,
    pub variation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub base_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedVariations {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
}

/// One complete market refresh: history plus regional snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub history: Vec<MarketSnapshot>,
    pub regional: Vec<RegionalPrice>,
}

impl MarketData {
    pub fn current_price(&self) -> Option<f64> {
        self.history.last().map(|s| s.price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Producer,
    Manager,
    Admin,
}

/// A row of the remote `users` table as seen by the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Row-level change notification from the hosted backend's realtime feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum ChangeEvent {
    #[serde(rename = "INSERT")]
    Inserted { new: UserRecord },
    #[serde(rename = "UPDATE")]
    Updated { new: UserRecord },
    #[serde(rename = "DELETE")]
    Deleted {
        id: String,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
}

impl ChangeEvent {
    pub fn record_id(&self) -> &str {
        match self {
            ChangeEvent::Inserted { new } | ChangeEvent::Updated { new } => &new.id,
            ChangeEvent::Deleted { id, .. } => id,
        }
    }
}
