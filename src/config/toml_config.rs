use crate::core::facilities::{seed_facilities, DEFAULT_LOCATION_TIMEOUT_SECS, DEFAULT_REFERENCE};
use crate::core::format::DEFAULT_CURRENCY_PREFIX;
use crate::core::market::{VariationMode, DEFAULT_HISTORY_DAYS};
use crate::core::refresh::{RefreshPolicy, DEFAULT_REFRESH_INTERVAL_SECS};
use crate::core::ConfigProvider;
use crate::domain::model::{Coordinate, Facility, RegionSpec};
use crate::utils::error::{FarmError, Result};
use crate::utils::validation::{
    validate_coordinate, validate_non_empty_string, validate_positive_number, validate_range,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    pub location: LocationConfig,
    pub market: MarketConfig,
    pub admin: AdminConfig,
    pub display: DisplayConfig,
    pub facilities: Vec<FacilitySeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
    pub timeout_seconds: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fallback_latitude: DEFAULT_REFERENCE.latitude,
            fallback_longitude: DEFAULT_REFERENCE.longitude,
            timeout_seconds: DEFAULT_LOCATION_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub base_price: f64,
    pub history_days: usize,
    pub series_region: String,
    pub regions: Vec<RegionSpec>,
    pub refresh_interval_seconds: u64,
    pub simulated_latency_ms: u64,
    pub variation_mode: VariationMode,
    pub refresh_policy: RefreshPolicy,
    /// Fixed RNG seed, for reproducible output.
    pub seed: Option<u64>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let region = |name: &str, base_price: f64| RegionSpec {
            name: name.to_string(),
            base_price,
        };
        Self {
            base_price: 285.0,
            history_days: DEFAULT_HISTORY_DAYS,
            series_region: "Goiás".to_string(),
            regions: vec![
                region("São Paulo", 292.0),
                region("Goiás", 283.0),
                region("Mato Grosso", 276.0),
                region("Mato Grosso do Sul", 280.0),
                region("Minas Gerais", 286.0),
            ],
            refresh_interval_seconds: DEFAULT_REFRESH_INTERVAL_SECS,
            simulated_latency_ms: 1000,
            variation_mode: VariationMode::default(),
            refresh_policy: RefreshPolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub allowlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub currency_prefix: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_prefix: DEFAULT_CURRENCY_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitySeed {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_per_unit: f64,
    pub capacity: String,
    #[serde(default)]
    pub rating: f64,
}

impl From<&FacilitySeed> for Facility {
    fn from(seed: &FacilitySeed) -> Self {
        Facility {
            id: seed.id.clone(),
            name: seed.name.clone(),
            coordinate: Coordinate::new(seed.latitude, seed.longitude),
            distance_km: 0.0,
            travel_minutes: 0,
            price_per_unit: seed.price_per_unit,
            capacity: seed.capacity.clone(),
            rating: seed.rating,
        }
    }
}

impl FarmConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FarmError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // Environment variable substitution
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FarmError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references (e.g. `${ADMIN_EMAIL}`) with their values.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FarmError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Checks ranges and required values.
    pub fn validate_config(&self) -> Result<()> {
        validate_coordinate("location.fallback", self.fallback_reference())?;
        validate_positive_number("location.timeout_seconds", self.location.timeout_seconds, 1)?;

        validate_range("market.base_price", self.market.base_price, 0.0, f64::MAX)?;
        validate_positive_number("market.history_days", self.market.history_days as u64, 1)?;
        validate_positive_number(
            "market.refresh_interval_seconds",
            self.market.refresh_interval_seconds,
            1,
        )?;
        validate_non_empty_string("market.series_region", &self.market.series_region)?;
        for region in &self.market.regions {
            validate_non_empty_string("market.regions.name", &region.name)?;
            validate_range("market.regions.base_price", region.base_price, 0.0, f64::MAX)?;
        }

        for facility in &self.facilities {
            validate_non_empty_string("facilities.id", &facility.id)?;
            validate_non_empty_string("facilities.name", &facility.name)?;
            validate_coordinate(
                &format!("facilities.{}", facility.id),
                Coordinate::new(facility.latitude, facility.longitude),
            )?;
            validate_range("facilities.price_per_unit", facility.price_per_unit, 0.0, f64::MAX)?;
            validate_range("facilities.rating", facility.rating, 0.0, 5.0)?;
        }

        for email in &self.admin.allowlist {
            if !email.contains('@') {
                return Err(FarmError::InvalidConfigValueError {
                    field: "admin.allowlist".to_string(),
                    value: email.clone(),
                    reason: "Not an email address".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Falls back to the three built-in seeds when no `[[facilities]]` are configured.
    pub fn seed_facilities(&self) -> Vec<Facility> {
        if self.facilities.is_empty() {
            seed_facilities()
        } else {
            self.facilities.iter().map(Facility::from).collect()
        }
    }

    pub fn admin_allowlist(&self) -> &[String] {
        &self.admin.allowlist
    }
}

impl ConfigProvider for FarmConfig {
    fn fallback_reference(&self) -> Coordinate {
        Coordinate::new(
            self.location.fallback_latitude,
            self.location.fallback_longitude,
        )
    }

    fn location_timeout_seconds(&self) -> u64 {
        self.location.timeout_seconds
    }

    fn base_price(&self) -> f64 {
        self.market.base_price
    }

    fn history_days(&self) -> usize {
        self.market.history_days
    }

    fn regions(&self) -> &[RegionSpec] {
        &self.market.regions
    }

    fn refresh_interval_seconds(&self) -> u64 {
        self.market.refresh_interval_seconds
    }

    fn currency_prefix(&self) -> &str {
        &self.display.currency_prefix
    }
}

impl Validate for FarmConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FarmConfig::from_toml_str("").unwrap();

        assert_eq!(config.fallback_reference(), DEFAULT_REFERENCE);
        assert_eq!(config.location_timeout_seconds(), 10);
        assert_eq!(config.history_days(), 30);
        assert_eq!(config.refresh_interval_seconds(), 300);
        assert_eq!(config.regions().len(), 5);
        assert_eq!(config.market.variation_mode, VariationMode::Sampled);
        assert_eq!(config.market.refresh_policy, RefreshPolicy::LastWriteWins);
        assert_eq!(config.seed_facilities().len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[location]
fallback_latitude = -15.7939
fallback_longitude = -47.8828
timeout_seconds = 5

[market]
base_price = 300.0
history_days = 14
series_region = "Mato Grosso"
variation_mode = "derived"
refresh_policy = "single_flight"
seed = 7

[[market.regions]]
name = "Mato Grosso"
base_price = 295.0

[admin]
allowlist = ["admin@fazenda.com.br"]

[display]
currency_prefix = "US$"

[[facilities]]
id = "mt-1"
name = "Frigorífico Cuiabá"
latitude = -15.6014
longitude = -56.0979
price_per_unit = 290.0
capacity = "600 cabeças/dia"
"#;

        let config = FarmConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.fallback_reference(), Coordinate::new(-15.7939, -47.8828));
        assert_eq!(config.history_days(), 14);
        assert_eq!(config.market.variation_mode, VariationMode::Derived);
        assert_eq!(config.market.refresh_policy, RefreshPolicy::SingleFlight);
        assert_eq!(config.market.seed, Some(7));
        assert_eq!(config.regions().len(), 1);
        assert_eq!(config.currency_prefix(), "US$");
        assert_eq!(config.admin_allowlist().to_vec(), vec!["admin@fazenda.com.br"]);

        let facilities = config.seed_facilities();
        assert_eq!(facilities.len(), 1);
        assert_eq!(facilities[0].rating, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("AGRODESK_TEST_ADMIN", "chefe@fazenda.com.br");

        let toml_content = r#"
[admin]
allowlist = ["${AGRODESK_TEST_ADMIN}"]
"#;

        let config = FarmConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.admin.allowlist, vec!["chefe@fazenda.com.br"]);

        std::env::remove_var("AGRODESK_TEST_ADMIN");
    }

    #[test]
    fn test_config_validation() {
        let bad_reference = FarmConfig::from_toml_str(
            r#"
[location]
fallback_latitude = 120.0
"#,
        )
        .unwrap();
        assert!(bad_reference.validate().is_err());

        let zero_days = FarmConfig::from_toml_str(
            r#"
[market]
history_days = 0
"#,
        )
        .unwrap();
        assert!(zero_days.validate().is_err());

        let bad_admin = FarmConfig::from_toml_str(
            r#"
[admin]
allowlist = ["not-an-email"]
"#,
        )
        .unwrap();
        assert!(bad_admin.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_nan() {
        let nan_price = FarmConfig::from_toml_str("[market]\nbase_price = nan\n").unwrap();
        assert!(nan_price.validate().is_err());

        let nan_region = FarmConfig::from_toml_str(
            r#"
[[market.regions]]
name = "Goiás"
base_price = nan
"#,
        )
        .unwrap();
        assert!(nan_region.validate().is_err());

        let nan_facility = FarmConfig::from_toml_str(
            r#"
[[facilities]]
id = "x"
name = "Frigorífico Teste"
latitude = nan
longitude = -49.2
price_per_unit = 280.0
capacity = "100 cabeças/dia"
"#,
        )
        .unwrap();
        assert!(nan_facility.validate().is_err());

        let nan_fallback =
            FarmConfig::from_toml_str("[location]\nfallback_longitude = nan\n").unwrap();
        assert!(nan_fallback.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = FarmConfig::from_toml_str("[market\nbase_price = ").unwrap_err();
        assert!(matches!(err, FarmError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[display]\ncurrency_prefix = \"R$\"\n")
            .unwrap();

        let config = FarmConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.currency_prefix(), "R$");
    }
}
