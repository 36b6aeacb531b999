use crate::domain::model::Coordinate;
use crate::utils::error::{FarmError, Result};
use std::cmp::Ordering;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(FarmError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FarmError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Values that do not compare with the bounds (NaN) are out of range.
pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    let above_min = matches!(value.partial_cmp(&min), Some(Ordering::Greater | Ordering::Equal));
    let below_max = matches!(value.partial_cmp(&max), Some(Ordering::Less | Ordering::Equal));
    if !(above_min && below_max) {
        return Err(FarmError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_coordinate(field_name: &str, coordinate: Coordinate) -> Result<()> {
    validate_range(
        &format!("{}.latitude", field_name),
        coordinate.latitude,
        -90.0,
        90.0,
    )?;
    validate_range(
        &format!("{}.longitude", field_name),
        coordinate.longitude,
        -180.0,
        180.0,
    )
}

/// Parses user-typed numeric text. Accepts a decimal comma ("285,50").
pub fn parse_number(field_name: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FarmError::InvalidFieldError {
            field: field_name.to_string(),
            value: raw.to_string(),
            reason: "Value is required".to_string(),
        });
    }

    let normalized = trimmed.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(FarmError::InvalidFieldError {
            field: field_name.to_string(),
            value: raw.to_string(),
            reason: "Value must be a finite number".to_string(),
        }),
        Err(e) => Err(FarmError::InvalidFieldError {
            field: field_name.to_string(),
            value: raw.to_string(),
            reason: format!("Not a number: {}", e),
        }),
    }
}
