use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::number_or_string;

/// First model year accepted by the registration form
const EARLIEST_MODEL_YEAR: i32 = 1886;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(default)]
    pub id: Option<String>,
    pub vin_number: String,
    #[serde(default)]
    pub owner_address: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(rename = "isAvailable", alias = "available", default)]
    pub is_available: bool,
    #[serde(deserialize_with = "number_or_string")]
    pub rental_price: f64,
    #[serde(default)]
    pub ipfs_document_hash: Option<String>,
    #[serde(default)]
    pub gps_tracking_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Car {
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.year)
    }

    /// Case-insensitive substring match on "make model". An empty term matches.
    pub fn matches(&self, term: &str) -> bool {
        format!("{} {}", self.make, self.model)
            .to_lowercase()
            .contains(&term.to_lowercase())
    }
}

/// Cars whose make and model match the search `term`
pub fn filter_cars<'a>(cars: &'a [Car], term: &str) -> Vec<&'a Car> {
    cars.iter().filter(|car| car.matches(term)).collect()
}

/// Body of `POST /api/cars`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRegistration {
    pub vin_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub rental_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub owner_address: String,
    #[serde(rename = "isAvailable")]
    pub is_available: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Year must be a number between {min} and {max}")]
    InvalidYear { min: i32, max: i32 },

    #[error("Rental price must be a positive amount of ETH")]
    InvalidPrice,
}

/// Raw registration form input, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct CarForm {
    pub vin_number: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub rental_price: String,
    pub image_url: String,
}

impl CarForm {
    /// Validate the form and build the registration for `owner`.
    pub fn validate(&self, owner: &str) -> Result<CarRegistration, FormError> {
        let vin_number = required(&self.vin_number, "VIN")?;
        let make = required(&self.make, "Make")?;
        let model = required(&self.model, "Model")?;

        let max = Utc::now().year() + 1;
        let year: i32 = self
            .year
            .trim()
            .parse()
            .map_err(|_| FormError::InvalidYear { min: EARLIEST_MODEL_YEAR, max })?;
        if !(EARLIEST_MODEL_YEAR..=max).contains(&year) {
            return Err(FormError::InvalidYear { min: EARLIEST_MODEL_YEAR, max });
        }

        let rental_price: f64 = self
            .rental_price
            .trim()
            .parse()
            .map_err(|_| FormError::InvalidPrice)?;
        if !rental_price.is_finite() || rental_price <= 0.0 {
            return Err(FormError::InvalidPrice);
        }

        let image_url = Some(self.image_url.trim().to_string()).filter(|s| !s.is_empty());

        Ok(CarRegistration {
            vin_number,
            make,
            model,
            year,
            rental_price,
            image_url,
            owner_address: owner.to_string(),
            is_available: true,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::Missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}
