use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{number_or_string, Car};

/// Car details embedded in a rental record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: String,
    pub vin_number: String,
    #[serde(default)]
    pub renter_address: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(deserialize_with = "number_or_string")]
    pub total_amount: f64,
    #[serde(rename = "isActive", alias = "active", default)]
    pub is_active: bool,
    #[serde(default)]
    pub gps_tracking_id: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub car: Option<CarSummary>,
}

impl Rental {
    /// Title shown for the rental: the car if known, otherwise its VIN
    pub fn title(&self) -> String {
        match &self.car {
            Some(car) => format!("{} {} ({})", car.make, car.model, car.year),
            None => format!("VIN {}", self.vin_number),
        }
    }

    /// Tracking id to poll, only while the rental is active
    pub fn active_tracking_id(&self) -> Option<&str> {
        if self.is_active {
            self.gps_tracking_id.as_deref().filter(|id| !id.is_empty())
        } else {
            None
        }
    }
}

/// Body of `POST /api/rentals`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRental {
    pub vin_number: String,
    pub renter_address: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_amount: f64,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

impl NewRental {
    /// Rent `car` for `days` starting at `now`. Returns None for zero days.
    pub fn for_days(car: &Car, renter: &str, days: u32, now: NaiveDateTime) -> Option<Self> {
        if days == 0 {
            return None;
        }
        Some(Self {
            vin_number: car.vin_number.clone(),
            renter_address: renter.to_string(),
            start_time: now,
            end_time: now + Duration::days(i64::from(days)),
            total_amount: car.rental_price * f64::from(days),
            is_active: true,
        })
    }
}

/// Split rentals into (active, past), preserving order.
pub fn partition_by_activity(rentals: Vec<Rental>) -> (Vec<Rental>, Vec<Rental>) {
    rentals.into_iter().partition(|r| r.is_active)
}

/// Tracking ids of the active rentals that report GPS fixes.
pub fn tracked_ids(rentals: &[Rental]) -> Vec<String> {
    let mut ids: Vec<String> = rentals
        .iter()
        .filter_map(|r| r.active_tracking_id().map(str::to_string))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
