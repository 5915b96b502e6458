//! Data models for marketplace entities.
//!
//! - `Car`, `CarForm`, `CarRegistration`: listings and the registration form
//! - `Rental`, `NewRental`: rental records and rental creation
//! - `GpsLocation`: latest GPS fix for a tracked rental
//! - `Notification`, `NotificationType`: user notifications

pub mod car;
pub mod gps;
pub mod notification;
pub mod rental;

pub use car::{filter_cars, Car, CarForm, CarRegistration, FormError};
pub use gps::GpsLocation;
pub use notification::{Notification, NotificationType};
pub use rental::{partition_by_activity, tracked_ids, CarSummary, NewRental, Rental};

use serde::{Deserialize, Deserializer};

/// Accept an amount sent either as a JSON number or as a decimal string.
/// The web client posts prices as strings while the server answers with numbers.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
