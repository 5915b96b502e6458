use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::maps_url;

/// Latest GPS fix reported for a tracked rental.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct GpsLocation {
    #[serde(default)]
    pub tracking_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: NaiveDateTime,
}

impl GpsLocation {
    pub fn maps_url(&self) -> String {
        maps_url(self.latitude, self.longitude)
    }
}
