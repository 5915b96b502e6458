use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::PollHandle;
use crate::api::ApiClient;
use crate::models::GpsLocation;

/// Latest GPS fix per tracking id for the renter's active rentals.
///
/// Fetch failures are logged and skipped: a stale or missing fix must never
/// take down the rest of the rentals view.
#[derive(Debug, Clone)]
pub struct GpsTracker {
    api: ApiClient,
    fixes: Arc<RwLock<HashMap<String, GpsLocation>>>,
}

impl GpsTracker {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            fixes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch the latest fix for every id concurrently.
    /// Returns how many fixes were updated.
    pub async fn refresh(&self, tracking_ids: &[String]) -> usize {
        let fetches = tracking_ids.iter().map(|id| {
            let api = self.api.clone();
            async move { (id, api.latest_location(id).await) }
        });

        let mut updated = 0;
        for (id, result) in join_all(fetches).await {
            match result {
                Ok(fix) => {
                    self.fixes
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(id.clone(), fix);
                    updated += 1;
                }
                Err(e) => warn!(tracking_id = %id, error = %e, "Failed to fetch GPS location"),
            }
        }
        debug!(updated, requested = tracking_ids.len(), "GPS refresh complete");
        updated
    }

    pub fn latest(&self, tracking_id: &str) -> Option<GpsLocation> {
        self.fixes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tracking_id)
            .cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, GpsLocation> {
        self.fixes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Refresh `tracking_ids` now and every `period` until the handle is dropped.
    pub fn watch(&self, tracking_ids: Vec<String>, period: Duration) -> PollHandle {
        let tracker = self.clone();
        let ids = Arc::new(tracking_ids);
        PollHandle::spawn(period, move || {
            let tracker = tracker.clone();
            let ids = Arc::clone(&ids);
            async move {
                tracker.refresh(&ids).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fix(lat: f64) -> serde_json::Value {
        serde_json::json!({
            "trackingId": "gps-1",
            "latitude": lat,
            "longitude": -73.9,
            "timestamp": "2025-06-01T09:00:00"
        })
    }

    #[tokio::test]
    async fn test_refresh_swallows_failures() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/gps/gps-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fix(40.7)))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/gps/gps-2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let api = ApiClient::new(&mock_server.uri()).expect("client creation");
        let tracker = GpsTracker::new(api);

        let ids = vec!["gps-1".to_string(), "gps-2".to_string()];
        assert_eq!(tracker.refresh(&ids).await, 1);
        assert_eq!(tracker.latest("gps-1").map(|f| f.latitude), Some(40.7));
        assert!(tracker.latest("gps-2").is_none());
        assert_eq!(tracker.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_later_fix_overwrites_earlier() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/gps/gps-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fix(1.0)))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/gps/gps-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fix(2.0)))
            .mount(&mock_server)
            .await;

        let api = ApiClient::new(&mock_server.uri()).expect("client creation");
        let tracker = GpsTracker::new(api);
        let ids = vec!["gps-1".to_string()];

        tracker.refresh(&ids).await;
        assert_eq!(tracker.latest("gps-1").map(|f| f.latitude), Some(1.0));
        tracker.refresh(&ids).await;
        assert_eq!(tracker.latest("gps-1").map(|f| f.latitude), Some(2.0));
    }

    #[tokio::test]
    async fn test_watch_fetches_immediately() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/gps/gps-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fix(5.0)))
            .mount(&mock_server)
            .await;

        let api = ApiClient::new(&mock_server.uri()).expect("client creation");
        let tracker = GpsTracker::new(api);
        let handle = tracker.watch(vec!["gps-1".to_string()], Duration::from_secs(3600));

        for _ in 0..50 {
            if tracker.latest("gps-1").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(tracker.latest("gps-1").map(|f| f.latitude), Some(5.0));
        handle.stop();
    }
}
