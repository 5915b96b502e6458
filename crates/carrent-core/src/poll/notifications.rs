use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::warn;

use super::PollHandle;
use crate::api::{ApiClient, ApiError};
use crate::models::Notification;

/// Notifications and unread count for one account, as last fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub notifications: Vec<Notification>,
    pub unread: u64,
}

/// Background-refreshed notification list.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    api: ApiClient,
    state: Arc<RwLock<FeedState>>,
}

impl NotificationFeed {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(FeedState::default())),
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch notifications and unread count. Errors are logged, never returned;
    /// the previous state is kept on failure.
    pub async fn refresh(&self, account: &str) -> bool {
        match self.fetch(account).await {
            Ok(fresh) => {
                *self.state.write().unwrap_or_else(PoisonError::into_inner) = fresh;
                true
            }
            Err(e) => {
                warn!(account = %account, error = %e, "Failed to fetch notifications");
                false
            }
        }
    }

    async fn fetch(&self, account: &str) -> Result<FeedState, ApiError> {
        let (notifications, unread) = futures::try_join!(
            self.api.notifications(account),
            self.api.unread_count(account)
        )?;
        Ok(FeedState {
            notifications,
            unread,
        })
    }

    pub async fn mark_read(&self, account: &str, notification_id: &str) -> Result<(), ApiError> {
        self.api.mark_notification_read(notification_id).await?;
        self.refresh(account).await;
        Ok(())
    }

    pub async fn mark_all_read(&self, account: &str) -> Result<(), ApiError> {
        self.api.mark_all_notifications_read(account).await?;
        self.refresh(account).await;
        Ok(())
    }

    /// Refresh for `account` now and every `period` until the handle is dropped.
    pub fn watch(&self, account: &str, period: Duration) -> PollHandle {
        let feed = self.clone();
        let account: Arc<str> = Arc::from(account);
        PollHandle::spawn(period, move || {
            let feed = feed.clone();
            let account = Arc::clone(&account);
            async move {
                feed.refresh(&account).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifications() -> serde_json::Value {
        serde_json::json!([
            {
                "id": "n1",
                "userId": "0xabc",
                "title": "Payment received",
                "message": "0.5 ETH",
                "type": "PAYMENT_RECEIVED",
                "timestamp": "2025-06-01T09:00:00",
                "read": false
            }
        ])
    }

    #[tokio::test]
    async fn test_refresh_and_mark_read() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/0xabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(notifications()))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/0xabc/unread/count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(1))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/n1/read"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let api = ApiClient::new(&mock_server.uri()).expect("client creation");
        let feed = NotificationFeed::new(api);

        assert!(feed.refresh("0xabc").await);
        let state = feed.state();
        assert_eq!(state.unread, 1);
        assert_eq!(state.notifications.len(), 1);

        feed.mark_read("0xabc", "n1").await.expect("mark read");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_state() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/0xabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(notifications()))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/0xabc/unread/count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(1))
            .mount(&mock_server)
            .await;

        let api = ApiClient::new(&mock_server.uri()).expect("client creation");
        let feed = NotificationFeed::new(api);

        assert!(feed.refresh("0xabc").await);
        // Second list request has no mock left and gets a 404
        assert!(!feed.refresh("0xabc").await);
        assert_eq!(feed.state().unread, 1);
    }

    #[tokio::test]
    async fn test_mark_read_surfaces_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/n9/read"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let api = ApiClient::new(&mock_server.uri()).expect("client creation");
        let feed = NotificationFeed::new(api);
        assert!(matches!(
            feed.mark_read("0xabc", "n9").await,
            Err(ApiError::ServerError(_))
        ));
    }
}
