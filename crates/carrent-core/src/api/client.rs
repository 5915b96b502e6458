//! API client for communicating with the car rental marketplace REST API.
//!
//! This module provides the `ApiClient` struct for making authorized
//! requests, plus the interceptor registry that attaches the session's
//! bearer token to every outgoing request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use reqwest::{header, Client, Method, Request, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::models::{Car, CarRegistration, GpsLocation, NewRental, Notification, Rental};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct NonceResponse {
    nonce: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

// ============================================================================
// Interceptors
// ============================================================================

/// Hook run around every request sent through an [`ApiClient`].
pub trait Interceptor: Send + Sync {
    /// Inspect or amend an outgoing request before it is sent.
    fn on_request(&self, _request: &mut Request) {}

    /// Observe the status of a response before it reaches the caller.
    fn on_response(&self, _status: StatusCode) {}
}

type Registry = Mutex<Vec<(u64, Arc<dyn Interceptor>)>>;

/// Registration of an interceptor. Dropping the handle deregisters it.
#[must_use = "dropping the handle deregisters the interceptor"]
pub struct InterceptorHandle {
    id: u64,
    registry: Weak<Registry>,
}

impl InterceptorHandle {
    /// Deregister now rather than at end of scope.
    pub fn release(self) {}
}

impl Drop for InterceptorHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut entries = registry.lock().unwrap_or_else(PoisonError::into_inner);
            entries.retain(|(id, _)| *id != self.id);
            debug!(interceptor = self.id, "Interceptor deregistered");
        }
    }
}

impl std::fmt::Debug for InterceptorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorHandle").field("id", &self.id).finish()
    }
}

/// Attaches the session's bearer token and tears the session down on 401.
///
/// The token is read from the store on every request, so a login or logout
/// is reflected by the very next request without re-registering.
pub struct AuthInterceptor {
    session: Arc<SessionStore>,
}

impl AuthInterceptor {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }
}

impl Interceptor for AuthInterceptor {
    fn on_request(&self, request: &mut Request) {
        if request.headers().contains_key(header::AUTHORIZATION) {
            return;
        }
        match header::HeaderValue::from_str(&self.session.authorization()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(header::AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Session token is not a valid header value"),
        }
    }

    fn on_response(&self, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED {
            info!("Received 401, clearing session");
            if let Err(e) = self.session.clear_session() {
                warn!(error = %e, "Failed to clear persisted session");
            }
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// API client for the marketplace.
/// Clone is cheap: clones share the connection pool and the interceptor registry.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    interceptors: Arc<Registry>,
    next_id: Arc<AtomicU64>,
    /// Registration owned by this client and its clones (see [`ApiClient::authenticated`])
    owned: Option<Arc<InterceptorHandle>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.owned.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client without any interceptors
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            interceptors: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            owned: None,
        })
    }

    /// Create a client whose requests carry the session's bearer token.
    /// The auth interceptor stays registered while any clone of the client lives.
    pub fn authenticated(base_url: &str, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let mut client = Self::new(base_url)?;
        let handle = client.intercept(Arc::new(AuthInterceptor::new(session)));
        client.owned = Some(Arc::new(handle));
        Ok(client)
    }

    /// A client sharing the connection pool but with no interceptors.
    /// Used for the public login endpoints.
    pub fn anonymous(&self) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            interceptors: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            owned: None,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Register an interceptor for every clone sharing this client's registry.
    pub fn intercept(&self, interceptor: Arc<dyn Interceptor>) -> InterceptorHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.interceptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, interceptor));
        debug!(interceptor = id, "Interceptor registered");
        InterceptorHandle {
            id,
            registry: Arc::downgrade(&self.interceptors),
        }
    }

    /// Number of interceptors currently registered
    pub fn interceptor_count(&self) -> usize {
        self.interceptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn active_interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.interceptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, i)| Arc::clone(i))
            .collect()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    /// Build the request and run the outgoing interceptors over it.
    fn prepare(
        &self,
        builder: RequestBuilder,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Result<Request, ApiError> {
        let mut request = builder.build()?;
        for interceptor in interceptors {
            interceptor.on_request(&mut request);
        }
        Ok(request)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let interceptors = self.active_interceptors();
        let request = self.prepare(builder, &interceptors)?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(%method, url = %url, "Sending request");
        let response = self.client.execute(request).await?;

        let status = response.status();
        for interceptor in &interceptors {
            interceptor.on_response(status);
        }
        Self::check_response(response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().to_string();
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, segments)?).await?;
        Self::json(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, segments)?.json(body);
        let response = self.send(builder).await?;
        Self::json(response).await
    }

    /// POST without a body, returning the response for the caller to decode.
    async fn post_empty(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Response, ApiError> {
        let builder = self.request(Method::POST, segments)?.query(query);
        self.send(builder).await
    }

    // ===== Wallet Login =====

    /// Ask the server for a login challenge for `wallet_address`
    pub async fn request_nonce(&self, wallet_address: &str) -> Result<String, ApiError> {
        let response = self
            .post_empty(&["api", "auth", "nonce"], &[("walletAddress", wallet_address)])
            .await?;
        let parsed: NonceResponse = Self::json(response).await?;
        Ok(parsed.nonce)
    }

    /// Submit the signed challenge and receive a bearer token
    pub async fn verify_signature(
        &self,
        wallet_address: &str,
        signature: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .post_empty(
                &["api", "auth", "verify"],
                &[("walletAddress", wallet_address), ("signature", signature)],
            )
            .await?;
        let parsed: TokenResponse = Self::json(response).await?;
        Ok(parsed.token)
    }

    // ===== Cars =====

    /// Fetch cars currently available for rent
    pub async fn available_cars(&self) -> Result<Vec<Car>, ApiError> {
        self.get(&["api", "cars", "available"]).await
    }

    /// Fetch every listed car
    pub async fn all_cars(&self) -> Result<Vec<Car>, ApiError> {
        self.get(&["api", "cars"]).await
    }

    pub async fn car(&self, vin: &str) -> Result<Car, ApiError> {
        self.get(&["api", "cars", vin]).await
    }

    pub async fn cars_by_owner(&self, owner_address: &str) -> Result<Vec<Car>, ApiError> {
        self.get(&["api", "cars", "owner", owner_address]).await
    }

    pub async fn register_car(&self, car: &CarRegistration) -> Result<Car, ApiError> {
        info!(vin = %car.vin_number, "Registering car");
        self.post(&["api", "cars"], car).await
    }

    // ===== Rentals =====

    pub async fn create_rental(&self, rental: &NewRental) -> Result<Rental, ApiError> {
        info!(vin = %rental.vin_number, "Creating rental");
        self.post(&["api", "rentals"], rental).await
    }

    pub async fn rentals_for_renter(&self, renter_address: &str) -> Result<Vec<Rental>, ApiError> {
        self.get(&["api", "rentals", "renter", renter_address]).await
    }

    /// Active rental for a car, or None when the car is not rented
    pub async fn active_rental_for_car(&self, vin: &str) -> Result<Option<Rental>, ApiError> {
        match self.get(&["api", "rentals", "active", vin]).await {
            Ok(rental) => Ok(Some(rental)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn active_rentals(&self) -> Result<Vec<Rental>, ApiError> {
        self.get(&["api", "rentals", "active"]).await
    }

    pub async fn complete_rental(&self, rental_id: &str) -> Result<Rental, ApiError> {
        info!(rental = %rental_id, "Completing rental");
        let response = self
            .post_empty(&["api", "rentals", rental_id, "complete"], &[])
            .await?;
        Self::json(response).await
    }

    // ===== GPS =====

    pub async fn latest_location(&self, tracking_id: &str) -> Result<GpsLocation, ApiError> {
        self.get(&["api", "gps", tracking_id]).await
    }

    // ===== Notifications =====

    pub async fn notifications(&self, user: &str) -> Result<Vec<Notification>, ApiError> {
        self.get(&["api", "notifications", user]).await
    }

    pub async fn unread_notifications(&self, user: &str) -> Result<Vec<Notification>, ApiError> {
        self.get(&["api", "notifications", user, "unread"]).await
    }

    pub async fn unread_count(&self, user: &str) -> Result<u64, ApiError> {
        self.get(&["api", "notifications", user, "unread", "count"]).await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ApiError> {
        self.post_empty(&["api", "notifications", notification_id, "read"], &[])
            .await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user: &str) -> Result<(), ApiError> {
        self.post_empty(&["api", "notifications", user, "read", "all"], &[])
            .await?;
        Ok(())
    }
}
