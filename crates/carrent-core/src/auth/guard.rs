use std::sync::Arc;

use tracing::debug;

use super::SessionStore;

/// Views of the marketplace client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Cars,
    CarDetails(String),
    RegisterCar,
    MyRentals,
}

impl Route {
    /// Views that require a logged-in session
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::RegisterCar | Route::MyRentals)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Cars => "/cars".to_string(),
            Route::CarDetails(vin) => format!("/cars/{}", vin),
            Route::RegisterCar => "/register-car".to_string(),
            Route::MyRentals => "/my-rentals".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

/// Gate for protected views, reading the session state on every check.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    pub fn check(&self, route: &Route) -> Access {
        if !route.is_protected() || self.session.is_authenticated() {
            Access::Granted
        } else {
            debug!(route = %route.path(), "Protected route denied");
            Access::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryTokenStorage;

    #[test]
    fn test_public_routes_always_granted() {
        let guard = RouteGuard::new(Arc::new(SessionStore::new(MemoryTokenStorage::default())));
        assert_eq!(guard.check(&Route::Home), Access::Granted);
        assert_eq!(guard.check(&Route::Cars), Access::Granted);
        assert_eq!(guard.check(&Route::CarDetails("VIN1".into())), Access::Granted);
    }

    #[test]
    fn test_protected_routes_follow_session() {
        let session = Arc::new(SessionStore::new(MemoryTokenStorage::default()));
        let guard = RouteGuard::new(Arc::clone(&session));
        assert_eq!(guard.check(&Route::MyRentals), Access::Denied);
        assert_eq!(guard.check(&Route::RegisterCar), Access::Denied);

        session.set_session("tok").expect("set session");
        assert_eq!(guard.check(&Route::MyRentals), Access::Granted);

        session.clear_session().expect("clear session");
        assert_eq!(guard.check(&Route::RegisterCar), Access::Denied);
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::CarDetails("VIN1".into()).path(), "/cars/VIN1");
        assert_eq!(Route::RegisterCar.path(), "/register-car");
        assert_eq!(Route::MyRentals.path(), "/my-rentals");
    }
}
