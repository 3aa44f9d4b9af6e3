//! Placeholder login that gates DBSC registration

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use dbsc::handler::cookie_value;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DemoConfig;

/// Name of the cookie set after a successful login
pub const LOGIN_COOKIE: &str = "login_cookie";

/// Where unauthenticated registration attempts are sent
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Demo credentials plus the login cookies handed out so far
pub struct LoginService {
    username: String,
    password: String,
    ttl: Duration,
    logins: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl LoginService {
    pub fn new(config: &DemoConfig) -> Self {
        let ttl = i64::try_from(config.login_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            ttl,
            logins: RwLock::new(HashMap::new()),
        }
    }

    /// Check credentials; on success return a fresh login cookie value
    pub fn login(&self, username: &str, password: &str) -> Option<String> {
        if username != self.username || password != self.password {
            return None;
        }

        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let token = generate_token();

        let mut logins = self.logins.write();
        logins.retain(|_, expiry| now < *expiry);
        logins.insert(token.clone(), expires_at);
        Some(token)
    }

    /// Whether a login cookie value is known and unexpired
    pub fn is_logged_in(&self, token: &str) -> bool {
        self.logins
            .read()
            .get(token)
            .is_some_and(|expiry| Utc::now() < *expiry)
    }

    fn cookie_max_age(&self) -> i64 {
        self.ttl.num_seconds()
    }
}

/// # Panics
///
/// Panics if the OS random number generator is unavailable.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).expect("OS random number generator unavailable");
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Handler: form login with the demo credentials
pub async fn login(State(service): State<Arc<LoginService>>, Form(form): Form<LoginForm>) -> Response {
    match service.login(&form.username, &form.password) {
        Some(token) => {
            info!(username = %form.username, "Demo login succeeded");
            let cookie = format!(
                "{LOGIN_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
                service.cookie_max_age()
            );
            (StatusCode::OK, [(header::SET_COOKIE, cookie)], "Logged in").into_response()
        }
        None => {
            warn!(username = %form.username, "Demo login rejected");
            (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response()
        }
    }
}

/// Middleware: redirect to the login page without a live login cookie
pub async fn require_login(
    State(service): State<Arc<LoginService>>,
    request: Request,
    next: Next,
) -> Response {
    let logged_in = cookie_value(request.headers(), LOGIN_COOKIE)
        .is_some_and(|token| service.is_logged_in(token));

    if !logged_in {
        debug!(path = %request.uri().path(), "Registration attempted without login");
        return (StatusCode::FOUND, [(header::LOCATION, LOGIN_PATH)]).into_response();
    }
    next.run(request).await
}
