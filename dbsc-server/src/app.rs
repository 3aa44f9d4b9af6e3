//! Router composition

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use dbsc::handler::{
    begin_registration, complete_registration, liveness, refresh, require_bootstrap_cookie,
};
use dbsc::DbscService;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::login::{self, LoginService, LOGIN_PATH};

/// Path of the sample bound resource
pub const CHECK_SESSION_PATH: &str = "/api/check_dbsc_session";

/// Shared services behind the router
#[derive(Clone)]
pub struct AppState {
    pub dbsc: Arc<DbscService>,
    pub logins: Arc<LoginService>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            dbsc: Arc::new(DbscService::new(config.dbsc.clone())),
            logins: Arc::new(LoginService::new(&config.demo)),
        }
    }
}

/// Build the demo application
pub fn router(state: AppState) -> Router {
    let config = state.dbsc.config();

    let login_routes: Router = Router::new()
        .route(
            LOGIN_PATH,
            post(login::login).layer(from_fn_with_state(state.dbsc.clone(), begin_registration)),
        )
        .with_state(state.logins.clone());

    let dbsc_routes: Router = Router::new()
        .route(
            &config.registration_path,
            post(complete_registration)
                .layer(from_fn_with_state(state.logins.clone(), login::require_login)),
        )
        .route(&config.refresh_path, post(refresh))
        .route(
            CHECK_SESSION_PATH,
            get(liveness).layer(from_fn_with_state(state.dbsc.clone(), require_bootstrap_cookie)),
        )
        .with_state(state.dbsc.clone());

    Router::new()
        .route("/healthz", get(liveness))
        .merge(login_routes)
        .merge(dbsc_routes)
        .layer(TraceLayer::new_for_http())
}
