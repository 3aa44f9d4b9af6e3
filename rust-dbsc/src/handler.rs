//! axum request steps for the DBSC handshake
//!
//! The steps are mounted by the embedding application:
//!
//! - [`begin_registration`]: middleware around any response that should
//!   start a bound session (typically a login handler)
//! - [`complete_registration`]: the registration endpoint
//! - [`refresh`]: the refresh endpoint
//! - [`require_bootstrap_cookie`]: guard middleware for bound resources
//! - [`liveness`]: trivial handler to mount behind the guard
//!
//! All steps take `State<Arc<DbscService>>`.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audit::AuditEvent;
use crate::config::{DbscConfig, GuardMode};
use crate::error::DbscError;
use crate::headers::{
    ChallengeHeader, RegistrationHeader, SEC_SESSION_CHALLENGE, SEC_SESSION_ID,
    SEC_SESSION_REGISTRATION, SEC_SESSION_RESPONSE,
};
use crate::instruction::SessionInstruction;
use crate::store::SessionStore;
use crate::verifier::ProofVerifier;

/// Shared state behind every DBSC step
pub struct DbscService {
    store: Arc<SessionStore>,
    verifier: ProofVerifier,
    config: DbscConfig,
}

/// Successful registration or refresh
#[derive(Debug, Clone)]
pub struct BoundSession {
    pub instruction: SessionInstruction,
    /// Full `Set-Cookie` value for the bootstrap cookie
    pub set_cookie: String,
}

impl DbscService {
    /// Create a service with its own store
    pub fn new(config: DbscConfig) -> Self {
        let store = Arc::new(SessionStore::with_config(config.store_config()));
        Self::with_store(config, store)
    }

    /// Create a service over an existing store
    pub fn with_store(config: DbscConfig, store: Arc<SessionStore>) -> Self {
        let verifier = ProofVerifier::new(store.clone()).with_algorithms(&config.algorithms);
        Self {
            store,
            verifier,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn verifier(&self) -> &ProofVerifier {
        &self.verifier
    }

    pub fn config(&self) -> &DbscConfig {
        &self.config
    }

    /// Issue a challenge and format the `Sec-Session-Registration` value
    pub fn registration_header(&self) -> String {
        RegistrationHeader {
            algorithms: self.config.algorithms.clone(),
            path: self.config.registration_path.clone(),
            challenge: self.store.issue_challenge(),
            authorization: self.config.authorization.clone(),
            ..RegistrationHeader::default()
        }
        .to_header_value()
    }

    /// Verify a registration proof and bind a new session to its key
    pub fn register(&self, origin: &str, proof: &str) -> Result<BoundSession, DbscError> {
        let audience = format!("{}{}", origin, self.config.registration_path);
        let proof = self.verifier.verify_proof(proof, &audience)?;

        let session_id = self.store.create_session(&proof.pem);
        let cookie = self
            .store
            .issue_bootstrap_cookie(self.config.registration_cookie_ttl());

        AuditEvent::session_registered(
            &session_id,
            origin,
            &proof.thumbprint(),
            proof.public_key.describe(),
        )
        .log();
        info!(session_id = %session_id, origin, "DBSC session registered");

        Ok(BoundSession {
            instruction: SessionInstruction::new(
                session_id,
                self.config.refresh_path.clone(),
                origin,
                self.config.cookie_name.clone(),
                "SameSite=Lax",
            ),
            set_cookie: self.cookie_header(
                &cookie,
                self.config.registration_cookie_ttl(),
                "SameSite=Lax",
            ),
        })
    }

    /// Issue a refresh challenge for a live session
    pub fn refresh_challenge(&self, session_id: Option<&str>) -> Result<ChallengeHeader, DbscError> {
        let session_id = session_id.ok_or(DbscError::SessionNotFound)?;
        self.store.session_status(session_id)?;

        let challenge = self.store.issue_challenge();
        AuditEvent::refresh_challenge_issued(session_id).log();

        Ok(ChallengeHeader {
            challenge,
            session_id: Some(session_id.to_string()),
        })
    }

    /// Verify a refresh proof and reissue the bootstrap cookie
    ///
    /// The session is the one named by `session_id`, or the proof's `sub`
    /// when the request did not name one.
    pub fn refresh(
        &self,
        origin: &str,
        proof: &str,
        session_id: Option<&str>,
        secure: bool,
    ) -> Result<BoundSession, DbscError> {
        let refresh_url = format!("{}{}", origin, self.config.refresh_path);

        let (proof, session_id) = match session_id {
            Some(id) => (
                self.verifier.verify_refresh_proof(proof, &refresh_url, id)?,
                id.to_string(),
            ),
            None => {
                let proof = self.verifier.verify_proof(proof, &refresh_url)?;
                let id = proof.subject.clone().ok_or(DbscError::KeyMismatch)?;
                if !self.store.verify_session_key(&id, &proof.pem) {
                    return Err(DbscError::KeyMismatch);
                }
                (proof, id)
            }
        };

        let cookie = self
            .store
            .issue_bootstrap_cookie(self.config.refresh_cookie_ttl());

        AuditEvent::session_refreshed(&session_id, origin, &proof.thumbprint()).log();
        debug!(session_id = %session_id, "DBSC session refreshed");

        let secure_attr = if secure { "Secure; " } else { "" };
        Ok(BoundSession {
            instruction: SessionInstruction::new(
                session_id,
                refresh_url,
                origin,
                self.config.cookie_name.clone(),
                format!("HttpOnly; {secure_attr}SameSite=Lax"),
            ),
            set_cookie: self.cookie_header(
                &cookie,
                self.config.refresh_cookie_ttl(),
                &format!("HttpOnly; {secure_attr}SameSite=None"),
            ),
        })
    }

    /// Whether a request carrying `cookie` may pass the guard
    pub fn is_guard_satisfied(&self, cookie: Option<&str>) -> bool {
        match (cookie, self.config.guard_mode) {
            (None, _) => false,
            (Some(_), GuardMode::Presence) => true,
            (Some(value), GuardMode::Live) => self.store.check_bootstrap_cookie(value),
        }
    }

    /// Whether the request arrived over TLS
    ///
    /// `X-Forwarded-Proto` is only consulted with `trust_forwarded_proto`.
    pub fn is_secure(&self, headers: &HeaderMap) -> bool {
        self.config.secure_transport
            || (self.config.trust_forwarded_proto
                && header_value(headers, "x-forwarded-proto")
                    .is_some_and(|proto| proto.eq_ignore_ascii_case("https")))
    }

    /// Request origin: `Origin` header, else `{scheme}://{Host}`
    pub fn request_origin(&self, headers: &HeaderMap) -> String {
        if let Some(origin) = header_value(headers, header::ORIGIN.as_str()) {
            return origin.to_string();
        }

        let scheme = if self.is_secure(headers) { "https" } else { "http" };
        let host = header_value(headers, header::HOST.as_str()).unwrap_or("localhost");
        format!("{scheme}://{host}")
    }

    fn cookie_header(&self, value: &str, ttl: Duration, attributes: &str) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; {}",
            self.config.cookie_name,
            value,
            ttl.as_secs(),
            attributes
        )
    }
}

impl IntoResponse for BoundSession {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::SET_COOKIE, self.set_cookie)],
            Json(self.instruction),
        )
            .into_response()
    }
}

impl IntoResponse for DbscError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Middleware: issue a challenge and announce registration on the response
pub async fn begin_registration(
    State(service): State<Arc<DbscService>>,
    request: Request,
    next: Next,
) -> Response {
    let registration = service.registration_header();
    let mut response = next.run(request).await;

    match HeaderValue::from_str(&registration) {
        Ok(value) => {
            response.headers_mut().insert(SEC_SESSION_REGISTRATION, value);
        }
        Err(e) => warn!(error = %e, "Registration header is not a valid header value"),
    }
    response
}

/// Handler: complete registration with the proof in `Sec-Session-Response`
pub async fn complete_registration(
    State(service): State<Arc<DbscService>>,
    headers: HeaderMap,
) -> Response {
    let origin = service.request_origin(&headers);
    let result = proof_header(&headers).and_then(|proof| service.register(&origin, proof));

    match result {
        Ok(bound) => bound.into_response(),
        Err(err) => {
            AuditEvent::proof_rejected(&service.config.registration_path, None, &err).log();
            err.into_response()
        }
    }
}

/// Handler: challenge a refresh, or verify the proof answering one
pub async fn refresh(State(service): State<Arc<DbscService>>, headers: HeaderMap) -> Response {
    let session_id = header_value(&headers, SEC_SESSION_ID);

    if !has_proof(&headers) {
        return match service.refresh_challenge(session_id) {
            Ok(challenge) => (
                StatusCode::UNAUTHORIZED,
                [(SEC_SESSION_CHALLENGE, challenge.to_header_value())],
            )
                .into_response(),
            Err(err) => {
                debug!(session_id = ?session_id, error = %err, "Refresh without live session");
                err.into_response()
            }
        };
    }

    let origin = service.request_origin(&headers);
    let secure = service.is_secure(&headers);
    let result = proof_header(&headers)
        .and_then(|proof| service.refresh(&origin, proof, session_id, secure));

    match result {
        Ok(bound) => bound.into_response(),
        Err(err) => {
            AuditEvent::proof_rejected(&service.config.refresh_path, session_id, &err).log();
            err.into_response()
        }
    }
}

/// Middleware: require the bootstrap cookie
pub async fn require_bootstrap_cookie(
    State(service): State<Arc<DbscService>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed =
        service.is_guard_satisfied(cookie_value(request.headers(), &service.config.cookie_name));

    if !allowed {
        debug!(path = %request.uri().path(), "Bound resource requested without DBSC cookie");
        return DbscError::MissingBootstrapCookie.into_response();
    }
    next.run(request).await
}

/// Handler: plain `OK`
pub async fn liveness() -> &'static str {
    "OK"
}

/// Find a cookie by name across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// An empty or blank `Sec-Session-Response` counts as absent
fn has_proof(headers: &HeaderMap) -> bool {
    headers
        .get(SEC_SESSION_RESPONSE)
        .is_some_and(|value| !is_blank(value))
}

fn proof_header(headers: &HeaderMap) -> Result<&str, DbscError> {
    let value = headers
        .get(SEC_SESSION_RESPONSE)
        .filter(|value| !is_blank(value))
        .ok_or(DbscError::MissingHeader("Sec-Session-Response"))?;
    value
        .to_str()
        .map(str::trim)
        .map_err(|_| DbscError::MalformedToken("header is not visible ASCII".to_string()))
}

fn is_blank(value: &HeaderValue) -> bool {
    value.as_bytes().iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DbscClient;
    use crate::test_support::rsa_key_a;
    use axum::body::Body;
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn registration_challenge(service: &DbscService) -> String {
        RegistrationHeader::parse(&service.registration_header())
            .unwrap()
            .challenge
    }

    #[test]
    fn test_registration_header_advertises_config() {
        let service = DbscService::new(DbscConfig {
            authorization: Some("code".into()),
            ..DbscConfig::default()
        });
        let header = RegistrationHeader::parse(&service.registration_header()).unwrap();

        assert_eq!(header.algorithms, vec!["ES256", "RS256"]);
        assert_eq!(header.path, "/dbsc_start");
        assert_eq!(header.authorization.as_deref(), Some("code"));
        assert!(service.store().check_challenge(&header.challenge));
    }

    #[test]
    fn test_register_binds_session_and_issues_cookie() {
        let service = DbscService::new(DbscConfig::default());
        let client = DbscClient::generate();
        let challenge = registration_challenge(&service);
        let proof = client
            .create_registration_proof("https://host/dbsc_start", &challenge, None)
            .unwrap();

        let bound = service.register("https://host", &proof).unwrap();
        let session_id = &bound.instruction.session_identifier;

        assert!(service
            .store()
            .verify_session_key(session_id, &client.public_key_pem().unwrap()));
        assert_eq!(bound.instruction.refresh_url, "/dbsc_refresh");
        assert_eq!(bound.instruction.scope.origin, "https://host");
        assert_eq!(bound.instruction.credentials[0].attributes, "SameSite=Lax");

        let (name_value, attributes) = bound.set_cookie.split_once("; ").unwrap();
        let cookie = name_value.strip_prefix("dbsc_cookie=").unwrap();
        assert!(service.store().check_bootstrap_cookie(cookie));
        assert_eq!(attributes, "Path=/; Max-Age=10; SameSite=Lax");
    }

    #[test]
    fn test_register_rejects_wrong_origin() {
        let service = DbscService::new(DbscConfig::default());
        let client = DbscClient::generate();
        let challenge = registration_challenge(&service);
        let proof = client
            .create_registration_proof("https://other/dbsc_start", &challenge, None)
            .unwrap();

        assert!(matches!(
            service.register("https://host", &proof),
            Err(DbscError::InvalidAudience { .. })
        ));
        assert_eq!(service.store().active_counts().sessions, 0);
    }

    #[test]
    fn test_refresh_challenge_requires_live_session() {
        let service = DbscService::new(DbscConfig::default());
        assert_eq!(
            service.refresh_challenge(None).unwrap_err(),
            DbscError::SessionNotFound
        );
        assert_eq!(
            service.refresh_challenge(Some("unknown")).unwrap_err(),
            DbscError::SessionNotFound
        );

        let session_id = service.store().create_session("pem");
        let challenge = service.refresh_challenge(Some(&session_id)).unwrap();
        assert_eq!(challenge.session_id.as_deref(), Some(session_id.as_str()));
        assert!(service.store().check_challenge(&challenge.challenge));
    }

    #[test]
    fn test_refresh_challenge_for_expired_session() {
        let service = DbscService::new(DbscConfig {
            session_ttl_secs: 0,
            ..DbscConfig::default()
        });
        let session_id = service.store().create_session("pem");

        assert_eq!(
            service.refresh_challenge(Some(&session_id)).unwrap_err(),
            DbscError::SessionExpired
        );
    }

    #[test]
    fn test_refresh_falls_back_to_subject() {
        let service = DbscService::new(DbscConfig::default());
        let client = DbscClient::from_rsa_key(rsa_key_a());
        let session_id = service
            .store()
            .create_session(&client.public_key_pem().unwrap());
        let challenge = service.store().issue_challenge();
        let proof = client
            .create_refresh_proof("http://host/dbsc_refresh", &challenge, &session_id)
            .unwrap();

        let bound = service.refresh("http://host", &proof, None, false).unwrap();
        assert_eq!(bound.instruction.session_identifier, session_id);
        assert_eq!(bound.instruction.refresh_url, "http://host/dbsc_refresh");
        assert_eq!(bound.instruction.credentials[0].attributes, "HttpOnly; SameSite=Lax");
        assert!(bound
            .set_cookie
            .ends_with("; Path=/; Max-Age=60; HttpOnly; SameSite=None"));
    }

    #[test]
    fn test_refresh_secure_attributes() {
        let service = DbscService::new(DbscConfig::default());
        let client = DbscClient::generate();
        let session_id = service
            .store()
            .create_session(&client.public_key_pem().unwrap());
        let challenge = service.store().issue_challenge();
        let proof = client
            .create_refresh_proof("https://host/dbsc_refresh", &challenge, &session_id)
            .unwrap();

        let bound = service
            .refresh("https://host", &proof, Some(&session_id), true)
            .unwrap();
        assert_eq!(
            bound.instruction.credentials[0].attributes,
            "HttpOnly; Secure; SameSite=Lax"
        );
        assert!(bound
            .set_cookie
            .ends_with("; Max-Age=60; HttpOnly; Secure; SameSite=None"));
    }

    #[test]
    fn test_single_use_challenges() {
        let service = DbscService::new(DbscConfig {
            single_use_challenges: true,
            ..DbscConfig::default()
        });
        let client = DbscClient::generate();
        let challenge = registration_challenge(&service);
        let proof = client
            .create_registration_proof("https://host/dbsc_start", &challenge, None)
            .unwrap();

        assert!(service.register("https://host", &proof).is_ok());
        assert_eq!(
            service.register("https://host", &proof).unwrap_err(),
            DbscError::UnknownOrExpiredChallenge
        );
    }

    #[test]
    fn test_request_origin() {
        let service = DbscService::new(DbscConfig::default());

        let with_origin = headers(&[("origin", "https://app.example"), ("host", "ignored")]);
        assert_eq!(service.request_origin(&with_origin), "https://app.example");

        let plain = headers(&[("host", "localhost:8080")]);
        assert_eq!(service.request_origin(&plain), "http://localhost:8080");

        let proxied = headers(&[("host", "example.com"), ("x-forwarded-proto", "HTTPS")]);
        assert_eq!(service.request_origin(&proxied), "http://example.com");

        let behind_proxy = DbscService::new(DbscConfig {
            trust_forwarded_proto: true,
            ..DbscConfig::default()
        });
        assert_eq!(behind_proxy.request_origin(&proxied), "https://example.com");
        assert_eq!(behind_proxy.request_origin(&plain), "http://localhost:8080");

        let tls = DbscService::new(DbscConfig {
            secure_transport: true,
            ..DbscConfig::default()
        });
        assert_eq!(tls.request_origin(&plain), "https://localhost:8080");
    }

    #[test]
    fn test_cookie_value() {
        let map = headers(&[
            ("cookie", "a=1; dbsc_cookie=abc"),
            ("cookie", "other=\"quoted\""),
        ]);

        assert_eq!(cookie_value(&map, "dbsc_cookie"), Some("abc"));
        assert_eq!(cookie_value(&map, "other"), Some("quoted"));
        assert_eq!(cookie_value(&map, "dbsc"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "dbsc_cookie"), None);
    }

    #[test]
    fn test_guard_modes() {
        let presence = DbscService::new(DbscConfig::default());
        assert!(presence.is_guard_satisfied(Some("anything")));
        assert!(!presence.is_guard_satisfied(None));

        let live = DbscService::new(DbscConfig {
            guard_mode: GuardMode::Live,
            ..DbscConfig::default()
        });
        let cookie = live.store().issue_bootstrap_cookie(Duration::from_secs(10));
        assert!(live.is_guard_satisfied(Some(&cookie)));
        assert!(!live.is_guard_satisfied(Some("anything")));
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = DbscError::MissingHeader("Sec-Session-Response").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "missing_header");
        assert_eq!(json["message"], "Sec-Session-Response header required");

        let response = DbscError::SessionExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_begin_registration_wraps_any_response() {
        let service = Arc::new(DbscService::new(DbscConfig::default()));
        let app = Router::new().route(
            "/login",
            post(|| async { (StatusCode::CREATED, "welcome") })
                .layer(from_fn_with_state(service.clone(), begin_registration)),
        );

        let req = axum::http::Request::post("/login").body(Body::from("user=test")).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let value = resp.headers()[SEC_SESSION_REGISTRATION].to_str().unwrap();
        let header = RegistrationHeader::parse(value).unwrap();
        assert!(service.store().check_challenge(&header.challenge));

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"welcome");
    }

    #[tokio::test]
    async fn test_guard_blocks_without_cookie() {
        let service = Arc::new(DbscService::new(DbscConfig::default()));
        let app = Router::new().route(
            "/api/check_dbsc_session",
            get(liveness).layer(from_fn_with_state(service, require_bootstrap_cookie)),
        );

        let req = axum::http::Request::get("/api/check_dbsc_session")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = axum::http::Request::get("/api/check_dbsc_session")
            .header("cookie", "dbsc_cookie=x")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_complete_registration_requires_proof_header() {
        let service = Arc::new(DbscService::new(DbscConfig::default()));
        let app = Router::new()
            .route("/dbsc_start", post(complete_registration))
            .with_state(service);

        let req = axum::http::Request::post("/dbsc_start").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "missing_header");
    }

    #[tokio::test]
    async fn test_complete_registration_blank_proof_is_missing() {
        let service = Arc::new(DbscService::new(DbscConfig::default()));
        let app = Router::new()
            .route("/dbsc_start", post(complete_registration))
            .with_state(service);

        for blank in ["", "   "] {
            let req = axum::http::Request::post("/dbsc_start")
                .header(SEC_SESSION_RESPONSE, blank)
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], "missing_header", "{blank:?}");
        }
    }

    #[tokio::test]
    async fn test_refresh_blank_proof_issues_challenge() {
        let service = Arc::new(DbscService::new(DbscConfig::default()));
        let session_id = service.store().create_session("pem");
        let app = Router::new()
            .route("/dbsc_refresh", post(refresh))
            .with_state(service.clone());

        let req = axum::http::Request::post("/dbsc_refresh")
            .header(SEC_SESSION_ID, session_id.as_str())
            .header(SEC_SESSION_RESPONSE, "")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let value = resp.headers()[SEC_SESSION_CHALLENGE].to_str().unwrap();
        let challenges = ChallengeHeader::parse(value).unwrap();
        assert_eq!(challenges[0].session_id.as_deref(), Some(session_id.as_str()));
        assert!(service.store().check_challenge(&challenges[0].challenge));
    }
}
