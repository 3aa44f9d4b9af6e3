//! In-memory state for challenges, bootstrap cookies, and sessions.
//!
//! Three independent collections, each behind its own lock. Entries carry
//! absolute expiry timestamps and are treated as absent once expired, whether
//! or not a sweep has removed them yet.
//!
//! ## Security Properties
//!
//! - Identifiers are 256 bits from the OS CSPRNG, base64url without padding
//! - A session is bound to one public key for its whole life; there is no
//!   rebind operation
//! - Key comparison is constant-time over the PEM bytes
//!
//! ## Limitations
//!
//! - State is lost on process restart
//! - Single-process only

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::DbscError;
use crate::verifier::SessionAuthority;

/// Default cleanup interval (5 minutes)
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Maximum entries in any collection before forced cleanup
const MAX_ENTRIES_BEFORE_CLEANUP: usize = 10_000;

/// Random bytes per identifier (256 bits)
const TOKEN_BYTES: usize = 32;

/// Store settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub challenge_ttl: Duration,
    pub session_ttl: Duration,
    /// Verifier challenge checks redeem (remove) the challenge
    pub single_use_challenges: bool,
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Duration::from_secs(60),
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            single_use_challenges: false,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Issued challenge
#[derive(Debug, Clone)]
pub struct Challenge {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issued bootstrap cookie
#[derive(Debug, Clone)]
pub struct BootstrapCookie {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Registered session
#[derive(Debug, Clone)]
pub struct Session {
    pub identifier: String,
    /// SPKI PEM of the key the session is bound to
    pub public_key_pem: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Live entry counts per collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveCounts {
    pub challenges: usize,
    pub bootstrap_cookies: usize,
    pub sessions: usize,
}

trait Expiring {
    fn expires_at(&self) -> DateTime<Utc>;

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

impl Expiring for Challenge {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl Expiring for BootstrapCookie {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl Expiring for Session {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Thread-safe store for DBSC state.
///
/// # Example
///
/// ```
/// use dbsc::SessionStore;
///
/// let store = SessionStore::new();
///
/// let challenge = store.issue_challenge();
/// assert!(store.check_challenge(&challenge));
///
/// let session_id = store.create_session("-----BEGIN PUBLIC KEY-----\n...");
/// assert!(store.session_exists(&session_id));
/// assert!(store.verify_session_key(&session_id, "-----BEGIN PUBLIC KEY-----\n..."));
/// ```
pub struct SessionStore {
    challenges: RwLock<HashMap<String, Challenge>>,
    bootstrap_cookies: RwLock<HashMap<String, BootstrapCookie>>,
    sessions: RwLock<HashMap<String, Session>>,
    last_cleanup: Mutex<Instant>,
    config: StoreConfig,
}

impl SessionStore {
    /// Create a store with default settings.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            challenges: RwLock::new(HashMap::new()),
            bootstrap_cookies: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            last_cleanup: Mutex::new(Instant::now()),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Issue a new challenge valid for the configured challenge TTL.
    pub fn issue_challenge(&self) -> String {
        self.maybe_cleanup();

        let now = Utc::now();
        let expires_at = expiry(now, self.config.challenge_ttl);
        let value = insert_unique(&self.challenges, |value| Challenge {
            value,
            created_at: now,
            expires_at,
        });

        debug!(expires_at = %expires_at, "Issued DBSC challenge");
        value
    }

    /// Whether `value` names an unexpired challenge. Does not consume it.
    pub fn check_challenge(&self, value: &str) -> bool {
        let now = Utc::now();
        self.challenges
            .read()
            .get(value)
            .is_some_and(|challenge| challenge.is_live(now))
    }

    /// Check a challenge and remove it in one step.
    ///
    /// Returns true for exactly one caller per live challenge.
    pub fn redeem_challenge(&self, value: &str) -> bool {
        let now = Utc::now();
        match self.challenges.write().remove(value) {
            Some(challenge) => challenge.is_live(now),
            None => false,
        }
    }

    /// Issue a bootstrap cookie value valid for `ttl`.
    pub fn issue_bootstrap_cookie(&self, ttl: Duration) -> String {
        self.maybe_cleanup();

        let now = Utc::now();
        let expires_at = expiry(now, ttl);
        insert_unique(&self.bootstrap_cookies, |value| BootstrapCookie {
            value,
            created_at: now,
            expires_at,
        })
    }

    /// Whether `value` names an unexpired bootstrap cookie.
    pub fn check_bootstrap_cookie(&self, value: &str) -> bool {
        let now = Utc::now();
        self.bootstrap_cookies
            .read()
            .get(value)
            .is_some_and(|cookie| cookie.is_live(now))
    }

    /// Create a session bound to `public_key_pem` and return its identifier.
    pub fn create_session(&self, public_key_pem: &str) -> String {
        self.maybe_cleanup();

        let now = Utc::now();
        let expires_at = expiry(now, self.config.session_ttl);
        insert_unique(&self.sessions, |identifier| Session {
            identifier,
            public_key_pem: public_key_pem.to_string(),
            created_at: now,
            expires_at,
        })
    }

    /// Whether `session_id` names an unexpired session.
    pub fn session_exists(&self, session_id: &str) -> bool {
        self.session_status(session_id).is_ok()
    }

    /// Classify a session identifier.
    ///
    /// # Errors
    ///
    /// [`DbscError::SessionNotFound`] for unknown identifiers and
    /// [`DbscError::SessionExpired`] for known but expired ones.
    pub fn session_status(&self, session_id: &str) -> Result<(), DbscError> {
        let now = Utc::now();
        match self.sessions.read().get(session_id) {
            Some(session) if session.is_live(now) => Ok(()),
            Some(_) => Err(DbscError::SessionExpired),
            None => Err(DbscError::SessionNotFound),
        }
    }

    /// Whether the live session `session_id` is bound to exactly `public_key_pem`.
    pub fn verify_session_key(&self, session_id: &str, public_key_pem: &str) -> bool {
        let now = Utc::now();
        self.sessions
            .read()
            .get(session_id)
            .filter(|session| session.is_live(now))
            .is_some_and(|session| {
                session
                    .public_key_pem
                    .as_bytes()
                    .ct_eq(public_key_pem.as_bytes())
                    .into()
            })
    }

    /// Snapshot of a session record.
    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Number of live entries in each collection.
    pub fn active_counts(&self) -> ActiveCounts {
        let now = Utc::now();
        ActiveCounts {
            challenges: count_live(&self.challenges, now),
            bootstrap_cookies: count_live(&self.bootstrap_cookies, now),
            sessions: count_live(&self.sessions, now),
        }
    }

    /// Remove expired entries from every collection.
    pub fn cleanup(&self) {
        let now = Utc::now();
        let removed = sweep(&self.challenges, now)
            + sweep(&self.bootstrap_cookies, now)
            + sweep(&self.sessions, now);
        *self.last_cleanup.lock() = Instant::now();

        if removed > 0 {
            debug!(removed, "Evicted expired DBSC entries");
        }
    }

    /// Cleanup if interval has passed or any collection is too large.
    fn maybe_cleanup(&self) {
        let interval_elapsed = self.last_cleanup.lock().elapsed() > self.config.cleanup_interval;
        let oversized = self.challenges.read().len() > MAX_ENTRIES_BEFORE_CLEANUP
            || self.bootstrap_cookies.read().len() > MAX_ENTRIES_BEFORE_CLEANUP
            || self.sessions.read().len() > MAX_ENTRIES_BEFORE_CLEANUP;

        if interval_elapsed || oversized {
            self.cleanup();
        }
    }

    /// Total entries held, expired or not (for testing).
    #[cfg(test)]
    fn stored_len(&self) -> usize {
        self.challenges.read().len() + self.bootstrap_cookies.read().len() + self.sessions.read().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuthority for SessionStore {
    fn is_challenge_live(&self, challenge: &str) -> bool {
        if self.config.single_use_challenges {
            self.redeem_challenge(challenge)
        } else {
            self.check_challenge(challenge)
        }
    }

    fn is_session_bound_to(&self, session_id: &str, public_key_pem: &str) -> bool {
        self.verify_session_key(session_id, public_key_pem)
    }
}

/// Generate a 256-bit random identifier, base64url without padding.
///
/// # Panics
///
/// Panics if secure random number generation fails. Predictable challenges or
/// session identifiers would void the binding guarantees, so there is no
/// fallback.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::getrandom(&mut bytes).expect(
        "secure random number generation failed - \
         system may be misconfigured or compromised",
    );
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Insert a record under a fresh identifier, retrying on collision.
fn insert_unique<T>(map: &RwLock<HashMap<String, T>>, make: impl Fn(String) -> T) -> String {
    let mut entries = map.write();
    loop {
        let key = generate_token();
        if let Entry::Vacant(slot) = entries.entry(key.clone()) {
            slot.insert(make(key.clone()));
            return key;
        }
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn count_live<T: Expiring>(map: &RwLock<HashMap<String, T>>, now: DateTime<Utc>) -> usize {
    map.read().values().filter(|entry| entry.is_live(now)).count()
}

fn sweep<T: Expiring>(map: &RwLock<HashMap<String, T>>, now: DateTime<Utc>) -> usize {
    let mut entries = map.write();
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now));
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    const PEM_A: &str = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
    const PEM_B: &str = "-----BEGIN PUBLIC KEY-----\nBBBB\n-----END PUBLIC KEY-----\n";

    fn expiring_store() -> SessionStore {
        SessionStore::with_config(StoreConfig {
            challenge_ttl: Duration::ZERO,
            session_ttl: Duration::ZERO,
            ..StoreConfig::default()
        })
    }

    #[test]
    fn test_identifiers_are_256_bit_base64url() {
        let store = SessionStore::new();
        for value in [
            store.issue_challenge(),
            store.issue_bootstrap_cookie(Duration::from_secs(10)),
            store.create_session(PEM_A),
        ] {
            assert_eq!(value.len(), 43);
            assert_eq!(URL_SAFE_NO_PAD.decode(&value).unwrap().len(), 32);
        }
    }

    #[test]
    fn test_challenge_is_reusable_within_ttl() {
        let store = SessionStore::new();
        let challenge = store.issue_challenge();

        assert!(store.check_challenge(&challenge));
        assert!(store.check_challenge(&challenge));
        assert!(store.is_challenge_live(&challenge));
        assert!(!store.check_challenge("never-issued"));
    }

    #[test]
    fn test_expired_challenge_is_rejected() {
        let store = expiring_store();
        let challenge = store.issue_challenge();

        assert!(!store.check_challenge(&challenge));
        assert!(!store.redeem_challenge(&challenge));
    }

    #[test]
    fn test_redeem_challenge_once() {
        let store = SessionStore::new();
        let challenge = store.issue_challenge();

        assert!(store.redeem_challenge(&challenge));
        assert!(!store.redeem_challenge(&challenge));
        assert!(!store.check_challenge(&challenge));
    }

    #[test]
    fn test_single_use_authority_redeems() {
        let store = SessionStore::with_config(StoreConfig {
            single_use_challenges: true,
            ..StoreConfig::default()
        });
        let challenge = store.issue_challenge();

        assert!(store.is_challenge_live(&challenge));
        assert!(!store.is_challenge_live(&challenge));
    }

    #[test]
    fn test_concurrent_redeem_has_one_winner() {
        let store = Arc::new(SessionStore::new());
        let challenge = store.issue_challenge();

        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.redeem_challenge(&challenge)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_bootstrap_cookie_lifetime() {
        let store = SessionStore::new();
        let live = store.issue_bootstrap_cookie(Duration::from_secs(10));
        let expired = store.issue_bootstrap_cookie(Duration::ZERO);

        assert!(store.check_bootstrap_cookie(&live));
        assert!(!store.check_bootstrap_cookie(&expired));
        assert!(!store.check_bootstrap_cookie("unknown"));
    }

    #[test]
    fn test_session_binding() {
        let store = SessionStore::new();
        let session_id = store.create_session(PEM_A);

        assert!(store.session_exists(&session_id));
        assert!(store.verify_session_key(&session_id, PEM_A));
        assert!(!store.verify_session_key(&session_id, PEM_B));
        assert!(!store.verify_session_key("unknown", PEM_A));

        let session = store.get_session(&session_id).unwrap();
        assert_eq!(session.identifier, session_id);
        assert_eq!(session.public_key_pem, PEM_A);
        assert!(session.expires_at > session.created_at);
    }

    #[test]
    fn test_single_character_pem_change_is_rejected() {
        let store = SessionStore::new();
        let session_id = store.create_session(PEM_A);

        for i in 0..PEM_A.len() {
            let mut altered = PEM_A.as_bytes().to_vec();
            altered[i] = if altered[i] == b'Z' { b'Y' } else { b'Z' };
            let altered = String::from_utf8(altered).unwrap();
            assert!(!store.verify_session_key(&session_id, &altered), "index {i}");
        }
        // Length differences as well
        assert!(!store.verify_session_key(&session_id, &PEM_A[..PEM_A.len() - 1]));
        assert!(!store.verify_session_key(&session_id, &format!("{PEM_A}\n")));
    }

    #[test]
    fn test_session_status() {
        let store = SessionStore::new();
        let session_id = store.create_session(PEM_A);
        assert_eq!(store.session_status(&session_id), Ok(()));
        assert_eq!(store.session_status("unknown"), Err(DbscError::SessionNotFound));

        let store = expiring_store();
        let session_id = store.create_session(PEM_A);
        assert_eq!(store.session_status(&session_id), Err(DbscError::SessionExpired));
        assert!(!store.session_exists(&session_id));
        assert!(!store.verify_session_key(&session_id, PEM_A));
    }

    #[test]
    fn test_concurrent_sessions_are_distinct() {
        let store = Arc::new(SessionStore::new());

        let created: Vec<(String, String)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        let pem = format!("-----BEGIN PUBLIC KEY-----\n{i}\n-----END PUBLIC KEY-----\n");
                        (store.create_session(&pem), pem)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ids: HashSet<_> = created.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids.len(), 16);

        for (id, pem) in &created {
            assert!(store.verify_session_key(id, pem));
            for (other_id, _) in created.iter().filter(|(other, _)| other != id) {
                assert!(!store.verify_session_key(other_id, pem));
            }
        }
    }

    #[test]
    fn test_cleanup_evicts_expired_entries() {
        let store = SessionStore::new();
        store.issue_bootstrap_cookie(Duration::ZERO);
        store.issue_bootstrap_cookie(Duration::ZERO);
        let live_session = store.create_session(PEM_A);
        let live_challenge = store.issue_challenge();

        assert_eq!(store.stored_len(), 4);
        store.cleanup();
        assert_eq!(store.stored_len(), 2);

        assert!(store.session_exists(&live_session));
        assert!(store.check_challenge(&live_challenge));
        assert_eq!(
            store.active_counts(),
            ActiveCounts {
                challenges: 1,
                bootstrap_cookies: 0,
                sessions: 1,
            }
        );
    }

    #[test]
    fn test_issuing_triggers_cleanup_after_interval() {
        let store = SessionStore::with_config(StoreConfig {
            challenge_ttl: Duration::ZERO,
            cleanup_interval: Duration::ZERO,
            ..StoreConfig::default()
        });
        store.issue_challenge();
        std::thread::sleep(Duration::from_millis(5));
        store.issue_challenge();

        // The first challenge was swept before the second was issued
        assert_eq!(store.stored_len(), 1);
    }
}
