//! # DBSC - Device Bound Session Credentials
//!
//! This crate implements the server side of Device Bound Session Credentials:
//! a browser proves possession of a device-held private key, and the server
//! binds a session to the corresponding public key so that a stolen session
//! cookie is useless without the key.
//!
//! The handshake:
//!
//! 1. A response carries `Sec-Session-Registration` with a fresh challenge.
//! 2. The browser signs a `dbsc+jwt` proof over that challenge, embedding its
//!    public key, and sends it in `Sec-Session-Response` to the registration
//!    endpoint. The server binds a new session to the key.
//! 3. When the short-lived bootstrap cookie lapses, the browser calls the
//!    refresh endpoint, receives `Sec-Session-Challenge`, and answers with a
//!    new proof signed by the same key.
//!
//! ## Features
//!
//! - **`server`** (default): axum request steps (registration, refresh,
//!   guard) in [`handler`]
//!
//! ## Quick Start
//!
//! ### Client-side: answer a challenge
//!
//! ```rust
//! use dbsc::{DbscClient, ClientError};
//!
//! // ES256 client with a fresh P-256 keypair
//! let client = DbscClient::generate();
//!
//! let proof = client.create_registration_proof(
//!     "https://example.com/dbsc_start",
//!     "challenge-from-server",
//!     None,
//! )?;
//! # Ok::<(), ClientError>(())
//! ```
//!
//! ### Server-side: verify a proof
//!
//! ```rust
//! use std::sync::Arc;
//! use dbsc::{DbscClient, ProofVerifier, SessionStore};
//!
//! let store = Arc::new(SessionStore::new());
//! let verifier = ProofVerifier::new(store.clone());
//!
//! let challenge = store.issue_challenge();
//! let client = DbscClient::generate();
//! let proof = client
//!     .create_registration_proof("https://example.com/dbsc_start", &challenge, None)
//!     .unwrap();
//!
//! let verified = verifier
//!     .verify_proof(&proof, "https://example.com/dbsc_start")
//!     .unwrap();
//! let session_id = store.create_session(&verified.pem);
//! assert!(store.verify_session_key(&session_id, &verified.pem));
//! ```
//!
//! ## Security Considerations
//!
//! - **Key binding**: a session's key is fixed at registration; refresh
//!   proofs must derive a byte-identical SPKI PEM, compared in constant time.
//! - **Challenge scope**: every proof must name a live server-issued
//!   challenge and list the exact endpoint URL in its audience.
//! - **Key validation**: EC coordinates are length-checked and must lie on
//!   the curve; the JWS algorithm must fit the key type.
//!
//! ## Algorithm Support
//!
//! - **ES256** (ECDSA with P-256 and SHA-256)
//! - **RS256** (RSASSA-PKCS1-v1_5 with SHA-256)

pub mod audit;
mod claims;
mod client;
mod config;
mod error;
#[cfg(feature = "server")]
pub mod handler;
pub mod headers;
mod instruction;
mod jwk;
mod store;
mod thumbprint;
mod verifier;

#[cfg(test)]
mod test_support;

pub use audit::AuditEvent;
pub use claims::{parse_proof_claims, DbscProof};
pub use client::{DbscClaims, DbscClient};
pub use config::{ConfigError, DbscConfig, GuardMode};
pub use error::{ClientError, DbscError};
#[cfg(feature = "server")]
pub use handler::{BoundSession, DbscService};
pub use headers::{ChallengeHeader, RegistrationHeader};
pub use instruction::{ScopeSpecification, SessionCredential, SessionInstruction, SessionScope};
pub use jwk::{convert_jwk, ConvertedKey, PublicKey};
pub use store::{ActiveCounts, BootstrapCookie, Challenge, Session, SessionStore, StoreConfig};
pub use thumbprint::compute_thumbprint;
pub use verifier::{ProofVerifier, SessionAuthority};

/// JWS `typ` of a DBSC proof
pub const PROOF_TYPE: &str = "dbsc+jwt";

/// Proof algorithms this crate can verify
pub const SUPPORTED_ALGORITHMS: [&str; 2] = ["ES256", "RS256"];
