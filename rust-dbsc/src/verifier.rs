//! Proof verification
//!
//! Verification runs in a fixed order and stops at the first failure:
//! token structure, header, claims, signature, audience, challenge, key
//! presence. Refresh verification adds the session key binding check.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::claims::{parse_proof_claims, DbscProof};
use crate::error::DbscError;
use crate::{PROOF_TYPE, SUPPORTED_ALGORITHMS};

/// The checks a verifier needs from session state
pub trait SessionAuthority: Send + Sync {
    /// Whether `challenge` was issued and has not expired
    fn is_challenge_live(&self, challenge: &str) -> bool;

    /// Whether the live session `session_id` is bound to exactly `public_key_pem`
    fn is_session_bound_to(&self, session_id: &str, public_key_pem: &str) -> bool;
}

/// Verifies registration and refresh proofs
#[derive(Clone)]
pub struct ProofVerifier {
    authority: Arc<dyn SessionAuthority>,
    algorithms: Vec<String>,
}

/// Decoded compact JWS, signature not yet checked
struct CompactJws<'a> {
    header: Map<String, Value>,
    payload: Map<String, Value>,
    signing_input: &'a str,
    signature: Vec<u8>,
}

impl ProofVerifier {
    /// Create a verifier accepting every supported algorithm
    pub fn new(authority: Arc<dyn SessionAuthority>) -> Self {
        Self {
            authority,
            algorithms: SUPPORTED_ALGORITHMS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Restrict accepted algorithms to `algorithms`
    ///
    /// Names outside the supported set are ignored.
    pub fn with_algorithms(mut self, algorithms: &[String]) -> Self {
        self.algorithms = algorithms
            .iter()
            .filter(|alg| SUPPORTED_ALGORITHMS.contains(&alg.as_str()))
            .cloned()
            .collect();
        self
    }

    /// Verify a proof sent to `expected_audience`
    ///
    /// Returns the verified proof, including the PEM of the embedded key.
    pub fn verify_proof(&self, token: &str, expected_audience: &str) -> Result<DbscProof, DbscError> {
        let jws = decode_compact(token)?;
        let alg = self.check_header(&jws.header)?;
        let proof = parse_proof_claims(&jws.payload)?;

        proof
            .public_key
            .verify(alg, jws.signing_input.as_bytes(), &jws.signature)?;

        if !proof.has_audience(expected_audience) {
            return Err(DbscError::InvalidAudience {
                expected: expected_audience.to_string(),
                actual: proof.audience,
            });
        }

        if !self.authority.is_challenge_live(&proof.jti) {
            return Err(DbscError::UnknownOrExpiredChallenge);
        }

        if proof.key.is_empty() {
            return Err(DbscError::MissingClaim("key"));
        }

        debug!(
            alg,
            key_type = proof.public_key.describe(),
            thumbprint = %proof.thumbprint(),
            "DBSC proof verified"
        );
        Ok(proof)
    }

    /// Verify a refresh proof for `session_id`
    ///
    /// On top of [`ProofVerifier::verify_proof`], the proof key must be the
    /// key the session was registered with.
    pub fn verify_refresh_proof(
        &self,
        token: &str,
        expected_audience: &str,
        session_id: &str,
    ) -> Result<DbscProof, DbscError> {
        let proof = self.verify_proof(token, expected_audience)?;

        if !self.authority.is_session_bound_to(session_id, &proof.pem) {
            warn!(
                session_id = %session_id,
                thumbprint = %proof.thumbprint(),
                "Refresh proof key does not match session"
            );
            return Err(DbscError::KeyMismatch);
        }

        if let Some(subject) = proof.subject.as_deref().filter(|s| *s != session_id) {
            debug!(session_id = %session_id, subject, "Refresh proof sub differs from Sec-Session-Id");
        }

        Ok(proof)
    }

    fn check_header<'h>(&self, header: &'h Map<String, Value>) -> Result<&'h str, DbscError> {
        if header.get("typ").and_then(Value::as_str) != Some(PROOF_TYPE) {
            return Err(DbscError::InvalidHeader(format!(
                "typ must be {PROOF_TYPE}"
            )));
        }

        let alg = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| DbscError::InvalidHeader("missing alg".to_string()))?;

        if !self.algorithms.iter().any(|a| a == alg) {
            return Err(DbscError::InvalidHeader(format!(
                "unsupported algorithm: {alg}"
            )));
        }
        Ok(alg)
    }
}

fn decode_compact(token: &str) -> Result<CompactJws<'_>, DbscError> {
    let token = token.trim();
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(DbscError::MalformedToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let header = decode_json_segment(parts[0], "header")?;
    let payload = decode_json_segment(parts[1], "payload")?;
    let signature = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| DbscError::MalformedToken("signature is not base64url".to_string()))?;

    let signing_input = &token[..parts[0].len() + 1 + parts[1].len()];
    Ok(CompactJws {
        header,
        payload,
        signing_input,
        signature,
    })
}

fn decode_json_segment(segment: &str, name: &str) -> Result<Map<String, Value>, DbscError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| DbscError::MalformedToken(format!("{name} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| DbscError::MalformedToken(format!("{name} is not a JSON object")))
}
