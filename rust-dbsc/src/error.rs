//! Error types for DBSC operations

use thiserror::Error;

/// Errors raised while verifying proofs and driving the session handshake
/// (server-side).
///
/// Every verification stage stops at the first failure, so a single variant
/// always names the stage that rejected the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbscError {
    /// Required request header is absent
    #[error("{0} header required")]
    MissingHeader(&'static str),

    /// Proof is not a compact JWS with JSON header and payload
    #[error("Malformed proof token: {0}")]
    MalformedToken(String),

    /// JWS header fails the typ/alg requirements
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Required claim is absent from the payload
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),

    /// Claim is present but has the wrong JSON type
    #[error("Invalid claim type: {0}")]
    InvalidClaimType(&'static str),

    /// JWK `kty` is missing or not EC/RSA
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// JWK parameters cannot be decoded into a public key
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Signature does not verify under the embedded key
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// Expected audience is not in the proof's `aud` list
    #[error("Invalid audience (expected={expected}, actual={actual:?})")]
    InvalidAudience {
        /// Endpoint URL the proof was submitted to
        expected: String,
        /// Audience list carried by the proof
        actual: Vec<String>,
    },

    /// `jti` does not name a live challenge
    #[error("Unknown or expired challenge")]
    UnknownOrExpiredChallenge,

    /// Proof key differs from the key bound to the session
    #[error("Public key does not match session")]
    KeyMismatch,

    /// No session with the given identifier
    #[error("DBSC session not found")]
    SessionNotFound,

    /// Session exists but its lifetime has elapsed
    #[error("DBSC session expired")]
    SessionExpired,

    /// Guarded resource requested without the bootstrap cookie
    #[error("DBSC session cookie not found")]
    MissingBootstrapCookie,
}

impl DbscError {
    /// Stable snake_case identifier used in JSON error bodies and audit events
    pub fn kind(&self) -> &'static str {
        match self {
            DbscError::MissingHeader(_) => "missing_header",
            DbscError::MalformedToken(_) => "malformed_token",
            DbscError::InvalidHeader(_) => "invalid_header",
            DbscError::MissingClaim(_) => "missing_claim",
            DbscError::InvalidClaimType(_) => "invalid_claim_type",
            DbscError::UnsupportedKeyType(_) => "unsupported_key_type",
            DbscError::InvalidKeyEncoding(_) => "invalid_key_encoding",
            DbscError::SignatureInvalid => "signature_invalid",
            DbscError::InvalidAudience { .. } => "invalid_audience",
            DbscError::UnknownOrExpiredChallenge => "unknown_or_expired_challenge",
            DbscError::KeyMismatch => "key_mismatch",
            DbscError::SessionNotFound => "session_not_found",
            DbscError::SessionExpired => "session_expired",
            DbscError::MissingBootstrapCookie => "missing_bootstrap_cookie",
        }
    }

    /// HTTP status this error maps to.
    ///
    /// Absent or expired sessions and a missing guard cookie are 401 so the
    /// client restarts the handshake; every proof problem is 400.
    pub fn status_code(&self) -> u16 {
        match self {
            DbscError::SessionNotFound
            | DbscError::SessionExpired
            | DbscError::MissingBootstrapCookie => 401,
            _ => 400,
        }
    }
}

/// Errors that can occur during proof generation (client-side)
#[derive(Debug, Error)]
pub enum ClientError {
    /// Key material could not be produced or exported
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signing operation failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server header could not be parsed
    #[error("Invalid {header} header: {reason}")]
    InvalidServerHeader {
        /// Header name
        header: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_are_unauthorized() {
        assert_eq!(DbscError::SessionNotFound.status_code(), 401);
        assert_eq!(DbscError::SessionExpired.status_code(), 401);
        assert_eq!(DbscError::MissingBootstrapCookie.status_code(), 401);
    }

    #[test]
    fn test_proof_errors_are_bad_request() {
        let errors = [
            DbscError::MissingHeader("Sec-Session-Response"),
            DbscError::MalformedToken("two segments".into()),
            DbscError::InvalidHeader("typ".into()),
            DbscError::MissingClaim("aud"),
            DbscError::InvalidClaimType("iat"),
            DbscError::UnsupportedKeyType("OKP".into()),
            DbscError::InvalidKeyEncoding("x".into()),
            DbscError::SignatureInvalid,
            DbscError::UnknownOrExpiredChallenge,
            DbscError::KeyMismatch,
        ];
        for err in errors {
            assert_eq!(err.status_code(), 400, "{err}");
        }
    }

    #[test]
    fn test_display_names_the_field() {
        assert_eq!(
            DbscError::InvalidClaimType("aud").to_string(),
            "Invalid claim type: aud"
        );
        assert_eq!(
            DbscError::MissingHeader("Sec-Session-Response").to_string(),
            "Sec-Session-Response header required"
        );
    }
}
