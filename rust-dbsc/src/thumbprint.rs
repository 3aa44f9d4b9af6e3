//! JWK Thumbprint computation (RFC 7638)

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::jwk::PublicKey;

/// Compute the JWK thumbprint of a public key per RFC 7638
///
/// The thumbprint is SHA-256 of the canonical JSON representation, which
/// holds only the required members in lexicographic order:
/// - EC: `{"crv":"...","kty":"EC","x":"...","y":"..."}`
/// - RSA: `{"e":"...","kty":"RSA","n":"..."}`
pub fn compute_thumbprint(key: &PublicKey) -> String {
    let jwk = key.to_jwk();
    let member = |name: &str| jwk.get(name).and_then(Value::as_str).unwrap_or_default();

    let canonical = match key {
        PublicKey::P256(_) | PublicKey::P384(_) => format!(
            r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
            member("crv"),
            member("x"),
            member("y")
        ),
        PublicKey::Rsa(_) => format!(
            r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
            member("e"),
            member("n")
        ),
    };

    let hash = Sha256::digest(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
