//! JSON Web Key (JWK) conversion for DBSC proofs
//!
//! A proof carries the client's public key as a JWK in its `key` claim. This
//! module turns that JWK into usable key material and a SubjectPublicKeyInfo
//! PEM string. The PEM is what a session is bound to, so it must come out
//! byte-identical for identical key material.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::ecdsa::signature::Verifier;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde_json::{json, Map, Value};
use sha2::Sha256;

use crate::error::DbscError;

/// Smallest accepted RSA modulus
pub const MIN_RSA_BITS: usize = 2048;

/// Coordinate length for P-256 (32 bytes)
const P256_COORDINATE_LEN: usize = 32;

/// Coordinate length for P-384 (48 bytes)
const P384_COORDINATE_LEN: usize = 48;

/// A public key recovered from a JWK
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// NIST P-256 (usable with ES256)
    P256(p256::PublicKey),
    /// NIST P-384 (convertible, but not accepted by the proof algorithm list)
    P384(p384::PublicKey),
    /// RSA (usable with RS256)
    Rsa(RsaPublicKey),
}

/// Output of converting a JWK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedKey {
    pub public_key: PublicKey,
    /// SubjectPublicKeyInfo PEM with LF line endings
    pub pem: String,
}

/// Convert a JWK object into a public key and its PEM encoding.
///
/// Supports `kty` `EC` (curves `P-256` and `P-384`) and `RSA`.
///
/// # Errors
///
/// - [`DbscError::UnsupportedKeyType`] when `kty` is missing or unknown
/// - [`DbscError::InvalidKeyEncoding`] for bad base64url, an unknown curve, or
///   parameters that do not form a valid key
pub fn convert_jwk(jwk: &Map<String, Value>) -> Result<ConvertedKey, DbscError> {
    let kty = jwk
        .get("kty")
        .and_then(Value::as_str)
        .ok_or_else(|| DbscError::UnsupportedKeyType("missing or invalid kty".to_string()))?;

    let public_key = match kty {
        "EC" => ec_public_key(jwk)?,
        "RSA" => rsa_public_key(jwk)?,
        other => return Err(DbscError::UnsupportedKeyType(other.to_string())),
    };

    let pem = public_key.to_pem()?;
    Ok(ConvertedKey { public_key, pem })
}

impl PublicKey {
    /// Encode as SubjectPublicKeyInfo PEM (`-----BEGIN PUBLIC KEY-----`)
    pub fn to_pem(&self) -> Result<String, DbscError> {
        let pem = match self {
            PublicKey::P256(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::P384(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::Rsa(key) => key.to_public_key_pem(LineEnding::LF),
        };
        pem.map_err(|e| DbscError::InvalidKeyEncoding(format!("PEM encoding failed: {e}")))
    }

    /// Decode a SubjectPublicKeyInfo PEM produced by [`PublicKey::to_pem`]
    pub fn from_pem(pem: &str) -> Result<Self, DbscError> {
        if let Ok(key) = p256::PublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::P256(key));
        }
        if let Ok(key) = p384::PublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::P384(key));
        }
        RsaPublicKey::from_public_key_pem(pem)
            .map(PublicKey::Rsa)
            .map_err(|e| DbscError::InvalidKeyEncoding(format!("unrecognized PEM: {e}")))
    }

    /// Canonical JWK members for this key (no `alg`, `kid` or `use`)
    pub fn to_jwk(&self) -> Value {
        match self {
            PublicKey::P256(key) => {
                let point = key.to_encoded_point(false);
                // SAFETY: Uncompressed points always have x,y coordinates
                let x = point.x().expect("uncompressed point has x");
                let y = point.y().expect("uncompressed point has y");
                json!({
                    "kty": "EC",
                    "crv": "P-256",
                    "x": URL_SAFE_NO_PAD.encode(x),
                    "y": URL_SAFE_NO_PAD.encode(y),
                })
            }
            PublicKey::P384(key) => {
                let point = key.to_encoded_point(false);
                let x = point.x().expect("uncompressed point has x");
                let y = point.y().expect("uncompressed point has y");
                json!({
                    "kty": "EC",
                    "crv": "P-384",
                    "x": URL_SAFE_NO_PAD.encode(x),
                    "y": URL_SAFE_NO_PAD.encode(y),
                })
            }
            PublicKey::Rsa(key) => json!({
                "kty": "RSA",
                "n": URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
            }),
        }
    }

    /// Verify a JWS signature made with `alg` over `message`.
    ///
    /// ES256 expects the raw 64-byte `r || s` form; RS256 expects a PKCS#1
    /// v1.5 signature with SHA-256. An algorithm that does not fit the key
    /// type is a verification failure, never a fallback.
    pub fn verify(&self, alg: &str, message: &[u8], signature: &[u8]) -> Result<(), DbscError> {
        match (alg, self) {
            ("ES256", PublicKey::P256(key)) => {
                let signature = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| DbscError::SignatureInvalid)?;
                p256::ecdsa::VerifyingKey::from(key)
                    .verify(message, &signature)
                    .map_err(|_| DbscError::SignatureInvalid)
            }
            ("RS256", PublicKey::Rsa(key)) => {
                let signature = rsa::pkcs1v15::Signature::try_from(signature)
                    .map_err(|_| DbscError::SignatureInvalid)?;
                rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(|_| DbscError::SignatureInvalid)
            }
            _ => Err(DbscError::SignatureInvalid),
        }
    }

    /// Short name of the key type, for logs
    pub fn describe(&self) -> &'static str {
        match self {
            PublicKey::P256(_) => "EC P-256",
            PublicKey::P384(_) => "EC P-384",
            PublicKey::Rsa(_) => "RSA",
        }
    }
}

fn ec_public_key(jwk: &Map<String, Value>) -> Result<PublicKey, DbscError> {
    let crv = string_param(jwk, "crv")?;
    let x = decode_param(jwk, "x")?;
    let y = decode_param(jwk, "y")?;

    let coordinate_len = match crv {
        "P-256" => P256_COORDINATE_LEN,
        "P-384" => P384_COORDINATE_LEN,
        other => {
            return Err(DbscError::InvalidKeyEncoding(format!(
                "unsupported curve: {other}"
            )))
        }
    };

    if x.len() != coordinate_len || y.len() != coordinate_len {
        return Err(DbscError::InvalidKeyEncoding(format!(
            "{crv} coordinates must be {coordinate_len} bytes"
        )));
    }

    // Build uncompressed point: 0x04 || x || y
    let mut point = Vec::with_capacity(1 + 2 * coordinate_len);
    point.push(0x04);
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);

    let not_on_curve = |_| DbscError::InvalidKeyEncoding(format!("point is not on {crv}"));
    match crv {
        "P-256" => p256::PublicKey::from_sec1_bytes(&point)
            .map(PublicKey::P256)
            .map_err(not_on_curve),
        _ => p384::PublicKey::from_sec1_bytes(&point)
            .map(PublicKey::P384)
            .map_err(not_on_curve),
    }
}

fn rsa_public_key(jwk: &Map<String, Value>) -> Result<PublicKey, DbscError> {
    let n = BigUint::from_bytes_be(&decode_param(jwk, "n")?);
    let e = decode_param(jwk, "e")?;

    if n.bits() < MIN_RSA_BITS {
        return Err(DbscError::InvalidKeyEncoding(format!(
            "RSA modulus is {} bits, at least {MIN_RSA_BITS} required",
            n.bits()
        )));
    }

    RsaPublicKey::new(n, BigUint::from_bytes_be(&e))
        .map(PublicKey::Rsa)
        .map_err(|e| DbscError::InvalidKeyEncoding(format!("invalid RSA parameters: {e}")))
}

fn string_param<'a>(jwk: &'a Map<String, Value>, name: &str) -> Result<&'a str, DbscError> {
    jwk.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| DbscError::InvalidKeyEncoding(format!("missing or invalid {name}")))
}

fn decode_param(jwk: &Map<String, Value>, name: &str) -> Result<Vec<u8>, DbscError> {
    let encoded = string_param(jwk, name)?;
    // Strip any padding characters to handle both padded and unpadded base64url
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|_| DbscError::InvalidKeyEncoding(format!("{name} is not base64url")))?;
    if bytes.is_empty() {
        return Err(DbscError::InvalidKeyEncoding(format!("{name} is empty")));
    }
    Ok(bytes)
}
