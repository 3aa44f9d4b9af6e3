//! Claim extraction for DBSC proof payloads

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DbscError;
use crate::jwk::{convert_jwk, PublicKey};
use crate::thumbprint::compute_thumbprint;

/// Audience claim: single string or array of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringOrVec {
    String(String),
    Vec(Vec<String>),
}

impl From<StringOrVec> for Vec<String> {
    fn from(value: StringOrVec) -> Self {
        match value {
            StringOrVec::String(s) => vec![s],
            StringOrVec::Vec(v) => v,
        }
    }
}

/// Claims of a DBSC proof, with the embedded key already converted
#[derive(Debug, Clone)]
pub struct DbscProof {
    /// Audience list, never empty
    pub audience: Vec<String>,
    /// Challenge the proof answers
    pub jti: String,
    /// Issued-at, whole seconds
    pub issued_at: DateTime<Utc>,
    /// Embedded JWK as submitted
    pub key: Map<String, Value>,
    /// Authorization value echoed from the registration header
    pub authorization: Option<String>,
    /// Session identifier (refresh proofs)
    pub subject: Option<String>,
    /// Key recovered from `key`
    pub public_key: PublicKey,
    /// SPKI PEM of `public_key`
    pub pem: String,
}

impl DbscProof {
    /// RFC 7638 thumbprint of the proof key
    pub fn thumbprint(&self) -> String {
        compute_thumbprint(&self.public_key)
    }

    /// Whether `audience` is an exact member of the audience list
    pub fn has_audience(&self, audience: &str) -> bool {
        self.audience.iter().any(|a| a == audience)
    }
}

/// Extract and type-check the claims of a proof payload.
///
/// Fields are checked in the order aud, jti, iat, key, authorization, sub and
/// the first failure is returned.
pub fn parse_proof_claims(claims: &Map<String, Value>) -> Result<DbscProof, DbscError> {
    let audience = parse_audience(claims)?;
    let jti = required_string(claims, "jti")?;
    let issued_at = parse_issued_at(claims)?;

    let key = match claims.get("key") {
        None => return Err(DbscError::MissingClaim("key")),
        Some(Value::Object(key)) => key.clone(),
        Some(_) => return Err(DbscError::InvalidClaimType("key")),
    };
    let converted = convert_jwk(&key)?;

    let authorization = optional_string(claims, "authorization")?;
    let subject = optional_string(claims, "sub")?;

    Ok(DbscProof {
        audience,
        jti,
        issued_at,
        key,
        authorization,
        subject,
        public_key: converted.public_key,
        pem: converted.pem,
    })
}

fn parse_audience(claims: &Map<String, Value>) -> Result<Vec<String>, DbscError> {
    let value = claims.get("aud").ok_or(DbscError::MissingClaim("aud"))?;
    let audience: Vec<String> = StringOrVec::deserialize(value)
        .map_err(|_| DbscError::InvalidClaimType("aud"))?
        .into();

    if audience.is_empty() {
        return Err(DbscError::InvalidClaimType("aud"));
    }
    Ok(audience)
}

fn parse_issued_at(claims: &Map<String, Value>) -> Result<DateTime<Utc>, DbscError> {
    let invalid = || DbscError::InvalidClaimType("iat");

    let seconds = match claims.get("iat") {
        None => return Err(DbscError::MissingClaim("iat")),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(secs) => secs,
            None => float_seconds(n.as_f64().ok_or_else(invalid)?).ok_or_else(invalid)?,
        },
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<i64>() {
                secs
            } else if let Ok(secs) = s.parse::<f64>() {
                float_seconds(secs).ok_or_else(invalid)?
            } else {
                return DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| invalid());
            }
        }
        Some(_) => return Err(invalid()),
    };

    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(invalid)
}

/// Truncate a float timestamp to whole seconds
fn float_seconds(secs: f64) -> Option<i64> {
    if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(secs.trunc() as i64)
}

fn required_string(claims: &Map<String, Value>, field: &'static str) -> Result<String, DbscError> {
    optional_string(claims, field)?.ok_or(DbscError::MissingClaim(field))
}

fn optional_string(
    claims: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DbscError> {
    match claims.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DbscError::InvalidClaimType(field)),
    }
}
