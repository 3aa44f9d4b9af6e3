//! DBSC client for proof generation

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use p256::ecdsa::signature::{SignatureEncoding, Signer};
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::ClientError;
use crate::jwk::PublicKey;
use crate::thumbprint::compute_thumbprint;
use crate::PROOF_TYPE;

/// Claims a client puts in a DBSC proof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbscClaims {
    /// Endpoint URL the proof is sent to
    pub aud: String,
    /// Server-issued challenge
    pub jti: String,
    /// Issued at timestamp (seconds since Unix epoch)
    pub iat: i64,
    /// Public key as a JWK
    pub key: Value,
    /// Value of the registration header's `authorization` parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    /// Session identifier (refresh proofs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

enum ProofKey {
    Es256(SigningKey),
    Rs256(Box<rsa::pkcs1v15::SigningKey<Sha256>>),
}

/// DBSC client for generating registration and refresh proofs
///
/// The client holds a device key (P-256 for ES256 or RSA for RS256) and
/// answers server challenges with signed proofs carrying the public half.
///
/// # Example
///
/// ```rust
/// use dbsc::DbscClient;
///
/// let client = DbscClient::generate();
/// println!("Thumbprint: {}", client.thumbprint());
///
/// let proof = client.create_registration_proof(
///     "https://example.com/dbsc_start",
///     "challenge-from-server",
///     None,
/// )?;
/// # Ok::<(), dbsc::ClientError>(())
/// ```
pub struct DbscClient {
    key: ProofKey,
    public_key: PublicKey,
    thumbprint: String,
}

impl DbscClient {
    /// Generate a new ES256 client with a random P-256 keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Generate a new RS256 client with a random RSA keypair of `bits` size
    pub fn generate_rsa(bits: usize) -> Result<Self, ClientError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| ClientError::InvalidKey(e.to_string()))?;
        Ok(Self::from_rsa_key(private_key))
    }

    /// Create an ES256 client from an existing signing key
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = PublicKey::P256(p256::PublicKey::from(signing_key.verifying_key()));
        Self::with_key(ProofKey::Es256(signing_key), public_key)
    }

    /// Create an RS256 client from an existing RSA private key
    pub fn from_rsa_key(private_key: RsaPrivateKey) -> Self {
        let public_key = PublicKey::Rsa(private_key.to_public_key());
        let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key);
        Self::with_key(ProofKey::Rs256(Box::new(signing_key)), public_key)
    }

    fn with_key(key: ProofKey, public_key: PublicKey) -> Self {
        let thumbprint = compute_thumbprint(&public_key);
        Self {
            key,
            public_key,
            thumbprint,
        }
    }

    /// JWS algorithm this client signs with
    pub fn algorithm(&self) -> &'static str {
        match self.key {
            ProofKey::Es256(_) => "ES256",
            ProofKey::Rs256(_) => "RS256",
        }
    }

    /// Get the JWK thumbprint of this client's public key
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the public key as a JWK
    pub fn public_key_jwk(&self) -> Value {
        self.public_key.to_jwk()
    }

    /// PEM the server will bind a session to
    pub fn public_key_pem(&self) -> Result<String, ClientError> {
        self.public_key
            .to_pem()
            .map_err(|e| ClientError::InvalidKey(e.to_string()))
    }

    /// Create a proof answering a registration challenge
    ///
    /// # Arguments
    ///
    /// * `audience` - Absolute registration URL (e.g., "https://example.com/dbsc_start")
    /// * `challenge` - Challenge from `Sec-Session-Registration`
    /// * `authorization` - `authorization` parameter from the same header, if any
    pub fn create_registration_proof(
        &self,
        audience: &str,
        challenge: &str,
        authorization: Option<&str>,
    ) -> Result<String, ClientError> {
        self.sign_claims(&DbscClaims {
            aud: audience.to_string(),
            jti: challenge.to_string(),
            iat: Utc::now().timestamp(),
            key: self.public_key_jwk(),
            authorization: authorization.map(String::from),
            sub: None,
        })
    }

    /// Create a proof answering a refresh challenge for `session_id`
    pub fn create_refresh_proof(
        &self,
        audience: &str,
        challenge: &str,
        session_id: &str,
    ) -> Result<String, ClientError> {
        self.sign_claims(&DbscClaims {
            aud: audience.to_string(),
            jti: challenge.to_string(),
            iat: Utc::now().timestamp(),
            key: self.public_key_jwk(),
            authorization: None,
            sub: Some(session_id.to_string()),
        })
    }

    /// Sign `claims` under the standard `dbsc+jwt` header
    pub fn sign_claims<T: Serialize>(&self, claims: &T) -> Result<String, ClientError> {
        let header = serde_json::json!({
            "typ": PROOF_TYPE,
            "alg": self.algorithm(),
        });
        self.sign_token(&header, &serde_json::to_value(claims)?)
    }

    /// Sign an arbitrary header and payload as a compact JWS
    ///
    /// Returns `header.payload.signature`. No checks are made on the header,
    /// so this can also produce proofs a server must reject.
    pub fn sign_token(&self, header: &Value, payload: &Value) -> Result<String, ClientError> {
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);

        let message = format!("{}.{}", header_b64, payload_b64);
        let signature = self.sign(message.as_bytes())?;
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

        Ok(format!("{}.{}", message, sig_b64))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        match &self.key {
            ProofKey::Es256(key) => {
                let signature: Signature = key
                    .try_sign(message)
                    .map_err(|e| ClientError::Signing(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
            ProofKey::Rs256(key) => {
                let signature = key
                    .try_sign(message)
                    .map_err(|e| ClientError::Signing(e.to_string()))?;
                Ok(signature.to_vec())
            }
        }
    }
}
