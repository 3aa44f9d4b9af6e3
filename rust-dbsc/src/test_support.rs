//! Shared fixtures for unit tests

use once_cell::sync::Lazy;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

static RSA_KEY_A: Lazy<RsaPrivateKey> = Lazy::new(|| {
    RsaPrivateKey::from_pkcs8_pem(include_str!("../tests/fixtures/rsa_2048_a.pem"))
        .expect("fixture key a")
});

static RSA_KEY_B: Lazy<RsaPrivateKey> = Lazy::new(|| {
    RsaPrivateKey::from_pkcs8_pem(include_str!("../tests/fixtures/rsa_2048_b.pem"))
        .expect("fixture key b")
});

/// 2048-bit RSA key, loaded once (generation is slow in debug builds)
pub fn rsa_key_a() -> RsaPrivateKey {
    RSA_KEY_A.clone()
}

/// A second, distinct 2048-bit RSA key
pub fn rsa_key_b() -> RsaPrivateKey {
    RSA_KEY_B.clone()
}
