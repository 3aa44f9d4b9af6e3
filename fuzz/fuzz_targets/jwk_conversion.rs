//! Fuzz target for JWK to public key conversion and claim parsing

#![no_main]

use dbsc::{convert_jwk, parse_proof_claims};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(data) else {
        return;
    };

    if let Ok(converted) = convert_jwk(&map) {
        // The PEM must read back as the same key
        let reparsed = dbsc::PublicKey::from_pem(&converted.pem).ok();
        assert_eq!(reparsed, Some(converted.public_key));
    }

    let _ = parse_proof_claims(&map);
});
