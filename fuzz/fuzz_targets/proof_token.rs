//! Fuzz target for DBSC proof verification
//!
//! Proofs arrive in a request header from an untrusted client; verification
//! must reject garbage without panicking.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use dbsc::{ProofVerifier, SessionAuthority};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzProofInput {
    /// Compact JWS as sent in Sec-Session-Response
    proof: String,
    /// Expected endpoint URL
    audience: String,
    /// Session id for the refresh path
    session_id: String,
    /// Whether the authority accepts every challenge
    challenges_live: bool,
}

struct FuzzAuthority {
    challenges_live: bool,
}

impl SessionAuthority for FuzzAuthority {
    fn is_challenge_live(&self, _challenge: &str) -> bool {
        self.challenges_live
    }

    fn is_session_bound_to(&self, _session_id: &str, _pem: &str) -> bool {
        true
    }
}

fuzz_target!(|input: FuzzProofInput| {
    let verifier = ProofVerifier::new(Arc::new(FuzzAuthority {
        challenges_live: input.challenges_live,
    }));

    let _ = verifier.verify_proof(&input.proof, &input.audience);
    let _ = verifier.verify_refresh_proof(&input.proof, &input.audience, &input.session_id);
});
