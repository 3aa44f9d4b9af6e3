//! Fuzz target for the structured header parsers

#![no_main]

use dbsc::{ChallengeHeader, RegistrationHeader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = std::str::from_utf8(data) {
        if let Ok(registration) = RegistrationHeader::parse(value) {
            let _ = RegistrationHeader::parse(&registration.to_header_value());
        }

        if let Ok(challenges) = ChallengeHeader::parse(value) {
            for challenge in challenges {
                let _ = ChallengeHeader::parse(&challenge.to_header_value());
            }
        }
    }
});
