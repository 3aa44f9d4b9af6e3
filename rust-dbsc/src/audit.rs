//! Audit events for the DBSC handshake.
//!
//! Events serialize to one JSON object each and are emitted on the
//! `dbsc::audit` tracing target, so subscribers can route them separately
//! from diagnostic logs.

use serde::Serialize;

/// Tracing target for audit events
pub const AUDIT_TARGET: &str = "dbsc::audit";

/// Security-relevant handshake outcomes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum AuditEvent {
    /// Session bound to a device key
    #[serde(rename = "SESSION_REGISTERED")]
    SessionRegistered {
        timestamp: String,
        session_id: String,
        origin: String,
        key_thumbprint: String,
        key_type: String,
    },

    /// Proof of possession accepted for an existing session
    #[serde(rename = "SESSION_REFRESHED")]
    SessionRefreshed {
        timestamp: String,
        session_id: String,
        origin: String,
        key_thumbprint: String,
    },

    /// Registration or refresh proof rejected
    #[serde(rename = "PROOF_REJECTED")]
    ProofRejected {
        timestamp: String,
        endpoint: String,
        session_id: Option<String>,
        error: String,
        reason: String,
    },

    /// Refresh challenge sent for a live session
    #[serde(rename = "REFRESH_CHALLENGE_ISSUED")]
    RefreshChallengeIssued {
        timestamp: String,
        session_id: String,
    },
}

impl AuditEvent {
    pub fn session_registered(
        session_id: &str,
        origin: &str,
        key_thumbprint: &str,
        key_type: &str,
    ) -> Self {
        Self::SessionRegistered {
            timestamp: iso_timestamp(),
            session_id: session_id.to_string(),
            origin: origin.to_string(),
            key_thumbprint: key_thumbprint.to_string(),
            key_type: key_type.to_string(),
        }
    }

    pub fn session_refreshed(session_id: &str, origin: &str, key_thumbprint: &str) -> Self {
        Self::SessionRefreshed {
            timestamp: iso_timestamp(),
            session_id: session_id.to_string(),
            origin: origin.to_string(),
            key_thumbprint: key_thumbprint.to_string(),
        }
    }

    pub fn proof_rejected(endpoint: &str, session_id: Option<&str>, error: &crate::DbscError) -> Self {
        Self::ProofRejected {
            timestamp: iso_timestamp(),
            endpoint: endpoint.to_string(),
            session_id: session_id.map(String::from),
            error: error.kind().to_string(),
            reason: error.to_string(),
        }
    }

    pub fn refresh_challenge_issued(session_id: &str) -> Self {
        Self::RefreshChallengeIssued {
            timestamp: iso_timestamp(),
            session_id: session_id.to_string(),
        }
    }

    /// Emit this event on the audit target.
    pub fn log(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            match self {
                Self::ProofRejected { .. } => {
                    tracing::warn!(target: AUDIT_TARGET, event = self.event_type(), "{}", json)
                }
                _ => tracing::info!(target: AUDIT_TARGET, event = self.event_type(), "{}", json),
            }
        }
    }

    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionRegistered { .. } => "SESSION_REGISTERED",
            Self::SessionRefreshed { .. } => "SESSION_REFRESHED",
            Self::ProofRejected { .. } => "PROOF_REJECTED",
            Self::RefreshChallengeIssued { .. } => "REFRESH_CHALLENGE_ISSUED",
        }
    }
}

/// Get the current timestamp in ISO 8601 format.
fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
