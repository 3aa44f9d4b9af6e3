//! Session instruction document returned on registration and refresh

use serde::{Deserialize, Serialize};

/// JSON body telling the browser how to maintain a bound session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInstruction {
    pub session_identifier: String,
    pub refresh_url: String,
    #[serde(rename = "continue")]
    pub continue_session: bool,
    pub scope: SessionScope,
    pub credentials: Vec<SessionCredential>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_refresh_initiators: Vec<String>,
}

/// Origin and URLs the session covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    pub include_site: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope_specification: Vec<ScopeSpecification>,
}

/// Include or exclude rule within a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSpecification {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub domain: String,
    pub path: String,
}

/// Cookie the browser must keep alive through refreshes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attributes: String,
}

impl SessionInstruction {
    /// Instruction covering the whole site of `origin`, with one cookie credential
    pub fn new(
        session_identifier: impl Into<String>,
        refresh_url: impl Into<String>,
        origin: impl Into<String>,
        cookie_name: impl Into<String>,
        cookie_attributes: impl Into<String>,
    ) -> Self {
        Self {
            session_identifier: session_identifier.into(),
            refresh_url: refresh_url.into(),
            continue_session: true,
            scope: SessionScope {
                origin: origin.into(),
                include_site: true,
                scope_specification: Vec::new(),
            },
            credentials: vec![SessionCredential::cookie(cookie_name, cookie_attributes)],
            allowed_refresh_initiators: Vec::new(),
        }
    }
}

impl SessionCredential {
    pub fn cookie(name: impl Into<String>, attributes: impl Into<String>) -> Self {
        Self {
            credential_type: "cookie".to_string(),
            name: name.into(),
            attributes: attributes.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instruction_serialization() {
        let instruction = SessionInstruction::new(
            "sid",
            "/dbsc_refresh",
            "https://host",
            "dbsc_cookie",
            "SameSite=Lax",
        );

        assert_eq!(
            serde_json::to_value(&instruction).unwrap(),
            json!({
                "session_identifier": "sid",
                "refresh_url": "/dbsc_refresh",
                "continue": true,
                "scope": {"origin": "https://host", "include_site": true},
                "credentials": [
                    {"type": "cookie", "name": "dbsc_cookie", "attributes": "SameSite=Lax"}
                ]
            })
        );
    }

    #[test]
    fn test_optional_members_present_when_set() {
        let mut instruction =
            SessionInstruction::new("sid", "/r", "", "dbsc_cookie", "");
        instruction.allowed_refresh_initiators = vec!["accounts.example.com".into()];
        instruction.scope.scope_specification = vec![ScopeSpecification {
            rule_type: "exclude".into(),
            domain: "example.com".into(),
            path: "/static".into(),
        }];

        let value = serde_json::to_value(&instruction).unwrap();
        assert!(value["scope"].get("origin").is_none());
        assert!(value["credentials"][0].get("attributes").is_none());
        assert_eq!(value["allowed_refresh_initiators"], json!(["accounts.example.com"]));
        assert_eq!(value["scope"]["scope_specification"][0]["type"], "exclude");

        let parsed: SessionInstruction = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, instruction);
    }
}
