//! DBSC HTTP header values
//!
//! `Sec-Session-Registration` and `Sec-Session-Challenge` are RFC 8941
//! structured field lists. Only the subset DBSC uses is handled: sf-string
//! and token items, inner lists of tokens, and parameters with string or
//! token values.

use tracing::warn;

use crate::error::ClientError;

/// Response header announcing a registration endpoint and challenge
pub const SEC_SESSION_REGISTRATION: &str = "sec-session-registration";

/// Request header carrying a signed proof
pub const SEC_SESSION_RESPONSE: &str = "sec-session-response";

/// Response header carrying a refresh challenge
pub const SEC_SESSION_CHALLENGE: &str = "sec-session-challenge";

/// Request header naming the session being refreshed
pub const SEC_SESSION_ID: &str = "sec-session-id";

/// `Sec-Session-Registration` value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationHeader {
    /// Accepted algorithms, in preference order
    pub algorithms: Vec<String>,
    /// Registration endpoint path
    pub path: String,
    pub challenge: String,
    pub authorization: Option<String>,
    /// Session provider public key, for federated sessions
    pub provider_key: Option<String>,
    /// Session id at the provider
    pub provider_id: Option<String>,
    pub provider_url: Option<String>,
}

impl RegistrationHeader {
    /// Serialize, e.g. `(ES256 RS256);path="/dbsc_start";challenge="abc"`
    pub fn to_header_value(&self) -> String {
        let mut out = format!("({})", self.algorithms.join(" "));
        push_string_param(&mut out, "path", &self.path);
        push_string_param(&mut out, "challenge", &self.challenge);
        for (key, value) in [
            ("authorization", &self.authorization),
            ("provider_key", &self.provider_key),
            ("provider_id", &self.provider_id),
            ("provider_url", &self.provider_url),
        ] {
            if let Some(value) = value {
                push_string_param(&mut out, key, value);
            }
        }
        out
    }

    /// Parse the first registration entry of a header value
    pub fn parse(value: &str) -> Result<Self, ClientError> {
        let invalid = |reason: &str| ClientError::InvalidServerHeader {
            header: "Sec-Session-Registration",
            reason: reason.to_string(),
        };

        let members = parse_list(value).map_err(|e| invalid(e.as_str()))?;
        let member = members.into_iter().next().ok_or_else(|| invalid("empty list"))?;
        let header = Self {
            algorithms: Vec::new(),
            path: member.param("path").ok_or_else(|| invalid("missing path"))?,
            challenge: member
                .param("challenge")
                .ok_or_else(|| invalid("missing challenge"))?,
            authorization: member.param("authorization"),
            provider_key: member.param("provider_key"),
            provider_id: member.param("provider_id"),
            provider_url: member.param("provider_url"),
        };

        match member.item {
            Item::InnerList(algorithms) => Ok(Self { algorithms, ..header }),
            _ => Err(invalid("expected an inner list of algorithms")),
        }
    }
}

/// `Sec-Session-Challenge` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeHeader {
    pub challenge: String,
    /// Session the challenge is scoped to
    pub session_id: Option<String>,
}

impl ChallengeHeader {
    /// Serialize, e.g. `"abc";id="session"`
    pub fn to_header_value(&self) -> String {
        let mut out = sf_string(&self.challenge);
        if let Some(session_id) = &self.session_id {
            push_string_param(&mut out, "id", session_id);
        }
        out
    }

    /// Parse every challenge in a header value
    pub fn parse(value: &str) -> Result<Vec<Self>, ClientError> {
        let invalid = |reason: String| ClientError::InvalidServerHeader {
            header: "Sec-Session-Challenge",
            reason,
        };

        parse_list(value)
            .map_err(invalid)?
            .into_iter()
            .map(|member| {
                let session_id = member.param("id");
                match member.item {
                    Item::String(challenge) => Ok(Self {
                        challenge,
                        session_id,
                    }),
                    _ => Err(invalid("expected a string challenge".to_string())),
                }
            })
            .collect()
    }
}

/// Serialize an sf-string.
///
/// `\` and `"` are escaped; characters outside printable ASCII cannot be
/// represented and are dropped with a warning.
pub fn sf_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let mut dropped = 0usize;
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => dropped += 1,
        }
    }
    out.push('"');

    if dropped > 0 {
        warn!(dropped, "Dropped characters not representable in a structured field string");
    }
    out
}

fn push_string_param(out: &mut String, key: &str, value: &str) {
    out.push(';');
    out.push_str(key);
    out.push('=');
    out.push_str(&sf_string(value));
}

#[derive(Debug, PartialEq)]
enum Item {
    String(String),
    Token(String),
    InnerList(Vec<String>),
}

#[derive(Debug)]
struct Member {
    item: Item,
    params: Vec<(String, Item)>,
}

impl Member {
    fn param(&self, key: &str) -> Option<String> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| match v {
                Item::String(s) | Item::Token(s) => Some(s.clone()),
                Item::InnerList(_) => None,
            })
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

fn parse_list(value: &str) -> Result<Vec<Member>, String> {
    let mut parser = Parser {
        input: value.as_bytes(),
        pos: 0,
    };
    let mut members = Vec::new();

    parser.skip_whitespace();
    while !parser.at_end() {
        members.push(parser.member()?);
        parser.skip_whitespace();
        if parser.at_end() {
            break;
        }
        parser.expect(b',')?;
        parser.skip_whitespace();
        if parser.at_end() {
            return Err("trailing comma".to_string());
        }
    }
    Ok(members)
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), String> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", byte as char, self.pos))
        }
    }

    fn member(&mut self) -> Result<Member, String> {
        let item = if self.peek() == Some(b'(') {
            self.inner_list()?
        } else {
            self.bare_item()?
        };

        let mut params = Vec::new();
        while self.peek() == Some(b';') {
            self.pos += 1;
            self.skip_whitespace();
            let key = self.key()?;
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.bare_item()?
            } else {
                Item::Token("?1".to_string())
            };
            params.push((key, value));
        }
        Ok(Member { item, params })
    }

    fn inner_list(&mut self) -> Result<Item, String> {
        self.expect(b'(')?;
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(Item::InnerList(tokens));
            }
            match self.bare_item()? {
                Item::Token(t) | Item::String(t) => tokens.push(t),
                Item::InnerList(_) => return Err("nested inner list".to_string()),
            }
            if !matches!(self.peek(), Some(b' ' | b')')) {
                return Err(format!("unterminated inner list at offset {}", self.pos));
            }
        }
    }

    fn bare_item(&mut self) -> Result<Item, String> {
        match self.peek() {
            Some(b'"') => self.string().map(Item::String),
            Some(c) if c.is_ascii_alphanumeric() || c == b'*' => Ok(Item::Token(self.token())),
            Some(c) => Err(format!("unexpected '{}' at offset {}", c as char, self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn string(&mut self) -> Result<String, String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string".to_string()),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c @ (b'"' | b'\\')) => {
                            out.push(c as char);
                            self.pos += 1;
                        }
                        _ => return Err("invalid escape in string".to_string()),
                    }
                }
                Some(c @ 0x20..=0x7e) => {
                    out.push(c as char);
                    self.pos += 1;
                }
                Some(_) => return Err("non-printable character in string".to_string()),
            }
        }
    }

    fn token(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~:/".contains(&c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn key(&mut self) -> Result<String, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || b"_-.*".contains(&c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(format!("expected parameter key at offset {}", self.pos));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }
}
