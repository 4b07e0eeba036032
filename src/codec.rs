//! Tamper-evident state tokens
//!
//! A component's state travels between requests inside the envelope, never in
//! server memory. The token format is:
//!
//! ```text
//! base64url({"id": "...", "state": {...}, "timestamp": 1700000000}) "." hex(HMAC-SHA256(key, <first segment>))
//! ```
//!
//! The signature covers the *encoded* segment, so verification never has to
//! parse attacker-controlled JSON before the MAC has been checked.
//!
//! # Key rotation
//!
//! The key is configuration, not global state. Restarting with a different key
//! (or with no key configured, which generates a random one per boot)
//! invalidates every outstanding token. Clients holding such tokens silently
//! fall back to zero-value state on their next request.

use crate::component::StateSnapshot;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Separator between the encoded payload and the signature
const SEPARATOR: char = '.';

/// Length of a lowercase hex HMAC-SHA256 signature
const SIGNATURE_HEX_LEN: usize = 64;

/// Keys shorter than this are accepted but flagged at boot
pub const RECOMMENDED_KEY_BYTES: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Secret Key
// ─────────────────────────────────────────────────────────────────────────────

/// HMAC key material
///
/// The key is the raw bytes of the configured string. `Debug` never prints it.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Use a configured key string as-is
    pub fn new(key: impl Into<String>) -> Result<Self, TokenError> {
        let key = key.into();
        if key.is_empty() {
            return Err(TokenError::EmptyKey);
        }
        Ok(Self(key.into_bytes()))
    }

    /// Generate a fresh random key, returned together with its hex form
    ///
    /// The hex string is what gets persisted in config; the key material is
    /// the bytes of that string, so a generated key behaves exactly like one
    /// pasted into `secret_key`.
    pub fn generate() -> (Self, String) {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let hex = to_hex(&bytes);
        (Self(hex.clone().into_bytes()), hex)
    }

    /// Length of the key material in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes>)", self.0.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a token was refused
///
/// Callers outside this module only ever see `None` from
/// [`StateCodec::deserialize`]; the variants exist for logging.
#[derive(Debug)]
pub enum TokenError {
    /// Not exactly two `.`-separated segments
    Malformed,
    /// Signature length or content mismatch
    BadSignature,
    /// Signed correctly but outside the configured age window
    Expired { age_secs: i64 },
    /// Payload segment is not valid base64url
    Encoding(String),
    /// Payload JSON could not be produced or parsed
    Json(String),
    /// A secret key must not be empty
    EmptyKey,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "Malformed token"),
            Self::BadSignature => write!(f, "Token signature mismatch"),
            Self::Expired { age_secs } => write!(f, "Token expired ({}s old)", age_secs),
            Self::Encoding(msg) => write!(f, "Token encoding error: {}", msg),
            Self::Json(msg) => write!(f, "Token JSON error: {}", msg),
            Self::EmptyKey => write!(f, "Secret key must not be empty"),
        }
    }
}

impl std::error::Error for TokenError {}

// ─────────────────────────────────────────────────────────────────────────────
// Token body
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct TokenBody {
    id: String,
    state: StateSnapshot,
    timestamp: i64,
}

#[derive(Deserialize)]
struct TokenId {
    id: String,
}

/// A verified token, unpacked
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub component_id: String,
    pub state: StateSnapshot,
    /// Unix seconds at signing time
    pub timestamp: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Signs and verifies state tokens under one key
#[derive(Debug, Clone)]
pub struct StateCodec {
    key: SecretKey,
    /// Maximum token age in seconds; `None` disables expiry
    max_age_secs: Option<u64>,
}

impl StateCodec {
    pub fn new(key: SecretKey) -> Self {
        Self {
            key,
            max_age_secs: None,
        }
    }

    /// Refuse tokens older than `secs` (0 disables the check)
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = (secs > 0).then_some(secs);
        self
    }

    /// Sign `state` for `component_id`, stamped with the current time
    pub fn serialize(&self, component_id: &str, state: &StateSnapshot) -> Result<String, TokenError> {
        self.serialize_at(component_id, state, Utc::now().timestamp())
    }

    pub(crate) fn serialize_at(
        &self,
        component_id: &str,
        state: &StateSnapshot,
        timestamp: i64,
    ) -> Result<String, TokenError> {
        let body = TokenBody {
            id: component_id.to_string(),
            state: state.clone(),
            timestamp,
        };
        let json = serde_json::to_vec(&body).map_err(|e| TokenError::Json(e.to_string()))?;
        let encoded = URL_SAFE_NO_PAD.encode(json);
        let signature = self.sign(&encoded);
        Ok(format!("{}{}{}", encoded, SEPARATOR, signature))
    }

    /// Verify a token and return the embedded state
    ///
    /// Any failure (shape, signature, age, encoding) yields `None`. The reason
    /// is logged at debug level only.
    pub fn deserialize(&self, token: &str) -> Option<StateSnapshot> {
        match self.verify(token) {
            Ok(verified) => Some(verified.state),
            Err(e) => {
                tracing::debug!(reason = %e, "Rejected state token");
                None
            }
        }
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub(crate) fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedToken, TokenError> {
        let (encoded, signature) = split_token(token)?;

        let expected = self.sign(encoded);
        if !signatures_match(&expected, signature) {
            return Err(TokenError::BadSignature);
        }

        let body: TokenBody = decode_segment(encoded)?;

        if let Some(max_age) = self.max_age_secs {
            let age_secs = now.saturating_sub(body.timestamp);
            // Tokens from the future are as suspicious as stale ones
            if age_secs.unsigned_abs() > max_age {
                return Err(TokenError::Expired { age_secs });
            }
        }

        Ok(VerifiedToken {
            component_id: body.id,
            state: body.state,
            timestamp: body.timestamp,
        })
    }

    /// Read the component id without checking the signature
    ///
    /// For routing and log context only. Never base a trust decision on it.
    pub fn extract_component_id(token: &str) -> Option<String> {
        let (encoded, _) = split_token(token).ok()?;
        decode_segment::<TokenId>(encoded).ok().map(|t| t.id)
    }

    fn sign(&self, encoded: &str) -> String {
        // HMAC accepts keys of any length, so this cannot fail in practice
        let mut mac = match HmacSha256::new_from_slice(self.key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(encoded.as_bytes());
        to_hex(&mac.finalize().into_bytes())
    }
}

fn split_token(token: &str) -> Result<(&str, &str), TokenError> {
    let mut parts = token.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(encoded), Some(signature), None) if !encoded.is_empty() => Ok((encoded, signature)),
        _ => Err(TokenError::Malformed),
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(encoded: &str) -> Result<T, TokenError> {
    let json = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| TokenError::Encoding(e.to_string()))?;
    serde_json::from_slice(&json).map_err(|e| TokenError::Json(e.to_string()))
}

/// Compare two hex signatures in constant time
///
/// Length is not secret: a length mismatch rejects immediately.
fn signatures_match(expected: &str, provided: &str) -> bool {
    if expected.len() != SIGNATURE_HEX_LEN || provided.len() != expected.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        s.push_str(&format!("{byte:02x}"));
    }
    s
}
