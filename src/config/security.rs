//! State token signing configuration
//!
//! Rotating `secret_key` invalidates every token issued under the old key.
//! Affected clients silently fall back to zero-value state on their next
//! request, so rotate between sessions rather than during them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;

use crate::codec::{SecretKey, StateCodec, RECOMMENDED_KEY_BYTES};

/// Signing settings
#[derive(Clone, Default, PartialEq)]
pub struct SecurityConfig {
    /// HMAC key; `None` means a random key is generated at boot
    pub secret_key: Option<String>,
    /// Reject tokens older than this many seconds (0 = never expire)
    pub max_token_age_secs: u64,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("max_token_age_secs", &self.max_token_age_secs)
            .finish()
    }
}

/// Security settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileSecurity {
    pub secret_key: Option<String>,
    pub max_token_age_secs: Option<u64>,
}

/// Where the signing key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Configured,
    /// Random per boot; tokens do not survive a restart
    Generated,
}

impl SecurityConfig {
    /// Create from file config; `env_key` is `WIREBOUND_SECRET_KEY`
    pub fn from_file(file: Option<FileSecurity>, env_key: Option<String>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            secret_key: env_key.or(file.secret_key),
            max_token_age_secs: file.max_token_age_secs.unwrap_or(0),
        }
    }

    /// Resolve the signing key
    ///
    /// An empty configured key is an error. A short one is accepted with a
    /// warning.
    pub fn secret_key(&self) -> Result<(SecretKey, KeySource)> {
        let Some(configured) = &self.secret_key else {
            let (key, _) = SecretKey::generate();
            tracing::warn!(
                "No secret_key configured; generated a random key. \
                 Issued state tokens will not survive a restart"
            );
            return Ok((key, KeySource::Generated));
        };

        let key = SecretKey::new(configured.as_str())
            .context("Invalid [security] secret_key")?;
        if key.len() < RECOMMENDED_KEY_BYTES {
            tracing::warn!(
                key_bytes = key.len(),
                recommended = RECOMMENDED_KEY_BYTES,
                "Configured secret_key is shorter than recommended"
            );
        }
        Ok((key, KeySource::Configured))
    }

    /// Build the state codec for these settings
    pub fn build_codec(&self) -> Result<(StateCodec, KeySource)> {
        let (key, source) = self.secret_key()?;
        let codec = StateCodec::new(key).with_max_age(self.max_token_age_secs);
        Ok((codec, source))
    }
}
