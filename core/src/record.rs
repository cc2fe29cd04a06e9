//! Persisted session data and the per-request auth declaration.
//!
//! # Design
//! `AuthRecord` mirrors the JSON layout stored under the session key
//! (`access_token`, `refresh_token`, `token_type`, `updated_date`,
//! `expires_in`). Every field tolerates absence and unknown keys are ignored,
//! so a raw OAuth token response decodes straight into a record.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Token lifetime applied when none is given.
pub const DEFAULT_EXPIRES_IN: f64 = 3600.0;

fn default_expires_in() -> f64 {
    DEFAULT_EXPIRES_IN
}

/// `null` counts as absent, as token endpoints send it for "unspecified".
fn expires_in_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_EXPIRES_IN))
}

/// Token and expiry bundle for the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRecord {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// When the record was last written. `None` means "treat as expired".
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
    /// Lifetime in seconds, counted from `updated_date`.
    #[serde(default = "default_expires_in", deserialize_with = "expires_in_or_default")]
    pub expires_in: f64,
}

impl Default for AuthRecord {
    fn default() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            token_type: None,
            updated_date: None,
            expires_in: DEFAULT_EXPIRES_IN,
        }
    }
}

impl AuthRecord {
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Lifetime as a `TimeDelta` at microsecond resolution. Negative or NaN
    /// lifetimes saturate to zero.
    pub fn lifetime(&self) -> TimeDelta {
        let micros = (self.expires_in * 1_000_000.0) as i64;
        TimeDelta::microseconds(micros.max(0))
    }

    /// Instant after which the record counts as expired.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.updated_date
            .and_then(|updated| updated.checked_add_signed(self.lifetime()))
    }

    /// `true` when no timestamp is recorded or more than `expires_in`
    /// seconds have elapsed since it. Exactly `expires_in` is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.updated_date {
            Some(updated) => now.signed_duration_since(updated) > self.lifetime(),
            None => true,
        }
    }

    /// Fill in `updated_date` if the caller left it empty.
    pub(crate) fn stamp_if_missing(&mut self, now: DateTime<Utc>) {
        if self.updated_date.is_none() {
            self.updated_date = Some(now);
        }
    }
}

/// Header name to value mapping sent verbatim for `AuthScheme::Custom`.
pub type CustomHeaderSet = BTreeMap<String, String>;

/// How a request wants to be authorized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: Bearer <access token>`
    Bearer,
    /// `Authorization: Basic <access token>`; the token is stored pre-encoded.
    Basic,
    /// The stored `CustomHeaderSet`.
    Custom,
    #[default]
    None,
}
