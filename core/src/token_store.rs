//! Persisted token lifecycle.
//!
//! # Design
//! `TokenStore` owns no cached state: every read fetches and decodes the
//! session record from its `KeyValueStore`, every write re-serializes and
//! persists it before returning. Two independent keys hold the session
//! record and the custom header set.
//!
//! Getters that return `Option` are lenient: a backend or decode failure is
//! logged and reported as "absent", which for `is_expired` means expired.
//! Callers that need to tell those cases apart use `record()` and
//! `try_custom_headers()`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TokenStoreError;
use crate::record::{AuthRecord, CustomHeaderSet, DEFAULT_EXPIRES_IN};
use crate::storage::KeyValueStore;

/// Storage keys used for the two persisted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreKeys {
    pub session: String,
    pub custom_header: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            session: "AuthSession".to_string(),
            custom_header: "auth_custom_header".to_string(),
        }
    }
}

/// Session token store over an injected durable backend.
#[derive(Debug)]
pub struct TokenStore<S> {
    storage: S,
    keys: StoreKeys,
    default_expires_in: f64,
}

impl<S: KeyValueStore> TokenStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            keys: StoreKeys::default(),
            default_expires_in: DEFAULT_EXPIRES_IN,
        }
    }

    pub fn with_keys(mut self, keys: StoreKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Lifetime applied by `set_access_token` and `set_client_credentials`.
    pub fn with_default_expiry(mut self, expires_in: f64) -> Self {
        self.default_expires_in = expires_in;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    pub fn default_expires_in(&self) -> f64 {
        self.default_expires_in
    }

    // -----------------------------------------------------------------------
    // Session record
    // -----------------------------------------------------------------------

    /// Load the persisted record, if any.
    pub fn record(&self) -> Result<Option<AuthRecord>, TokenStoreError> {
        let Some(bytes) = self.storage.get(&self.keys.session)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(TokenStoreError::Decode)
    }

    pub fn access_token(&self) -> Option<String> {
        self.lenient_record().and_then(|r| r.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lenient_record().and_then(|r| r.refresh_token)
    }

    /// Store `token` with the default lifetime and stamp it as issued now.
    pub fn set_access_token(&self, token: &str) -> Result<(), TokenStoreError> {
        self.set_access_token_with_expiry(token, self.default_expires_in)
    }

    pub fn set_access_token_with_expiry(
        &self,
        token: &str,
        expires_in: f64,
    ) -> Result<(), TokenStoreError> {
        self.modify(|record| {
            record.access_token = Some(token.to_string());
            record.expires_in = expires_in;
        })
    }

    /// Store base64(`client_id:client_secret`) as the access token, for
    /// endpoints authorized with `AuthScheme::Basic`.
    pub fn set_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), TokenStoreError> {
        self.set_client_credentials_with_expiry(client_id, client_secret, self.default_expires_in)
    }

    pub fn set_client_credentials_with_expiry(
        &self,
        client_id: &str,
        client_secret: &str,
        expires_in: f64,
    ) -> Result<(), TokenStoreError> {
        let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
        self.set_access_token_with_expiry(&encoded, expires_in)
    }

    /// Restart the expiry window with a new lifetime.
    ///
    /// # Errors
    /// `TokenStoreError::NoSession` if no record is stored.
    pub fn update_token_expiry(&self, expires_in: f64) -> Result<(), TokenStoreError> {
        let Some(mut record) = self.record()? else {
            return Err(TokenStoreError::NoSession);
        };
        record.expires_in = expires_in;
        record.updated_date = Some(Utc::now());
        self.write_record(&record)
    }

    /// Replace the whole record. `updated_date` is stamped with now when the
    /// caller left it empty.
    pub fn update_from_record(&self, mut record: AuthRecord) -> Result<(), TokenStoreError> {
        record.stamp_if_missing(Utc::now());
        self.write_record(&record)
    }

    /// Replace the record from an untyped JSON mapping such as a raw token
    /// endpoint response. The mapping is fully decoded before anything is
    /// written.
    pub fn update_from_untyped(&self, mapping: &serde_json::Value) -> Result<(), TokenStoreError> {
        let record = AuthRecord::deserialize(mapping).map_err(TokenStoreError::Decode)?;
        self.update_from_record(record)
    }

    /// Remove the session record and the custom header set. Safe to repeat.
    pub fn clear(&self) -> Result<(), TokenStoreError> {
        self.storage.remove(&self.keys.session)?;
        self.storage.remove(&self.keys.custom_header)?;
        debug!("cleared auth session and custom headers");
        Ok(())
    }

    /// `true` if there is no usable record or its lifetime has elapsed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.lenient_record()
            .map_or(true, |record| record.is_expired_at(now))
    }

    // -----------------------------------------------------------------------
    // Custom headers
    // -----------------------------------------------------------------------

    pub fn try_custom_headers(&self) -> Result<Option<CustomHeaderSet>, TokenStoreError> {
        let Some(bytes) = self.storage.get(&self.keys.custom_header)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(TokenStoreError::Decode)
    }

    pub fn custom_headers(&self) -> Option<CustomHeaderSet> {
        self.try_custom_headers().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable custom header set");
            None
        })
    }

    pub fn set_custom_headers(&self, headers: &CustomHeaderSet) -> Result<(), TokenStoreError> {
        let bytes = serde_json::to_vec(headers).map_err(TokenStoreError::Encode)?;
        self.storage.set(&self.keys.custom_header, &bytes)?;
        debug!(count = headers.len(), "persisted custom header set");
        Ok(())
    }

    pub fn clear_custom_headers(&self) -> Result<(), TokenStoreError> {
        self.storage.remove(&self.keys.custom_header)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lenient_record(&self) -> Option<AuthRecord> {
        self.record().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable auth session");
            None
        })
    }

    /// Read-modify-write that creates the record if needed and stamps now.
    /// An undecodable stored record is replaced rather than blocking writes.
    fn modify(&self, apply: impl FnOnce(&mut AuthRecord)) -> Result<(), TokenStoreError> {
        let mut record = match self.record() {
            Ok(existing) => existing.unwrap_or_default(),
            Err(TokenStoreError::Decode(e)) => {
                warn!(error = %e, "replacing undecodable auth session");
                AuthRecord::default()
            }
            Err(e) => return Err(e),
        };
        apply(&mut record);
        record.updated_date = Some(Utc::now());
        self.write_record(&record)
    }

    fn write_record(&self, record: &AuthRecord) -> Result<(), TokenStoreError> {
        let bytes = serde_json::to_vec(record).map_err(TokenStoreError::Encode)?;
        self.storage.set(&self.keys.session, &bytes)?;
        debug!(
            has_access_token = record.access_token.is_some(),
            has_refresh_token = record.refresh_token.is_some(),
            expires_in = record.expires_in,
            "persisted auth session"
        );
        Ok(())
    }
}
