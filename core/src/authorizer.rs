//! Per-request authorization decision.
//!
//! # Design
//! `Authorizer` is a pure decision over the token store: it never refreshes
//! anything itself. An endpoint that opts into validity checking with an
//! expired (or missing) session gets `Authorization::RefreshRequired` and the
//! caller owns the refresh flow. Everything else proceeds with the scheme's
//! headers merged over the ones the request declared.

use std::sync::Arc;

use tracing::debug;

use crate::http::HttpRequest;
use crate::record::AuthScheme;
use crate::request::ApiRequest;
use crate::storage::KeyValueStore;
use crate::token_store::TokenStore;

pub const AUTHORIZATION: &str = "Authorization";

/// Outcome of `Authorizer::authorize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Obtain a new token and resubmit; nothing was sent.
    RefreshRequired,
    /// Send this request as-is.
    Proceed(HttpRequest),
}

impl Authorization {
    pub fn is_refresh_required(&self) -> bool {
        matches!(self, Authorization::RefreshRequired)
    }
}

/// Decides whether requests may go out and what auth headers they carry.
#[derive(Debug)]
pub struct Authorizer<S> {
    store: Arc<TokenStore<S>>,
}

impl<S> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> Authorizer<S> {
    pub fn new(store: Arc<TokenStore<S>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TokenStore<S> {
        &self.store
    }

    pub fn authorize(&self, request: ApiRequest) -> Authorization {
        if request.check_validity && self.store.is_expired() {
            debug!(url = %request.url, "token expired, refresh required");
            return Authorization::RefreshRequired;
        }
        let computed = self.auth_headers(request.auth_scheme);
        let mut http = request.into_http();
        merge_headers(&mut http.headers, computed);
        Authorization::Proceed(http)
    }

    /// Headers the scheme contributes with the current stored state. Empty
    /// when the token or custom header set is missing.
    pub fn auth_headers(&self, scheme: AuthScheme) -> Vec<(String, String)> {
        match scheme {
            AuthScheme::Bearer => self
                .store
                .access_token()
                .map(|token| vec![(AUTHORIZATION.to_string(), format!("Bearer {token}"))])
                .unwrap_or_default(),
            AuthScheme::Basic => self
                .store
                .access_token()
                .map(|token| vec![(AUTHORIZATION.to_string(), format!("Basic {token}"))])
                .unwrap_or_default(),
            AuthScheme::Custom => self
                .store
                .custom_headers()
                .map(|headers| headers.into_iter().collect())
                .unwrap_or_default(),
            AuthScheme::None => Vec::new(),
        }
    }
}

/// Merge `computed` into `existing`. A computed header replaces every
/// existing header with the same name (ASCII case-insensitive), keeping the
/// position of the first one; unknown names are appended.
pub fn merge_headers(existing: &mut Vec<(String, String)>, computed: Vec<(String, String)>) {
    for (name, value) in computed {
        let mut replaced = false;
        existing.retain_mut(|(k, v)| {
            if !k.eq_ignore_ascii_case(&name) {
                return true;
            }
            if replaced {
                return false;
            }
            replaced = true;
            k.clone_from(&name);
            v.clone_from(&value);
            true
        });
        if !replaced {
            existing.push((name, value));
        }
    }
}
