//! Token persistence and request authorization for API clients.
//!
//! # Overview
//! Keeps one OAuth-style session record in a durable key-value backend,
//! decides per request whether the call may go out or the caller must
//! refresh first, and attaches the matching auth headers. Sending the
//! request stays with the host: either through a `Transport` driven by
//! `Dispatcher`, or by executing the `HttpRequest` the authorizer returns.
//!
//! # Design
//! - `TokenStore` is an explicit object over an injected `KeyValueStore`, not
//!   a process global. It caches nothing: reads hit storage, writes persist
//!   before returning.
//! - Requests declare `auth_scheme` and `check_validity` as plain data on
//!   `ApiRequest`.
//! - An expired session is a value (`Authorization::RefreshRequired`), never
//!   an error.
//! - Reachability is pushed in by the host's OS monitor and exposed as a
//!   watch channel.

pub mod authorizer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod reachability;
pub mod record;
pub mod request;
pub mod storage;
pub mod token_store;

pub use authorizer::{merge_headers, Authorization, Authorizer};
pub use config::{AuthnetConfig, StorageBackend, StorageConfig};
pub use dispatch::{
    Dispatch, DispatchEvent, DispatchHandle, Dispatcher, Progress, ProgressSink, Transport,
};
pub use error::{ConfigError, DispatchError, StorageError, TokenStoreError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use reachability::{ConnectionSource, Connectivity, Reachability, ReachabilityState};
pub use record::{AuthRecord, AuthScheme, CustomHeaderSet, DEFAULT_EXPIRES_IN};
pub use request::ApiRequest;
#[cfg(feature = "keychain")]
pub use storage::KeychainStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use token_store::{StoreKeys, TokenStore};
