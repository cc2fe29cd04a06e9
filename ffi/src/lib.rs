//! C-ABI wrapper around `authnet-core`.
//!
//! # Overview
//! Exposes the token store and request authorizer through `extern "C"`
//! functions so a mobile host can keep its session in Rust while sending
//! requests with its own HTTP stack.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Fallible calls return an `FfiErrorCode`; `authnet_authorize` returns an
//!   `FfiAuthorizeResult` envelope instead.
//! - Lifetimes are `double` seconds. A negative or non-finite value selects
//!   the store's default lifetime.
//! - The C caller owns all returned pointers and must call the matching
//!   `authnet_free_*` function to release them.

pub mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use authnet_core::{
    AuthnetConfig, Authorization, Authorizer, CustomHeaderSet, FileStore, KeyValueStore,
    MemoryStore, TokenStore,
};

use types::*;

/// Run `f`, returning `fallback` if it panics.
fn guard<R>(fallback: R, f: impl FnOnce() -> R) -> R {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}

fn into_handle(store: TokenStore<Box<dyn KeyValueStore>>) -> *mut FfiAuthStore {
    Box::into_raw(Box::new(FfiAuthStore {
        authorizer: Authorizer::new(Arc::new(store)),
    }))
}

/// # Safety
/// `store` must be null or a live pointer from an `authnet_store_new_*` call.
unsafe fn store_ref<'a>(
    store: *const FfiAuthStore,
) -> Result<&'a TokenStore<Box<dyn KeyValueStore>>, FfiErrorCode> {
    if store.is_null() {
        return Err(FfiErrorCode::NullArg);
    }
    Ok(unsafe { &*store }.authorizer.store())
}

fn lifetime_or_default(store: &TokenStore<Box<dyn KeyValueStore>>, expires_in: f64) -> f64 {
    if expires_in.is_finite() && expires_in >= 0.0 {
        expires_in
    } else {
        store.default_expires_in()
    }
}

// ---------------------------------------------------------------------------
// Store lifecycle
// ---------------------------------------------------------------------------

/// Create a store that keeps the session in memory only.
///
/// The caller must free the returned pointer with `authnet_store_free`.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_store_new_memory() -> *mut FfiAuthStore {
    guard(std::ptr::null_mut(), || {
        let storage: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        into_handle(TokenStore::new(storage))
    })
}

/// Create a store that persists the session as files under `dir`.
///
/// Returns null if `dir` is null, not UTF-8, or cannot be created.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_store_new_file(dir: *const c_char) -> *mut FfiAuthStore {
    guard(std::ptr::null_mut(), || {
        let Ok(dir) = (unsafe { read_str(dir) }) else {
            return std::ptr::null_mut();
        };
        match FileStore::open(dir) {
            Ok(files) => {
                let storage: Box<dyn KeyValueStore> = Box::new(files);
                into_handle(TokenStore::new(storage))
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not open file store");
                std::ptr::null_mut()
            }
        }
    })
}

/// Create a store from a TOML config file, with `AUTHNET_*` environment
/// overrides applied on top.
///
/// Returns null if the file cannot be read, fails validation, or names a
/// backend that cannot be opened.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_store_from_config(path: *const c_char) -> *mut FfiAuthStore {
    guard(std::ptr::null_mut(), || {
        let Ok(path) = (unsafe { read_str(path) }) else {
            return std::ptr::null_mut();
        };
        let opened = AuthnetConfig::from_file(Path::new(path))
            .and_then(AuthnetConfig::with_env_overrides)
            .and_then(|config| config.open_store());
        match opened {
            Ok(store) => into_handle(store),
            Err(e) => {
                tracing::warn!(error = %e, "could not open store from config");
                std::ptr::null_mut()
            }
        }
    })
}

/// Free a store created by any `authnet_store_new_*` function. Safe to call
/// with null. The persisted session is left in place.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_store_free(store: *mut FfiAuthStore) {
    if !store.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(store) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Session writes
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn authnet_set_access_token(
    store: *const FfiAuthStore,
    token: *const c_char,
    expires_in: f64,
) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || {
        let (store, token) = match unsafe { (store_ref(store), read_str(token)) } {
            (Ok(s), Ok(t)) => (s, t),
            (Err(code), _) | (_, Err(code)) => return code,
        };
        let expires_in = lifetime_or_default(store, expires_in);
        store
            .set_access_token_with_expiry(token, expires_in)
            .into()
    })
}

/// Store base64(`client_id:client_secret`) as the access token for
/// endpoints that use Basic auth.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_set_client_credentials(
    store: *const FfiAuthStore,
    client_id: *const c_char,
    client_secret: *const c_char,
    expires_in: f64,
) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || {
        let store = match unsafe { store_ref(store) } {
            Ok(s) => s,
            Err(code) => return code,
        };
        let (id, secret) = match unsafe { (read_str(client_id), read_str(client_secret)) } {
            (Ok(id), Ok(secret)) => (id, secret),
            (Err(code), _) | (_, Err(code)) => return code,
        };
        let expires_in = lifetime_or_default(store, expires_in);
        store
            .set_client_credentials_with_expiry(id, secret, expires_in)
            .into()
    })
}

/// Restart the expiry window. Returns `NoSession` when nothing is stored.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_update_token_expiry(
    store: *const FfiAuthStore,
    expires_in: f64,
) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || {
        let store = match unsafe { store_ref(store) } {
            Ok(s) => s,
            Err(code) => return code,
        };
        let expires_in = lifetime_or_default(store, expires_in);
        store.update_token_expiry(expires_in).into()
    })
}

/// Replace the session with a JSON object such as a raw token endpoint
/// response. Nothing is written if the JSON does not decode.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_update_from_json(
    store: *const FfiAuthStore,
    json: *const c_char,
) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || {
        let (store, json) = match unsafe { (store_ref(store), read_str(json)) } {
            (Ok(s), Ok(j)) => (s, j),
            (Err(code), _) | (_, Err(code)) => return code,
        };
        let mapping: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "session JSON is not valid");
                return FfiErrorCode::Decode;
            }
        };
        store.update_from_untyped(&mapping).into()
    })
}

/// Remove the session and the custom header set.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_clear(store: *const FfiAuthStore) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || match unsafe { store_ref(store) } {
        Ok(store) => store.clear().into(),
        Err(code) => code,
    })
}

// ---------------------------------------------------------------------------
// Session reads
// ---------------------------------------------------------------------------

/// `true` when there is no usable session or its lifetime has elapsed.
/// A null store counts as expired.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_is_expired(store: *const FfiAuthStore) -> bool {
    guard(true, || match unsafe { store_ref(store) } {
        Ok(store) => store.is_expired(),
        Err(_) => true,
    })
}

/// The stored access token, or null if there is none.
///
/// The caller must free a non-null result with `authnet_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_access_token(store: *const FfiAuthStore) -> *mut c_char {
    guard(std::ptr::null_mut(), || match unsafe { store_ref(store) } {
        Ok(store) => store
            .access_token()
            .map_or(std::ptr::null_mut(), into_c_string),
        Err(_) => std::ptr::null_mut(),
    })
}

/// The stored refresh token, or null if there is none.
///
/// The caller must free a non-null result with `authnet_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_refresh_token(store: *const FfiAuthStore) -> *mut c_char {
    guard(std::ptr::null_mut(), || match unsafe { store_ref(store) } {
        Ok(store) => store
            .refresh_token()
            .map_or(std::ptr::null_mut(), into_c_string),
        Err(_) => std::ptr::null_mut(),
    })
}

// ---------------------------------------------------------------------------
// Custom headers
// ---------------------------------------------------------------------------

/// Store the header set attached to `Custom` requests, given as a JSON
/// object of string values, e.g. `{"X-Api-Key":"..."}`.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_set_custom_headers_json(
    store: *const FfiAuthStore,
    json: *const c_char,
) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || {
        let (store, json) = match unsafe { (store_ref(store), read_str(json)) } {
            (Ok(s), Ok(j)) => (s, j),
            (Err(code), _) | (_, Err(code)) => return code,
        };
        match serde_json::from_str::<CustomHeaderSet>(json) {
            Ok(headers) => store.set_custom_headers(&headers).into(),
            Err(e) => {
                tracing::warn!(error = %e, "custom header JSON is not a string map");
                FfiErrorCode::Decode
            }
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn authnet_clear_custom_headers(store: *const FfiAuthStore) -> FfiErrorCode {
    guard(FfiErrorCode::Panic, || match unsafe { store_ref(store) } {
        Ok(store) => store.clear_custom_headers().into(),
        Err(code) => code,
    })
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Decide whether `request` may go out now and attach its auth headers.
///
/// Never returns null. The caller must free the result with
/// `authnet_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_authorize(
    store: *const FfiAuthStore,
    request: *const FfiApiRequest,
) -> *mut FfiAuthorizeResult {
    catch_unwind(AssertUnwindSafe(|| {
        if store.is_null() || request.is_null() {
            return FfiAuthorizeResult::error(FfiErrorCode::NullArg);
        }
        let handle = unsafe { &*store };
        let request = match unsafe { (*request).to_core() } {
            Ok(r) => r,
            Err(code) => return FfiAuthorizeResult::error(code),
        };
        match handle.authorizer.authorize(request) {
            Authorization::RefreshRequired => FfiAuthorizeResult::refresh_required(),
            Authorization::Proceed(req) => FfiAuthorizeResult::proceed(req),
        }
    }))
    .unwrap_or_else(|_| FfiAuthorizeResult::error(FfiErrorCode::Panic))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` and every string it owns. Safe to call with null.
///
/// Requests inside an `FfiAuthorizeResult` are released by
/// `authnet_free_result`; do not free them twice.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Vec::from_raw_parts(req.headers, req.headers_len as usize, req.headers_len as usize)
            };
            for h in headers {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    }));
}

/// Free an `FfiAuthorizeResult` and the request inside it. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_free_result(result: *mut FfiAuthorizeResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        authnet_free_request(result.request);
    }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn authnet_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};

    fn take_string(s: *mut c_char) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let value = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        authnet_free_string(s);
        Some(value)
    }

    fn header<'a>(req: &'a FfiHttpRequest, name: &str) -> Option<&'a str> {
        if req.headers.is_null() {
            return None;
        }
        let headers = unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) };
        headers.iter().find_map(|h| {
            let key = unsafe { CStr::from_ptr(h.key) }.to_str().unwrap();
            key.eq_ignore_ascii_case(name)
                .then(|| unsafe { CStr::from_ptr(h.value) }.to_str().unwrap())
        })
    }

    fn descriptor(url: &CString, scheme: FfiAuthScheme, check_validity: bool) -> FfiApiRequest {
        FfiApiRequest {
            method: FfiHttpMethod::Get as u32,
            url: url.as_ptr(),
            headers: std::ptr::null(),
            headers_len: 0,
            body: std::ptr::null(),
            auth_scheme: scheme as u32,
            check_validity,
        }
    }

    #[test]
    fn store_new_and_free() {
        let store = authnet_store_new_memory();
        assert!(!store.is_null());
        authnet_store_free(store);
    }

    #[test]
    fn store_free_null_is_safe() {
        authnet_store_free(std::ptr::null_mut());
        authnet_free_result(std::ptr::null_mut());
        authnet_free_request(std::ptr::null_mut());
        authnet_free_string(std::ptr::null_mut());
    }

    #[test]
    fn null_arguments_are_reported() {
        let token = CString::new("t").unwrap();
        assert_eq!(
            authnet_set_access_token(std::ptr::null(), token.as_ptr(), -1.0),
            FfiErrorCode::NullArg
        );
        let store = authnet_store_new_memory();
        assert_eq!(
            authnet_set_access_token(store, std::ptr::null(), -1.0),
            FfiErrorCode::NullArg
        );
        assert!(authnet_is_expired(std::ptr::null()));
        assert!(authnet_access_token(std::ptr::null()).is_null());
        authnet_store_free(store);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let store = authnet_store_new_memory();
        let bytes = [0xffu8, 0xfe, 0x00];
        let code = authnet_set_access_token(store, bytes.as_ptr() as *const c_char, -1.0);
        assert_eq!(code, FfiErrorCode::InvalidUtf8);
        authnet_store_free(store);
    }

    #[test]
    fn access_token_round_trips_with_default_lifetime() {
        let store = authnet_store_new_memory();
        assert!(authnet_is_expired(store));
        assert!(authnet_access_token(store).is_null());

        let token = CString::new("abc").unwrap();
        assert_eq!(authnet_set_access_token(store, token.as_ptr(), -1.0), FfiErrorCode::Ok);
        assert_eq!(take_string(authnet_access_token(store)).as_deref(), Some("abc"));
        assert!(!authnet_is_expired(store));
        assert!(authnet_refresh_token(store).is_null());

        assert_eq!(authnet_clear(store), FfiErrorCode::Ok);
        assert!(authnet_access_token(store).is_null());
        authnet_store_free(store);
    }

    #[test]
    fn zero_lifetime_expires_and_update_expiry_restores() {
        let store = authnet_store_new_memory();
        assert_eq!(authnet_update_token_expiry(store, 60.0), FfiErrorCode::NoSession);

        let token = CString::new("abc").unwrap();
        authnet_set_access_token(store, token.as_ptr(), 0.0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(authnet_is_expired(store));

        assert_eq!(authnet_update_token_expiry(store, 60.0), FfiErrorCode::Ok);
        assert!(!authnet_is_expired(store));
        authnet_store_free(store);
    }

    #[test]
    fn client_credentials_produce_basic_header() {
        let store = authnet_store_new_memory();
        let id = CString::new("id").unwrap();
        let secret = CString::new("secret").unwrap();
        assert_eq!(
            authnet_set_client_credentials(store, id.as_ptr(), secret.as_ptr(), -1.0),
            FfiErrorCode::Ok
        );

        let url = CString::new("https://api.example.com/oauth/token").unwrap();
        let desc = descriptor(&url, FfiAuthScheme::Basic, true);
        let result = authnet_authorize(store, &desc);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(!r.refresh_required);
        let req = unsafe { &*r.request };
        assert_eq!(header(req, "authorization"), Some("Basic aWQ6c2VjcmV0"));

        authnet_free_result(result);
        authnet_store_free(store);
    }

    #[test]
    fn update_from_json_makes_bearer_requests_proceed() {
        let store = authnet_store_new_memory();
        let json = CString::new(
            r#"{"access_token":"tok","refresh_token":"ref","expires_in":3600}"#,
        )
        .unwrap();
        assert_eq!(authnet_update_from_json(store, json.as_ptr()), FfiErrorCode::Ok);
        assert_eq!(take_string(authnet_refresh_token(store)).as_deref(), Some("ref"));

        let url = CString::new("https://api.example.com/me").unwrap();
        let accept_key = CString::new("Accept").unwrap();
        let accept_value = CString::new("application/json").unwrap();
        let headers = [FfiHeaderInput {
            key: accept_key.as_ptr(),
            value: accept_value.as_ptr(),
        }];
        let mut desc = descriptor(&url, FfiAuthScheme::Bearer, true);
        desc.headers = headers.as_ptr();
        desc.headers_len = 1;

        let result = authnet_authorize(store, &desc);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        let req = unsafe { &*r.request };
        assert_eq!(req.method, FfiHttpMethod::Get);
        let url_out = unsafe { CStr::from_ptr(req.url) }.to_str().unwrap();
        assert_eq!(url_out, "https://api.example.com/me");
        assert_eq!(header(req, "Authorization"), Some("Bearer tok"));
        assert_eq!(header(req, "Accept"), Some("application/json"));
        assert!(req.body.is_null());

        authnet_free_result(result);
        authnet_store_free(store);
    }

    #[test]
    fn malformed_json_leaves_session_untouched() {
        let store = authnet_store_new_memory();
        let token = CString::new("keep").unwrap();
        authnet_set_access_token(store, token.as_ptr(), -1.0);

        let not_json = CString::new("{not json").unwrap();
        assert_eq!(authnet_update_from_json(store, not_json.as_ptr()), FfiErrorCode::Decode);
        let wrong_shape = CString::new(r#"{"expires_in":"soon"}"#).unwrap();
        assert_eq!(authnet_update_from_json(store, wrong_shape.as_ptr()), FfiErrorCode::Decode);

        assert_eq!(take_string(authnet_access_token(store)).as_deref(), Some("keep"));
        authnet_store_free(store);
    }

    #[test]
    fn empty_store_requires_refresh_for_checked_requests() {
        let store = authnet_store_new_memory();
        let url = CString::new("https://api.example.com/me").unwrap();

        let result = authnet_authorize(store, &descriptor(&url, FfiAuthScheme::Bearer, true));
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.refresh_required);
        assert!(r.request.is_null());
        authnet_free_result(result);

        let result = authnet_authorize(store, &descriptor(&url, FfiAuthScheme::None, false));
        let r = unsafe { &*result };
        assert!(!r.refresh_required);
        let req = unsafe { &*r.request };
        assert_eq!(header(req, "Authorization"), None);
        authnet_free_result(result);

        authnet_store_free(store);
    }

    #[test]
    fn authorize_rejects_bad_descriptors() {
        let store = authnet_store_new_memory();
        let result = authnet_authorize(store, std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        authnet_free_result(result);

        let url = CString::new("https://api.example.com/me").unwrap();
        let mut desc = descriptor(&url, FfiAuthScheme::None, false);
        desc.headers_len = 2;
        let result = authnet_authorize(store, &desc);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        assert!(r.request.is_null());
        authnet_free_result(result);

        authnet_store_free(store);
    }

    #[test]
    fn authorize_rejects_unknown_enum_codes() {
        let store = authnet_store_new_memory();
        let url = CString::new("https://api.example.com/me").unwrap();

        let mut desc = descriptor(&url, FfiAuthScheme::None, false);
        desc.method = 99;
        let result = authnet_authorize(store, &desc);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidArg);
        assert!(r.request.is_null());
        authnet_free_result(result);

        let mut desc = descriptor(&url, FfiAuthScheme::None, false);
        desc.auth_scheme = 4;
        let result = authnet_authorize(store, &desc);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidArg);
        authnet_free_result(result);

        let mut desc = descriptor(&url, FfiAuthScheme::None, false);
        desc.method = FfiHttpMethod::Patch as u32;
        let result = authnet_authorize(store, &desc);
        let req = unsafe { &*(*result).request };
        assert_eq!(req.method, FfiHttpMethod::Patch);
        authnet_free_result(result);

        authnet_store_free(store);
    }

    #[test]
    fn custom_headers_are_attached_and_cleared() {
        let store = authnet_store_new_memory();
        let json = CString::new(r#"{"X-Api-Key":"k1"}"#).unwrap();
        assert_eq!(authnet_set_custom_headers_json(store, json.as_ptr()), FfiErrorCode::Ok);

        let url = CString::new("https://api.example.com/custom").unwrap();
        let desc = descriptor(&url, FfiAuthScheme::Custom, false);
        let result = authnet_authorize(store, &desc);
        let req = unsafe { &*(*result).request };
        assert_eq!(header(req, "x-api-key"), Some("k1"));
        authnet_free_result(result);

        assert_eq!(authnet_clear_custom_headers(store), FfiErrorCode::Ok);
        let result = authnet_authorize(store, &desc);
        let req = unsafe { &*(*result).request };
        assert_eq!(header(req, "x-api-key"), None);
        authnet_free_result(result);

        let bad = CString::new(r#"{"X-Count":3}"#).unwrap();
        assert_eq!(authnet_set_custom_headers_json(store, bad.as_ptr()), FfiErrorCode::Decode);
        authnet_store_free(store);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = CString::new(dir.path().to_str().unwrap()).unwrap();

        let store = authnet_store_new_file(path.as_ptr());
        assert!(!store.is_null());
        let token = CString::new("persisted").unwrap();
        authnet_set_access_token(store, token.as_ptr(), -1.0);
        authnet_store_free(store);

        let reopened = authnet_store_new_file(path.as_ptr());
        assert_eq!(take_string(authnet_access_token(reopened)).as_deref(), Some("persisted"));
        authnet_store_free(reopened);
    }

    #[test]
    fn store_from_config_opens_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = dir.path().join("sessions");
        let config_path = dir.path().join("authnet.toml");
        std::fs::write(
            &config_path,
            format!(
                "default_expires_in = 120.0\n\n[storage]\nbackend = \"file\"\npath = {:?}\n",
                sessions.to_str().unwrap()
            ),
        )
        .unwrap();

        let path = CString::new(config_path.to_str().unwrap()).unwrap();
        let store = authnet_store_from_config(path.as_ptr());
        assert!(!store.is_null());
        let token = CString::new("t").unwrap();
        assert_eq!(authnet_set_access_token(store, token.as_ptr(), -1.0), FfiErrorCode::Ok);
        assert!(sessions.exists());
        authnet_store_free(store);

        let missing = CString::new(dir.path().join("nope.toml").to_str().unwrap()).unwrap();
        assert!(authnet_store_from_config(missing.as_ptr()).is_null());
    }
}
