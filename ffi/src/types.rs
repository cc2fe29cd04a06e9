//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Input types (filled in by the host)
//! carry `*const` pointers the library only reads; output types carry
//! `*mut` pointers the host must hand back to an `authnet_free_*` function.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use authnet_core::{
    ApiRequest, AuthScheme, Authorizer, HttpMethod, HttpRequest, KeyValueStore, TokenStoreError,
};

/// Opaque handle to a token store and its authorizer. C callers receive a
/// pointer to this and pass it back into every FFI function.
pub struct FfiAuthStore {
    pub(crate) authorizer: Authorizer<Box<dyn KeyValueStore>>,
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Status returned by every fallible FFI call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NullArg = 1,
    InvalidUtf8 = 2,
    Storage = 3,
    Decode = 4,
    Encode = 5,
    NoSession = 6,
    Panic = 7,
    /// A numeric argument is out of range, e.g. an unknown method code.
    InvalidArg = 8,
}

impl From<&TokenStoreError> for FfiErrorCode {
    fn from(err: &TokenStoreError) -> Self {
        match err {
            TokenStoreError::Storage(_) => FfiErrorCode::Storage,
            TokenStoreError::Decode(_) => FfiErrorCode::Decode,
            TokenStoreError::Encode(_) => FfiErrorCode::Encode,
            TokenStoreError::NoSession => FfiErrorCode::NoSession,
        }
    }
}

impl<T> From<Result<T, TokenStoreError>> for FfiErrorCode {
    fn from(result: Result<T, TokenStoreError>) -> Self {
        match result {
            Ok(_) => FfiErrorCode::Ok,
            Err(e) => {
                tracing::warn!(error = %e, "token store call failed");
                FfiErrorCode::from(&e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Patch = 3,
    Delete = 4,
    Head = 5,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Head => FfiHttpMethod::Head,
        }
    }
}

impl TryFrom<u32> for FfiHttpMethod {
    type Error = FfiErrorCode;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FfiHttpMethod::Get),
            1 => Ok(FfiHttpMethod::Post),
            2 => Ok(FfiHttpMethod::Put),
            3 => Ok(FfiHttpMethod::Patch),
            4 => Ok(FfiHttpMethod::Delete),
            5 => Ok(FfiHttpMethod::Head),
            _ => Err(FfiErrorCode::InvalidArg),
        }
    }
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Patch => HttpMethod::Patch,
            FfiHttpMethod::Delete => HttpMethod::Delete,
            FfiHttpMethod::Head => HttpMethod::Head,
        }
    }
}

/// Auth scheme a request declares.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiAuthScheme {
    None = 0,
    Bearer = 1,
    Basic = 2,
    Custom = 3,
}

impl TryFrom<u32> for FfiAuthScheme {
    type Error = FfiErrorCode;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FfiAuthScheme::None),
            1 => Ok(FfiAuthScheme::Bearer),
            2 => Ok(FfiAuthScheme::Basic),
            3 => Ok(FfiAuthScheme::Custom),
            _ => Err(FfiErrorCode::InvalidArg),
        }
    }
}

impl From<FfiAuthScheme> for AuthScheme {
    fn from(s: FfiAuthScheme) -> Self {
        match s {
            FfiAuthScheme::None => AuthScheme::None,
            FfiAuthScheme::Bearer => AuthScheme::Bearer,
            FfiAuthScheme::Basic => AuthScheme::Basic,
            FfiAuthScheme::Custom => AuthScheme::Custom,
        }
    }
}

/// A header supplied by the host. Both strings are borrowed.
#[repr(C)]
pub struct FfiHeaderInput {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// A request descriptor supplied by the host. The FFI layer reads but does
/// not free these fields. `headers` may be null when `headers_len` is 0 and
/// `body` may be null for requests without a body.
///
/// `method` holds an `FfiHttpMethod` value and `auth_scheme` an
/// `FfiAuthScheme` value; anything else is rejected with `InvalidArg`.
#[repr(C)]
pub struct FfiApiRequest {
    pub method: u32,
    pub url: *const c_char,
    pub headers: *const FfiHeaderInput,
    pub headers_len: u32,
    pub body: *const c_char,
    pub auth_scheme: u32,
    pub check_validity: bool,
}

/// Borrow a C string as `&str`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, FfiErrorCode> {
    if ptr.is_null() {
        return Err(FfiErrorCode::NullArg);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiErrorCode::InvalidUtf8)
}

impl FfiApiRequest {
    /// Copy the host's descriptor into a core `ApiRequest`.
    ///
    /// # Safety
    /// Every non-null pointer must be valid as documented on the struct.
    pub(crate) unsafe fn to_core(&self) -> Result<ApiRequest, FfiErrorCode> {
        let method = FfiHttpMethod::try_from(self.method)?;
        let scheme = FfiAuthScheme::try_from(self.auth_scheme)?;
        let url = unsafe { read_str(self.url) }?;
        let mut request = ApiRequest::new(method.into(), url)
            .with_auth(scheme.into())
            .check_validity(self.check_validity);

        if self.headers_len > 0 {
            if self.headers.is_null() {
                return Err(FfiErrorCode::NullArg);
            }
            let headers =
                unsafe { std::slice::from_raw_parts(self.headers, self.headers_len as usize) };
            for header in headers {
                let key = unsafe { read_str(header.key) }?;
                let value = unsafe { read_str(header.value) }?;
                request = request.with_header(key, value);
            }
        }
        if !self.body.is_null() {
            request = request.with_body(unsafe { read_str(self.body) }?);
        }
        Ok(request)
    }
}

/// Allocate a C string. Interior NUL bytes cannot be represented, so such
/// values become empty strings.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An authorized HTTP request described as C-compatible plain data.
///
/// The host executes it with its own HTTP stack.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let url = into_c_string(req.url);
        let body = match req.body {
            Some(b) => into_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result envelope for `authnet_authorize`.
///
/// - `error_code == Ok`, `refresh_required == true`: the session is expired;
///   refresh and resubmit. `request` is null.
/// - `error_code == Ok`, `refresh_required == false`: send `request`.
/// - any other `error_code`: the descriptor was invalid; `request` is null.
#[repr(C)]
pub struct FfiAuthorizeResult {
    pub error_code: FfiErrorCode,
    pub refresh_required: bool,
    pub request: *mut FfiHttpRequest,
}

impl FfiAuthorizeResult {
    pub(crate) fn proceed(req: HttpRequest) -> *mut Self {
        Box::into_raw(Box::new(FfiAuthorizeResult {
            error_code: FfiErrorCode::Ok,
            refresh_required: false,
            request: FfiHttpRequest::from_core(req),
        }))
    }

    pub(crate) fn refresh_required() -> *mut Self {
        Box::into_raw(Box::new(FfiAuthorizeResult {
            error_code: FfiErrorCode::Ok,
            refresh_required: true,
            request: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn error(error_code: FfiErrorCode) -> *mut Self {
        Box::into_raw(Box::new(FfiAuthorizeResult {
            error_code,
            refresh_required: false,
            request: std::ptr::null_mut(),
        }))
    }
}
