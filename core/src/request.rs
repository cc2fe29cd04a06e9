//! Outgoing request descriptors.
//!
//! # Design
//! Every endpoint declares its auth needs as data on the request itself
//! (`auth_scheme`, `check_validity`) instead of through a per-endpoint trait.
//! An `ApiRequest` only becomes an `HttpRequest` after the authorizer has
//! approved it and merged its headers.

use serde::Serialize;

use crate::http::{join_url, HttpMethod, HttpRequest};
use crate::record::AuthScheme;

/// Description of one API call before authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub auth_scheme: AuthScheme,
    /// Ask for a refresh instead of sending when the stored token is expired.
    pub check_validity: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            auth_scheme: AuthScheme::None,
            check_validity: false,
        }
    }

    /// Build the URL from a base and an endpoint path.
    pub fn endpoint(method: HttpMethod, base_url: &str, path: &str) -> Self {
        Self::new(method, join_url(base_url, path))
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the body and set `content-type: application/json`.
    pub fn with_json_body<T: Serialize + ?Sized>(
        self,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(payload)?;
        Ok(self
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    pub fn with_auth(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    pub fn check_validity(mut self, check: bool) -> Self {
        self.check_validity = check;
        self
    }

    /// Drop the auth declaration, keeping the HTTP parts as declared.
    pub(crate) fn into_http(self) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_needs_no_auth() {
        let req = ApiRequest::get("http://localhost:3000/public");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.auth_scheme, AuthScheme::None);
        assert!(!req.check_validity);
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let req = ApiRequest::endpoint(HttpMethod::Delete, "http://localhost:3000/", "/me");
        assert_eq!(req.url, "http://localhost:3000/me");
        assert_eq!(req.method, HttpMethod::Delete);
    }

    #[test]
    fn json_body_sets_content_type() {
        let req = ApiRequest::post("http://localhost:3000/upload")
            .with_json_body(&serde_json::json!({ "name": "avatar" }))
            .unwrap()
            .with_auth(AuthScheme::Bearer)
            .check_validity(true);
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "avatar");
        assert_eq!(req.auth_scheme, AuthScheme::Bearer);
        assert!(req.check_validity);
    }
}
