//! Request context extraction and handling.

use axum::http::{header::HeaderMap, Method, Uri};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::auth::SignableRequest;
use crate::config::DEFAULT_ACCOUNT;
use crate::models::ServiceVariant;

/// Extracted request context containing all relevant information.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID.
    pub request_id: String,
    /// Service the request was addressed to.
    pub variant: ServiceVariant,
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Account name extracted from path.
    pub account: String,
    /// Query parameters.
    pub query_params: HashMap<String, String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Client request ID from x-ms-client-request-id header.
    pub client_request_id: Option<String>,
}

impl RequestContext {
    /// Creates a new request context from request parts.
    pub fn new(
        variant: ServiceVariant,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        path_params: HashMap<String, String>,
        query_params: HashMap<String, String>,
    ) -> Self {
        let account = path_params
            .get("account")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());

        let client_request_id = headers
            .get("x-ms-client-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            request_id: Uuid::new_v4().to_string(),
            variant,
            method,
            uri,
            account,
            query_params,
            headers,
            client_request_id,
        }
    }

    /// Returns the value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Returns the value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the restype query parameter.
    pub fn restype(&self) -> Option<&str> {
        self.query_param("restype")
    }

    /// Returns the comp query parameter.
    pub fn comp(&self) -> Option<&str> {
        self.query_param("comp")
    }

    /// Returns the parts of this request a SharedKey signature covers.
    pub fn signable(&self) -> SignableRequest {
        let headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        let query = self
            .query_params
            .iter()
            .map(|(k, v)| {
                let decoded = percent_encoding::percent_decode_str(v)
                    .decode_utf8_lossy()
                    .to_string();
                (k.clone(), decoded)
            })
            .collect();

        SignableRequest {
            method: self.method.as_str().to_string(),
            account: self.account.clone(),
            path: self.uri.path().to_string(),
            query,
            headers,
        }
    }
}

/// Formats a DateTime as RFC 1123 format for HTTP headers.
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
