//! Request handlers for the storage service API.

mod service;

pub use service::*;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode};
use chrono::Utc;

use crate::config::DEFAULT_API_VERSION;
use crate::context::{format_http_date, RequestContext};
use crate::models::ServiceVariant;

fn server_header(variant: ServiceVariant) -> &'static str {
    match variant {
        ServiceVariant::Blob => "Azurite-Blob/3.31.0",
        ServiceVariant::Queue => "Azurite-Queue/3.31.0",
        ServiceVariant::Table => "Azurite-Table/3.31.0",
    }
}

/// Creates common response headers for storage API responses.
pub fn common_headers(ctx: &RequestContext) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(request_id) = HeaderValue::from_str(&ctx.request_id) {
        headers.insert("x-ms-request-id", request_id);
    }
    if let Some(client_id) = ctx
        .client_request_id
        .as_deref()
        .and_then(|id| HeaderValue::from_str(id).ok())
    {
        headers.insert("x-ms-client-request-id", client_id);
    }
    headers.insert("x-ms-version", HeaderValue::from_static(DEFAULT_API_VERSION));
    if let Ok(date) = HeaderValue::from_str(&format_http_date(&Utc::now())) {
        headers.insert("Date", date);
    }
    headers.insert("server", HeaderValue::from_static(server_header(ctx.variant)));
    headers
}

/// Builds a response with the given status, headers, and body.
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
