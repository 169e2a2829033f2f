//! Service properties handlers.

use axum::{
    body::Body,
    http::{HeaderValue, Response, StatusCode},
};
use bytes::Bytes;

use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::service::PropertiesService;

use super::{build_response, common_headers};

/// GET /?restype=service&comp=properties - Get service properties.
pub async fn get_service_properties(
    ctx: &RequestContext,
    service: &PropertiesService,
) -> StorageResult<Response<Body>> {
    let xml = service.get_document(&ctx.account, ctx.variant).await?;

    let mut headers = common_headers(ctx);
    headers.insert("Content-Type", HeaderValue::from_static("application/xml"));

    Ok(build_response(StatusCode::OK, headers, Body::from(xml)))
}

/// PUT /?restype=service&comp=properties - Set service properties.
pub async fn set_service_properties(
    ctx: &RequestContext,
    service: &PropertiesService,
    body: Bytes,
) -> StorageResult<Response<Body>> {
    let xml = std::str::from_utf8(&body)
        .map_err(|_| StorageError::new(ErrorCode::InvalidXmlDocument))?;

    service.set_document(&ctx.account, ctx.variant, xml).await?;

    Ok(build_response(StatusCode::ACCEPTED, common_headers(ctx), Body::empty()))
}
