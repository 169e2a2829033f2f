//! Request routing for the storage service API.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, Response, Uri},
    response::IntoResponse,
    routing::any,
    Router,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::authenticate;
use crate::config::Config;
use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::handlers;
use crate::models::ServiceVariant;
use crate::service::PropertiesService;

/// Application state shared between handlers of one service.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub variant: ServiceVariant,
    pub service: PropertiesService,
}

/// Creates the router for one storage service.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(service_handler))
        .route("/:account", any(service_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

/// Handler for service-level operations.
async fn service_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Option<Path<HashMap<String, String>>>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response<Body> {
    // The bare "/" route has no path parameters.
    let params = params.map(|Path(p)| p).unwrap_or_default();
    let ctx = RequestContext::new(state.variant, method, uri, headers, params, query);

    let auth = match authenticate(&ctx, &state.config) {
        Ok(auth) => auth,
        Err(e) => return e.with_request_id(&ctx.request_id).into_response(),
    };
    tracing::debug!(
        request_id = %ctx.request_id,
        account = %auth.account,
        anonymous = auth.is_anonymous,
        "authenticated"
    );

    match route_service_request(&ctx, &state, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(
                request_id = %ctx.request_id,
                code = e.code.as_str(),
                "request failed"
            );
            e.with_request_id(&ctx.request_id).into_response()
        }
    }
}

async fn fallback_handler() -> Response<Body> {
    StorageError::new(ErrorCode::ResourceNotFound).into_response()
}

/// Routes service-level requests.
async fn route_service_request(
    ctx: &RequestContext,
    state: &AppState,
    body: Bytes,
) -> StorageResult<Response<Body>> {
    match (ctx.method.as_str(), ctx.restype(), ctx.comp()) {
        ("GET", Some("service"), Some("properties")) => {
            handlers::get_service_properties(ctx, &state.service).await
        }
        ("PUT", Some("service"), Some("properties")) => {
            handlers::set_service_properties(ctx, &state.service, body).await
        }
        _ => Err(StorageError::new(ErrorCode::UnsupportedHttpVerb)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::xml::parse_service_properties;

    fn app(variant: ServiceVariant, config: Config) -> Router {
        create_router(AppState {
            config: Arc::new(config),
            variant,
            service: PropertiesService::in_memory(),
        })
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_default_document() {
        let response = app(ServiceVariant::Blob, Config::default())
            .oneshot(
                Request::get("/devstoreaccount1?restype=service&comp=properties")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["server"], "Azurite-Blob/3.31.0");
        let props = parse_service_properties(&body_text(response).await).unwrap();
        assert_eq!(props, Default::default());
    }

    #[tokio::test]
    async fn test_queue_rejects_version_pinning() {
        let body = "<StorageServiceProperties>\
                    <DefaultServiceVersion>2013-08-15</DefaultServiceVersion>\
                    </StorageServiceProperties>";
        let response = app(ServiceVariant::Queue, Config::default())
            .oneshot(
                Request::put("/devstoreaccount1?restype=service&comp=properties")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-ms-error-code"], "UnsupportedXmlNode");
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let response = app(ServiceVariant::Table, Config::default())
            .oneshot(
                Request::get("/devstoreaccount1?restype=service&comp=stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-ms-error-code"], "UnsupportedHttpVerb");

        let response = app(ServiceVariant::Table, Config::default())
            .oneshot(Request::get("/a/b/c").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_require_auth_rejects_anonymous() {
        let config = Config {
            require_auth: true,
            ..Config::default()
        };
        let response = app(ServiceVariant::Blob, config)
            .oneshot(
                Request::get("/devstoreaccount1?restype=service&comp=properties")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["x-ms-error-code"], "AuthenticationFailed");
    }
}
