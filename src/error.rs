//! Storage error types and error response formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;
use thiserror::Error;

use crate::models::ServiceVariant;

/// Storage service error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AuthenticationFailed,
    AuthorizationFailure,
    InternalError,
    InvalidHeaderValue,
    InvalidQueryParameterValue,
    InvalidXmlDocument,
    InvalidXmlNodeValue,
    MissingRequiredXmlNode,
    OutOfRangeInput,
    ResourceNotFound,
    UnsupportedHttpVerb,
    UnsupportedXmlNode,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "AuthenticationFailed",
            ErrorCode::AuthorizationFailure => "AuthorizationFailure",
            ErrorCode::InternalError => "InternalError",
            ErrorCode::InvalidHeaderValue => "InvalidHeaderValue",
            ErrorCode::InvalidQueryParameterValue => "InvalidQueryParameterValue",
            ErrorCode::InvalidXmlDocument => "InvalidXmlDocument",
            ErrorCode::InvalidXmlNodeValue => "InvalidXmlNodeValue",
            ErrorCode::MissingRequiredXmlNode => "MissingRequiredXmlNode",
            ErrorCode::OutOfRangeInput => "OutOfRangeInput",
            ErrorCode::ResourceNotFound => "ResourceNotFound",
            ErrorCode::UnsupportedHttpVerb => "UnsupportedHttpVerb",
            ErrorCode::UnsupportedXmlNode => "UnsupportedXmlNode",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidHeaderValue
            | ErrorCode::InvalidQueryParameterValue
            | ErrorCode::InvalidXmlDocument
            | ErrorCode::InvalidXmlNodeValue
            | ErrorCode::MissingRequiredXmlNode
            | ErrorCode::OutOfRangeInput
            | ErrorCode::UnsupportedXmlNode => StatusCode::BAD_REQUEST,

            ErrorCode::AuthenticationFailed | ErrorCode::AuthorizationFailure => {
                StatusCode::FORBIDDEN
            }

            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,

            ErrorCode::UnsupportedHttpVerb => StatusCode::METHOD_NOT_ALLOWED,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default error message for this code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "Server failed to authenticate the request. Make sure the value of the Authorization header is formed correctly including the signature.",
            ErrorCode::AuthorizationFailure => "This request is not authorized to perform this operation.",
            ErrorCode::InvalidXmlDocument => "XML specified is not syntactically valid.",
            ErrorCode::InvalidXmlNodeValue => "The value for one of the XML nodes is not in the correct format.",
            ErrorCode::MissingRequiredXmlNode => "A required XML node was not specified in the request body.",
            ErrorCode::UnsupportedXmlNode => "One of the XML nodes specified in the request body is not supported.",
            ErrorCode::ResourceNotFound => "The specified resource does not exist.",
            ErrorCode::UnsupportedHttpVerb => "The resource doesn't support the specified HTTP verb.",
            ErrorCode::InternalError => "The server encountered an internal error. Please retry the request.",
            _ => "An error occurred while processing the request.",
        }
    }

    /// Looks up a code by its wire name.
    pub fn from_wire(code: &str) -> Option<Self> {
        [
            ErrorCode::AuthenticationFailed,
            ErrorCode::AuthorizationFailure,
            ErrorCode::InternalError,
            ErrorCode::InvalidHeaderValue,
            ErrorCode::InvalidQueryParameterValue,
            ErrorCode::InvalidXmlDocument,
            ErrorCode::InvalidXmlNodeValue,
            ErrorCode::MissingRequiredXmlNode,
            ErrorCode::OutOfRangeInput,
            ErrorCode::ResourceNotFound,
            ErrorCode::UnsupportedHttpVerb,
            ErrorCode::UnsupportedXmlNode,
        ]
        .into_iter()
        .find(|c| c.as_str() == code)
    }
}

/// Storage error with code and message.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct StorageError {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl StorageError {
    /// Creates a new storage error with the given code and default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.default_message().to_string(),
            code,
            request_id: None,
        }
    }

    /// Creates a new storage error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: None,
        }
    }

    /// Sets the request ID for this error.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Converts the error to an XML error response body.
    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?><Error><Code>{}</Code><Message>{}</Message></Error>"#,
            self.code.as_str(),
            xml_escape(&self.message)
        )
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let request_id = self
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");

        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Error>
  <Code>{}</Code>
  <Message>{}
RequestId:{}
Time:{}</Message>
</Error>"#,
            self.code.as_str(),
            xml_escape(&self.message),
            request_id,
            timestamp
        );

        let mut response = (
            status,
            [
                ("Content-Type", "application/xml".to_string()),
                ("x-ms-request-id", request_id),
                ("x-ms-version", crate::config::DEFAULT_API_VERSION.to_string()),
                ("x-ms-error-code", self.code.as_str().to_string()),
            ],
            xml,
        )
            .into_response();

        // Clients read the message from the status line.
        if let Ok(reason) = ReasonPhrase::try_from(self.message.as_bytes()) {
            response.extensions_mut().insert(reason);
        }

        response
    }
}

/// Escapes special XML characters in a string.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service answered with an error response.
    #[error("service rejected request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("http transport failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("credentials rejected locally: {0}")]
    Credentials(String),
}

impl From<StorageError> for TransportError {
    fn from(err: StorageError) -> Self {
        TransportError::Rejected {
            status: err.code.status_code().as_u16(),
            code: err.code.as_str().to_string(),
            message: err.message,
        }
    }
}

/// Errors surfaced by the service properties client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The target service variant cannot pin a default service version.
    #[error("the {variant} service does not support DefaultServiceVersion")]
    CapabilityRejected { variant: ServiceVariant },

    /// A value would not survive the document encoding unchanged.
    #[error("service properties cannot be encoded: {0}")]
    InvalidProperties(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The downloaded document broke the document contract.
    #[error("malformed service properties response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
