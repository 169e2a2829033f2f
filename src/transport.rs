//! Transports carrying service properties documents to a storage service.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Method, Response};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::auth::SignableRequest;
use crate::config::{DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY, DEFAULT_API_VERSION};
use crate::context::format_http_date;
use crate::error::TransportError;
use crate::models::ServiceVariant;
use crate::service::PropertiesService;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Moves serialized properties documents to and from one service.
///
/// The body of `put_properties` already encodes which groups are selected:
/// absent groups are simply not in the document.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a (possibly partial) properties document.
    async fn put_properties(&self, body: String) -> Result<(), TransportError>;

    /// Fetches the full properties document.
    async fn get_properties(&self) -> Result<String, TransportError>;
}

/// Account name and optional SharedKey used to reach a service.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: String,
    pub key: Option<String>,
}

impl AccountCredentials {
    pub fn shared_key(account: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            key: Some(key.into()),
        }
    }

    /// Unsigned requests against `account`.
    pub fn anonymous(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            key: None,
        }
    }

    /// The well-known development storage account.
    pub fn devstore() -> Self {
        Self::shared_key(DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY)
    }
}

/// Talks to a storage endpoint over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    credentials: AccountCredentials,
}

impl HttpTransport {
    /// Creates a transport for `{endpoint}/{account}`.
    pub fn new(endpoint: &str, credentials: AccountCredentials) -> Result<Self, TransportError> {
        if let Some(ref key) = credentials.key {
            BASE64.decode(key).map_err(|e| {
                TransportError::Credentials(format!("account key is not base64: {}", e))
            })?;
        }

        let mut url = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if url.cannot_be_a_base() {
            return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
        }
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidEndpoint(endpoint.to_string()))?
            .pop_if_empty()
            .push(&credentials.account);
        url.query_pairs_mut()
            .append_pair("restype", "service")
            .append_pair("comp", "properties");

        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            url,
            credentials,
        })
    }

    /// Returns the properties URL requests are sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn headers(&self, method: &Method, body: Option<&str>) -> Result<HeaderMap, TransportError> {
        let mut signed = BTreeMap::new();
        signed.insert("x-ms-version".to_string(), DEFAULT_API_VERSION.to_string());
        signed.insert("x-ms-date".to_string(), format_http_date(&Utc::now()));
        if let Some(body) = body {
            signed.insert("content-length".to_string(), body.len().to_string());
            signed.insert("content-type".to_string(), "application/xml".to_string());
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &signed {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Credentials(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Credentials(e.to_string()))?;
            headers.insert(name, value);
        }
        // reqwest writes Content-Length itself.
        headers.remove(CONTENT_LENGTH);

        if let Some(ref key) = self.credentials.key {
            let request = SignableRequest {
                method: method.as_str().to_string(),
                account: self.credentials.account.clone(),
                path: self.url.path().to_string(),
                query: self
                    .url
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
                headers: signed,
            };
            let authorization = request
                .authorization(key)
                .map_err(|e| TransportError::Credentials(e.message))?;
            let value = HeaderValue::from_str(&authorization)
                .map_err(|e| TransportError::Credentials(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put_properties(&self, body: String) -> Result<(), TransportError> {
        let headers = self.headers(&Method::PUT, Some(&body))?;
        debug!(url = %self.url, bytes = body.len(), "PUT service properties");

        let response = self
            .client
            .put(self.url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn get_properties(&self) -> Result<String, TransportError> {
        let headers = self.headers(&Method::GET, None)?;
        debug!(url = %self.url, "GET service properties");

        let response = self.client.get(self.url.clone()).headers(headers).send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }
}

/// Turns an error response into [`TransportError::Rejected`].
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = response.text().await.unwrap_or_default();
    let (body_code, message) = parse_error_body(&body);

    Err(TransportError::Rejected {
        status: status.as_u16(),
        code: header_code
            .or(body_code)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
        message: message.unwrap_or(body),
    })
}

/// Extracts `Code` and the first line of `Message` from an error document.
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    let mut code = None;
    let mut message = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => break,
                };
                match current.as_deref() {
                    Some(b"Code") => code = Some(text),
                    Some(b"Message") => {
                        message = text.lines().next().map(|l| l.trim().to_string())
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (code, message)
}

/// Drives a [`PropertiesService`] in process, through the same XML documents
/// an HTTP client would exchange.
#[derive(Clone)]
pub struct LocalTransport {
    service: PropertiesService,
    account: String,
    variant: ServiceVariant,
}

impl LocalTransport {
    pub fn new(
        service: PropertiesService,
        account: impl Into<String>,
        variant: ServiceVariant,
    ) -> Self {
        Self {
            service,
            account: account.into(),
            variant,
        }
    }

    pub fn service(&self) -> &PropertiesService {
        &self.service
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn put_properties(&self, body: String) -> Result<(), TransportError> {
        self.service
            .set_document(&self.account, self.variant, &body)
            .await?;
        Ok(())
    }

    async fn get_properties(&self) -> Result<String, TransportError> {
        Ok(self.service.get_document(&self.account, self.variant).await?)
    }
}
