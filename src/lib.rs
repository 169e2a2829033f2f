//! azurite-props: storage service properties for the blob, queue and table
//! services.
//!
//! The crate has two halves. [`ServicePropertiesClient`] uploads a selected
//! subset of the property groups (logging, hour and minute metrics, CORS
//! and the default service version) and downloads the full document. The
//! emulator ([`PropertiesServer`]) stores one document per account and
//! service and applies uploads group by group.
//!
//! # Example
//!
//! ```no_run
//! use azurite_props::{
//!     AccountCredentials, PropertyGroupSelector, ServiceProperties, ServicePropertiesClient,
//!     ServiceVariant,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ServicePropertiesClient::http(
//!         ServiceVariant::Blob,
//!         "http://127.0.0.1:10000",
//!         AccountCredentials::devstore(),
//!     )?;
//!
//!     let mut props = client.download().await?;
//!     props.logging.read = true;
//!     client
//!         .upload(&props, PropertyGroupSelector::none().with_logging(true))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod server;
pub mod service;
pub mod storage;
pub mod transport;
pub mod xml;

// Re-exports for convenience
pub use client::ServicePropertiesClient;
pub use config::{Args, Config, DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY};
pub use error::{ClientError, ClientResult, ErrorCode, StorageError, StorageResult, TransportError};
pub use models::{
    CapabilityPolicy, CorsMethod, CorsRule, LoggingSettings, MetricsSettings,
    PropertyGroupSelector, RetentionPolicy, ServiceProperties, ServicePropertiesPatch,
    ServiceVariant,
};
pub use server::{PropertiesServer, PropertiesServerBuilder};
pub use service::PropertiesService;
pub use storage::{MemoryPropertiesStore, PropertiesStore};
pub use transport::{AccountCredentials, HttpTransport, LocalTransport, Transport};
