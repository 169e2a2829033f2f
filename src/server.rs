//! HTTP server hosting the blob, queue and table service endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::models::{CapabilityPolicy, ServiceVariant};
use crate::router::{create_router, AppState};
use crate::service::PropertiesService;
use crate::storage::{MemoryPropertiesStore, PropertiesStore};

type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Storage service properties server.
pub struct PropertiesServer {
    config: Arc<Config>,
    service: PropertiesService,
}

impl PropertiesServer {
    /// Creates a new server with in-memory storage.
    pub fn new(config: Config) -> Self {
        Self::with_storage(
            config,
            Arc::new(MemoryPropertiesStore::new()),
            CapabilityPolicy::STANDARD,
        )
    }

    /// Creates a new server with custom storage and capability table.
    pub fn with_storage(
        config: Config,
        store: Arc<dyn PropertiesStore>,
        policy: CapabilityPolicy,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service: PropertiesService::new(store, policy),
        }
    }

    /// Returns the service pipeline shared by all endpoints.
    pub fn service(&self) -> &PropertiesService {
        &self.service
    }

    /// Seeds configured properties, binds every endpoint and serves until
    /// one of them fails.
    pub async fn run(self) -> ServerResult<()> {
        if let Some(props) = self.config.initial_properties()? {
            for account in &self.config.accounts {
                self.service.seed(&account.name, &props).await?;
            }
            info!("Loaded initial service properties");
        }

        let blob = self.bind(ServiceVariant::Blob).await?;
        let queue = self.bind(ServiceVariant::Queue).await?;
        let table = self.bind(ServiceVariant::Table).await?;

        info!(
            "Default account: {}",
            self.config.accounts.first().map(|a| a.name.as_str()).unwrap_or("unknown")
        );

        tokio::try_join!(
            self.serve(ServiceVariant::Blob, blob),
            self.serve(ServiceVariant::Queue, queue),
            self.serve(ServiceVariant::Table, table),
        )?;

        Ok(())
    }

    async fn bind(&self, variant: ServiceVariant) -> ServerResult<TcpListener> {
        let addr: SocketAddr = self.config.bind_address(variant).parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Azurite {} service is starting at http://{}", variant, addr);
        Ok(listener)
    }

    async fn serve(&self, variant: ServiceVariant, listener: TcpListener) -> ServerResult<()> {
        let state = AppState {
            config: self.config.clone(),
            variant,
            service: self.service.clone(),
        };
        let app = create_router(state).layer(TraceLayer::new_for_http());
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Returns the bind address of the given service.
    pub fn bind_address(&self, variant: ServiceVariant) -> String {
        self.config.bind_address(variant)
    }

    /// Returns the base URL of the given service.
    pub fn base_url(&self, variant: ServiceVariant) -> String {
        format!("http://{}", self.bind_address(variant))
    }
}

/// Builder for creating a properties server.
pub struct PropertiesServerBuilder {
    config: Config,
    store: Option<Arc<dyn PropertiesStore>>,
    policy: CapabilityPolicy,
}

impl PropertiesServerBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            store: None,
            policy: CapabilityPolicy::STANDARD,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the port of one service.
    pub fn port(mut self, variant: ServiceVariant, port: u16) -> Self {
        match variant {
            ServiceVariant::Blob => self.config.blob_port = port,
            ServiceVariant::Queue => self.config.queue_port = port,
            ServiceVariant::Table => self.config.table_port = port,
        }
        self
    }

    /// Rejects unsigned requests.
    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.config.require_auth = require_auth;
        self
    }

    /// Sets the properties store.
    pub fn store(mut self, store: Arc<dyn PropertiesStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the capability table.
    pub fn policy(mut self, policy: CapabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the server.
    pub fn build(self) -> PropertiesServer {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryPropertiesStore::new()));
        PropertiesServer::with_storage(self.config, store, self.policy)
    }
}

impl Default for PropertiesServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
