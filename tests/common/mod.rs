//! Common test utilities.

#![allow(dead_code)]

use std::time::Duration;
use tokio::net::TcpListener;

use azurite_props::{
    AccountCredentials, Config, CorsMethod, CorsRule, LoggingSettings, MetricsSettings,
    PropertiesServer, RetentionPolicy, ServicePropertiesClient, ServiceVariant,
};

/// Test server wrapper.
pub struct TestServer {
    pub host: String,
    pub blob_port: u16,
    pub queue_port: u16,
    pub table_port: u16,
    pub account: String,
    pub key: String,
}

impl TestServer {
    /// Creates and starts a test server on random ports.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts a server that rejects unsigned requests.
    pub async fn start_with_auth() -> Self {
        Self::start_with(|config| config.require_auth = true).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut Config)) -> Self {
        // Hold all three listeners so the ports are distinct.
        let listeners = [
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
            TcpListener::bind("127.0.0.1:0").await.unwrap(),
        ];
        let ports: Vec<u16> = listeners
            .iter()
            .map(|l| l.local_addr().unwrap().port())
            .collect();
        drop(listeners);

        let mut config = Config {
            host: "127.0.0.1".to_string(),
            blob_port: ports[0],
            queue_port: ports[1],
            table_port: ports[2],
            ..Config::default()
        };
        configure(&mut config);

        let account = config.accounts[0].name.clone();
        let key = config.accounts[0].key.clone();
        let server = Self {
            host: config.host.clone(),
            blob_port: config.blob_port,
            queue_port: config.queue_port,
            table_port: config.table_port,
            account,
            key,
        };

        let properties_server = PropertiesServer::new(config);
        tokio::spawn(async move {
            properties_server.run().await.unwrap();
        });

        // Wait for server to be ready
        tokio::time::sleep(Duration::from_millis(100)).await;

        server
    }

    /// Returns the endpoint of one service.
    pub fn endpoint(&self, variant: ServiceVariant) -> String {
        let port = match variant {
            ServiceVariant::Blob => self.blob_port,
            ServiceVariant::Queue => self.queue_port,
            ServiceVariant::Table => self.table_port,
        };
        format!("http://{}:{}", self.host, port)
    }

    /// Returns the service properties URL of one service.
    pub fn properties_url(&self, variant: ServiceVariant) -> String {
        format!(
            "{}/{}?restype=service&comp=properties",
            self.endpoint(variant),
            self.account
        )
    }

    /// Returns a client signing with the account key.
    pub fn client(&self, variant: ServiceVariant) -> ServicePropertiesClient {
        ServicePropertiesClient::http(
            variant,
            &self.endpoint(variant),
            AccountCredentials::shared_key(&self.account, &self.key),
        )
        .unwrap()
    }

    /// Returns a client sending unsigned requests.
    pub fn anonymous_client(&self, variant: ServiceVariant) -> ServicePropertiesClient {
        ServicePropertiesClient::http(
            variant,
            &self.endpoint(variant),
            AccountCredentials::anonymous(&self.account),
        )
        .unwrap()
    }
}

/// Returns a local port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

pub fn logging_1() -> LoggingSettings {
    LoggingSettings {
        read: true,
        retention_policy: RetentionPolicy::days(20),
        ..LoggingSettings::default()
    }
}

pub fn logging_2() -> LoggingSettings {
    LoggingSettings {
        write: true,
        delete: true,
        retention_policy: RetentionPolicy::disabled(),
        ..LoggingSettings::default()
    }
}

pub fn metrics_1() -> MetricsSettings {
    MetricsSettings {
        enabled: true,
        include_apis: Some(false),
        retention_policy: RetentionPolicy::days(5),
        ..MetricsSettings::default()
    }
}

pub fn metrics_2() -> MetricsSettings {
    MetricsSettings {
        enabled: true,
        include_apis: Some(true),
        retention_policy: RetentionPolicy::disabled(),
        ..MetricsSettings::default()
    }
}

pub fn cors_rule_1() -> CorsRule {
    let mut rule = CorsRule {
        allowed_headers: vec!["x-ms-meta-data*".into(), "x-ms-meta-target*".into()],
        allowed_origins: vec!["www.ab.com".into(), "www.bc.com".into()],
        allowed_methods: vec![CorsMethod::Get, CorsMethod::Put],
        exposed_headers: vec!["x-ms-meta-source*".into(), "x-ms-meta-test*".into()],
        ..CorsRule::default()
    };
    rule.set_max_age(Duration::from_secs(5));
    rule
}

pub fn cors_rule_2() -> CorsRule {
    let mut rule = CorsRule {
        allowed_headers: vec!["x-ms-meta-ab*".into()],
        allowed_origins: vec!["*".into()],
        allowed_methods: vec![CorsMethod::Head],
        exposed_headers: vec!["x-ms-meta-abc*".into()],
        ..CorsRule::default()
    };
    rule.set_max_age(Duration::from_secs(25));
    rule
}
