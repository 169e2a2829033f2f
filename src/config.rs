//! Emulator configuration.

use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{
    ServiceProperties, ServiceVariant, DEFAULT_BLOB_PORT, DEFAULT_QUEUE_PORT, DEFAULT_TABLE_PORT,
};

/// Default account name for development storage.
pub const DEFAULT_ACCOUNT: &str = "devstoreaccount1";

/// Default account key for development storage (base64 encoded).
pub const DEFAULT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "2021-10-04";

/// Command-line arguments for the emulator.
#[derive(Parser, Debug, Clone)]
#[command(name = "azurite-props")]
#[command(about = "Storage service properties emulator in Rust")]
#[command(version)]
pub struct Args {
    /// Host address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port for blob service.
    #[arg(long, default_value_t = DEFAULT_BLOB_PORT)]
    pub blob_port: u16,

    /// Port for queue service.
    #[arg(long, default_value_t = DEFAULT_QUEUE_PORT)]
    pub queue_port: u16,

    /// Port for table service.
    #[arg(long, default_value_t = DEFAULT_TABLE_PORT)]
    pub table_port: u16,

    /// JSON file with service properties to preload on every service.
    #[arg(long, short = 'p')]
    pub properties: Option<PathBuf>,

    /// Reject requests without a SharedKey signature.
    #[arg(long)]
    pub require_auth: bool,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (minimal logging).
    #[arg(long, short = 's')]
    pub silent: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            blob_port: DEFAULT_BLOB_PORT,
            queue_port: DEFAULT_QUEUE_PORT,
            table_port: DEFAULT_TABLE_PORT,
            properties: None,
            require_auth: false,
            debug: false,
            silent: false,
        }
    }
}

/// Emulator configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port for blob service.
    pub blob_port: u16,
    /// Port for queue service.
    pub queue_port: u16,
    /// Port for table service.
    pub table_port: u16,
    /// Seed file for the initial service properties.
    pub properties_file: Option<PathBuf>,
    /// Reject anonymous requests.
    pub require_auth: bool,
    /// Default account credentials.
    pub accounts: Vec<AccountConfig>,
}

/// Account configuration.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub name: String,
    pub key: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ACCOUNT.to_string(),
            key: DEFAULT_ACCOUNT_KEY.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            blob_port: DEFAULT_BLOB_PORT,
            queue_port: DEFAULT_QUEUE_PORT,
            table_port: DEFAULT_TABLE_PORT,
            properties_file: None,
            require_auth: false,
            accounts: vec![AccountConfig::default()],
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            blob_port: args.blob_port,
            queue_port: args.queue_port,
            table_port: args.table_port,
            properties_file: args.properties,
            require_auth: args.require_auth,
            accounts: vec![AccountConfig::default()],
        }
    }
}

/// Failure to load the properties seed file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    /// Returns the account key for the given account name.
    pub fn get_account_key(&self, account: &str) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.name == account)
            .map(|a| a.key.as_str())
    }

    /// Returns the port of the given service.
    pub fn port(&self, variant: ServiceVariant) -> u16 {
        match variant {
            ServiceVariant::Blob => self.blob_port,
            ServiceVariant::Queue => self.queue_port,
            ServiceVariant::Table => self.table_port,
        }
    }

    /// Returns the bind address for the given service.
    pub fn bind_address(&self, variant: ServiceVariant) -> String {
        format!("{}:{}", self.host, self.port(variant))
    }

    /// Loads the seed properties, if a seed file is configured.
    pub fn initial_properties(&self) -> Result<Option<ServiceProperties>, ConfigError> {
        self.properties_file
            .as_deref()
            .map(load_properties_file)
            .transpose()
    }
}

/// Reads a JSON-encoded `ServiceProperties` document.
pub fn load_properties_file(path: &Path) -> Result<ServiceProperties, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CorsMethod;
    use std::io::Write;

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from(["azurite-props", "--queue-port", "20001", "--require-auth"]);
        let config = Config::from(args);
        assert_eq!(config.port(ServiceVariant::Queue), 20001);
        assert_eq!(config.bind_address(ServiceVariant::Blob), "127.0.0.1:10000");
        assert!(config.require_auth);
        assert_eq!(config.get_account_key(DEFAULT_ACCOUNT), Some(DEFAULT_ACCOUNT_KEY));
    }

    #[test]
    fn test_load_properties_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut props = ServiceProperties::default();
        props.logging.read = true;
        props.cors.push(crate::models::CorsRule {
            allowed_origins: vec!["*".into()],
            allowed_methods: vec![CorsMethod::Get, CorsMethod::Options],
            max_age_in_seconds: 60,
            ..Default::default()
        });
        file.write_all(serde_json::to_string(&props).unwrap().as_bytes())
            .unwrap();

        let config = Config {
            properties_file: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        assert_eq!(config.initial_properties().unwrap(), Some(props));
    }

    #[test]
    fn test_load_properties_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            load_properties_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert!(Config::default().initial_properties().unwrap().is_none());
    }
}
