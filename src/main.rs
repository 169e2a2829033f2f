//! azurite-props: storage service properties emulator.
//!
//! Serves the blob, queue and table service properties endpoints.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use azurite_props::{
    Args, Config, PropertiesServer, ServiceVariant, DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from(args);
    let server = PropertiesServer::new(config);

    println!(
        r#"
Azurite Blob service is starting at {}
Azurite Queue service is starting at {}
Azurite Table service is starting at {}

Default account: {account}
Default key: {key}

Connection string:
DefaultEndpointsProtocol=http;AccountName={account};AccountKey={key};BlobEndpoint={}/{account};QueueEndpoint={}/{account};TableEndpoint={}/{account};

Press Ctrl+C to stop the server.
"#,
        server.bind_address(ServiceVariant::Blob),
        server.bind_address(ServiceVariant::Queue),
        server.bind_address(ServiceVariant::Table),
        server.base_url(ServiceVariant::Blob),
        server.base_url(ServiceVariant::Queue),
        server.base_url(ServiceVariant::Table),
        account = DEFAULT_ACCOUNT,
        key = DEFAULT_ACCOUNT_KEY,
    );

    server.run().await
}
