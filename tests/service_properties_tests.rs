//! Service properties round trips through the HTTP client.

mod common;

use common::*;

use azurite_props::{
    AccountCredentials, ClientError, PropertyGroupSelector, ServiceProperties,
    ServicePropertiesClient, ServiceVariant, TransportError,
};

async fn check(client: &ServicePropertiesClient, expected: &ServiceProperties) {
    let actual = client.download().await.unwrap();
    let mismatches = expected.diff(&actual);
    assert!(mismatches.is_empty(), "{}: {:?}", client.variant(), mismatches);
}

async fn test_service_properties(client: ServicePropertiesClient, version_supported: bool) {
    let mut props = ServiceProperties {
        logging: logging_1(),
        hour_metrics: metrics_1(),
        minute_metrics: metrics_2(),
        cors: vec![cors_rule_1(), cors_rule_2()],
        default_service_version: None,
    };
    let mut temp = ServiceProperties {
        logging: logging_2(),
        hour_metrics: metrics_2(),
        minute_metrics: metrics_1(),
        cors: vec![cors_rule_2()],
        default_service_version: None,
    };

    client.upload(&props, PropertyGroupSelector::all()).await.unwrap();
    check(&client, &props).await;

    // Logging only
    client
        .upload(&temp, PropertyGroupSelector::none().with_logging(true))
        .await
        .unwrap();
    props.logging = logging_2();
    check(&client, &props).await;
    temp.logging = logging_1();

    // Hour metrics only
    client
        .upload(&temp, PropertyGroupSelector::none().with_hour_metrics(true))
        .await
        .unwrap();
    props.hour_metrics = metrics_2();
    check(&client, &props).await;
    temp.hour_metrics = metrics_1();

    // Minute metrics only
    client
        .upload(&temp, PropertyGroupSelector::none().with_minute_metrics(true))
        .await
        .unwrap();
    props.minute_metrics = metrics_1();
    check(&client, &props).await;
    temp.minute_metrics = metrics_2();

    // CORS only: the single uploaded rule replaces both stored rules
    client
        .upload(&temp, PropertyGroupSelector::none().with_cors(true))
        .await
        .unwrap();
    props.cors.remove(0);
    check(&client, &props).await;
    temp.cors.clear();

    // Both metrics plus an empty rule list
    let selector = PropertyGroupSelector::none()
        .with_hour_metrics(true)
        .with_minute_metrics(true)
        .with_cors(true);
    client.upload(&temp, selector).await.unwrap();
    props.hour_metrics = metrics_1();
    props.minute_metrics = metrics_2();
    props.cors.clear();
    check(&client, &props).await;

    let before = client.download().await.unwrap();
    props.default_service_version = Some("2013-08-15".into());
    let result = client.upload(&props, PropertyGroupSelector::all()).await;
    if version_supported {
        result.unwrap();
        check(&client, &props).await;
    } else {
        assert!(matches!(result, Err(ClientError::CapabilityRejected { .. })));
        assert_eq!(client.download().await.unwrap(), before);
    }
}

#[tokio::test]
async fn test_blob_service_properties() {
    let server = TestServer::start().await;
    test_service_properties(server.client(ServiceVariant::Blob), true).await;
}

#[tokio::test]
async fn test_queue_service_properties() {
    let server = TestServer::start().await;
    test_service_properties(server.client(ServiceVariant::Queue), false).await;
}

#[tokio::test]
async fn test_table_service_properties() {
    let server = TestServer::start().await;
    test_service_properties(server.client(ServiceVariant::Table), false).await;
}

#[tokio::test]
async fn test_anonymous_client_against_open_server() {
    let server = TestServer::start().await;
    test_service_properties(server.anonymous_client(ServiceVariant::Blob), true).await;
}

#[tokio::test]
async fn test_services_are_independent() {
    let server = TestServer::start().await;
    let blob = server.client(ServiceVariant::Blob);
    let queue = server.client(ServiceVariant::Queue);

    let props = ServiceProperties {
        logging: logging_1(),
        cors: vec![cors_rule_1()],
        ..ServiceProperties::default()
    };
    blob.upload(&props, PropertyGroupSelector::all()).await.unwrap();

    check(&blob, &props).await;
    check(&queue, &ServiceProperties::default()).await;
}

#[tokio::test]
async fn test_required_auth() {
    let server = TestServer::start_with_auth().await;

    let props = ServiceProperties {
        hour_metrics: metrics_1(),
        ..ServiceProperties::default()
    };
    let signed = server.client(ServiceVariant::Table);
    signed.upload(&props, PropertyGroupSelector::all()).await.unwrap();
    check(&signed, &props).await;

    let err = server
        .anonymous_client(ServiceVariant::Table)
        .download()
        .await
        .unwrap_err();
    match err {
        ClientError::Transport(TransportError::Rejected { status, code, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(code, "AuthenticationFailed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_key_is_rejected() {
    let server = TestServer::start().await;
    let client = ServicePropertiesClient::http(
        ServiceVariant::Blob,
        &server.endpoint(ServiceVariant::Blob),
        AccountCredentials::shared_key(&server.account, "d3Jvbmcga2V5"),
    )
    .unwrap();

    let err = client
        .upload(&ServiceProperties::default(), PropertyGroupSelector::all())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Rejected { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let port = unused_port().await;
    let client = ServicePropertiesClient::http(
        ServiceVariant::Queue,
        &format!("http://127.0.0.1:{}", port),
        AccountCredentials::devstore(),
    )
    .unwrap();

    let err = client.download().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Http(_))));
}
