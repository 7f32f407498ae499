//! Integration tests using wiremock to exercise the HTTP transport end to end.

use dogpatch::executor::SerialQueue;
use dogpatch::transport::{Cancelled, CompletionHandler, HttpTransport, Transport, TransportTask};
use dogpatch::{Client, Dog, Error, Fetched};
use serde_json::error::Category;
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOGS_RESPONSE: &[u8] = include_bytes!("fixtures/get_dogs_response.json");
const DOGS_MISSING_VALUES_RESPONSE: &[u8] =
    include_bytes!("fixtures/get_dogs_missing_values_response.json");

fn base_url(server: &MockServer) -> String {
    format!("{}/api/v1/", server.uri())
}

fn client_for(server: &MockServer) -> Client<HttpTransport> {
    Client::new(base_url(server), HttpTransport::new().unwrap(), None).unwrap()
}

async fn wait_for<T>(rx: oneshot::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("completion not delivered in time")
        .expect("completion handler dropped")
}

async fn fetch_dogs(client: &Client<HttpTransport>) -> Fetched<Dog> {
    let (tx, rx) = oneshot::channel();
    client.get_dogs(move |outcome| {
        let _ = tx.send(outcome);
    });
    wait_for(rx).await
}

async fn mount_dogs(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/v1/dogs"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_get_dogs() {
    let mock_server = MockServer::start().await;
    mount_dogs(
        &mock_server,
        ResponseTemplate::new(200).set_body_raw(DOGS_RESPONSE, "application/json"),
    )
    .await;

    let expected: Vec<Dog> = serde_json::from_slice(DOGS_RESPONSE).unwrap();
    let dogs = fetch_dogs(&client_for(&mock_server)).await.unwrap();

    assert_eq!(dogs, Some(expected));
}

#[tokio::test]
async fn test_server_error_yields_no_data_and_no_error() {
    let mock_server = MockServer::start().await;
    mount_dogs(
        &mock_server,
        ResponseTemplate::new(500).set_body_string("Server error"),
    )
    .await;

    let outcome = fetch_dogs(&client_for(&mock_server)).await;

    assert!(matches!(outcome, Ok(None)), "got {:?}", outcome);
}

#[tokio::test]
async fn test_not_found_yields_no_data_and_no_error() {
    let mock_server = MockServer::start().await;
    mount_dogs(&mock_server, ResponseTemplate::new(404).set_body_string("Not found")).await;

    let outcome = fetch_dogs(&client_for(&mock_server)).await;

    assert!(matches!(outcome, Ok(None)), "got {:?}", outcome);
}

#[tokio::test]
async fn test_missing_fields_fail_whole_collection() {
    let mock_server = MockServer::start().await;
    mount_dogs(
        &mock_server,
        ResponseTemplate::new(200).set_body_raw(DOGS_MISSING_VALUES_RESPONSE, "application/json"),
    )
    .await;

    let err = fetch_dogs(&client_for(&mock_server)).await.unwrap_err();

    match err {
        Error::DeserializationFailed {
            ref raw_response,
            status,
            ..
        } => {
            assert_eq!(status.as_u16(), 200);
            assert!(raw_response.contains("Rocket"));
        }
        _ => panic!("Expected DeserializationFailed, got {:?}", err),
    }
    assert_eq!(err.decode_category(), Some(Category::Data));
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let mock_server = MockServer::start().await;
    mount_dogs(&mock_server, ResponseTemplate::new(200).set_body_string("invalid json")).await;

    let err = fetch_dogs(&client_for(&mock_server)).await.unwrap_err();

    assert_eq!(err.decode_category(), Some(Category::Syntax));
    assert_eq!(err.raw_response(), Some("invalid json"));
}

#[tokio::test]
async fn test_empty_success_body_is_decode_error() {
    let mock_server = MockServer::start().await;
    mount_dogs(&mock_server, ResponseTemplate::new(204)).await;

    let err = fetch_dogs(&client_for(&mock_server)).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(204));
    assert_eq!(err.decode_category(), Some(Category::Eof));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = Client::new("http://127.0.0.1:1/api/v1/", HttpTransport::new().unwrap(), None)
        .unwrap();

    let err = fetch_dogs(&client).await.unwrap_err();

    let source = err
        .transport_error()
        .and_then(|e| e.downcast_ref::<reqwest::Error>())
        .expect("reqwest error passed through");
    assert!(source.is_connect());
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dogs"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = Client::new(base_url(&mock_server), transport, None).unwrap();

    let err = fetch_dogs(&client).await.unwrap_err();

    let source = err
        .transport_error()
        .and_then(|e| e.downcast_ref::<reqwest::Error>())
        .expect("reqwest error passed through");
    assert!(source.is_timeout());
}

#[tokio::test]
async fn test_default_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dogs"))
        .and(header("user-agent", "dogpatch-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::builder()
        .default_header("User-Agent", "dogpatch-tests")
        .unwrap()
        .build()
        .unwrap();
    let client = Client::new(base_url(&mock_server), transport, None).unwrap();

    let dogs = fetch_dogs(&client).await.unwrap();
    assert_eq!(dogs, Some(Vec::new()));
}

#[test]
fn test_invalid_default_header_is_configuration_error() {
    let result = HttpTransport::builder().default_header("bad header", "value");
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[test]
fn test_transport_requires_runtime() {
    assert!(matches!(
        HttpTransport::new(),
        Err(Error::ConfigurationError(_))
    ));
}

#[tokio::test]
async fn test_cancel_running_task_delivers_cancelled() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/dogs"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let (tx, rx) = oneshot::channel();
    let task = client.get_dogs(move |outcome| {
        let _ = tx.send(outcome);
    });
    task.cancel();

    let err = wait_for(rx).await.unwrap_err();
    assert_eq!(
        err.transport_error().and_then(|e| e.downcast_ref::<Cancelled>()),
        Some(&Cancelled)
    );
}

fn sender_handler(tx: oneshot::Sender<Fetched<()>>) -> CompletionHandler {
    Box::new(move |envelope| {
        let outcome = match envelope.error {
            Some(e) => Err(Error::Transport(e)),
            None => Ok(None),
        };
        let _ = tx.send(outcome);
    })
}

#[tokio::test]
async fn test_cancel_before_start_never_hits_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let url = url::Url::parse(&base_url(&mock_server)).unwrap().join("dogs").unwrap();
    let (tx, rx) = oneshot::channel();

    let task = transport.create_task(url, sender_handler(tx));
    task.cancel();
    task.start();

    let err = wait_for(rx).await.unwrap_err();
    assert!(err
        .transport_error()
        .and_then(|e| e.downcast_ref::<Cancelled>())
        .is_some());
}

#[tokio::test]
async fn test_second_start_is_ignored() {
    let mock_server = MockServer::start().await;
    mount_dogs(&mock_server, ResponseTemplate::new(200).set_body_string("[]")).await;

    let transport = HttpTransport::new().unwrap();
    let url = url::Url::parse(&base_url(&mock_server)).unwrap().join("dogs").unwrap();
    let (tx, rx) = oneshot::channel();

    let task = transport.create_task(url.clone(), sender_handler(tx));
    assert_eq!(task.url(), &url);
    task.start();
    task.start();

    assert!(matches!(wait_for(rx).await, Ok(None)));
}

#[tokio::test]
async fn test_serial_queue_receives_completion() {
    let mock_server = MockServer::start().await;
    mount_dogs(
        &mock_server,
        ResponseTemplate::new(200).set_body_raw(DOGS_RESPONSE, "application/json"),
    )
    .await;

    let queue = std::sync::Arc::new(SerialQueue::new("dogpatch-ui").unwrap());
    let client = Client::new(base_url(&mock_server), HttpTransport::new().unwrap(), Some(queue))
        .unwrap();

    let (tx, rx) = oneshot::channel();
    client.get_dogs(move |outcome| {
        let name = std::thread::current().name().map(str::to_owned);
        let _ = tx.send((name, outcome.map(|dogs| dogs.map(|d| d.len()))));
    });

    let (name, outcome) = wait_for(rx).await;
    assert_eq!(name.as_deref(), Some("dogpatch-ui"));
    assert_eq!(outcome.unwrap(), Some(2));
}
