//! ClientSession Integration Tests
//!
//! Tests for:
//! - Status classification over real HTTP
//! - JSON / non-JSON success bodies
//! - Transport failures (refused, timeout, dropped connection, truncated body)
//! - Default and caller headers
//! - Concurrency limit and close semantics

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cio_client::{Auth, ClientSession, Error, ErrorKind, RequestDescription, SessionConfig};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{init_tracing, session_config};

fn session(uri: &str) -> ClientSession {
    init_tracing();
    ClientSession::new(uri, session_config()).unwrap()
}

#[tokio::test]
async fn test_success_with_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/events"))
        .and(body_json(json!({"name": "signup"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    let request = RequestDescription::post(["api", "v1", "events"]).with_body(json!({"name": "signup"}));

    let response = session.send(&request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, Some(json!({"ok": true})));
}

#[tokio::test]
async fn test_success_without_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/text"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());

    let response = session.send(&RequestDescription::get(["text"])).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, None);

    let response = session.send(&RequestDescription::delete(["empty"])).await.unwrap();
    assert_eq!(response.status, 204);
    assert_eq!(response.body, None);
}

#[tokio::test]
async fn test_status_classification() {
    let mock_server = MockServer::start().await;
    let cases = [
        (400u16, ErrorKind::Fatal),
        (401, ErrorKind::Fatal),
        (404, ErrorKind::Fatal),
        (422, ErrorKind::Fatal),
        (429, ErrorKind::Retryable),
        (500, ErrorKind::Retryable),
        (502, ErrorKind::Retryable),
        (503, ErrorKind::Retryable),
        (504, ErrorKind::Retryable),
    ];

    for (status, _) in cases {
        Mock::given(method("GET"))
            .and(path(format!("/status/{}", status)))
            .respond_with(ResponseTemplate::new(status).set_body_string(format!("failed with {}", status)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let session = session(&mock_server.uri());

    for (status, expected) in cases {
        let request = RequestDescription::get(["status".to_string(), status.to_string()]);
        let err = session.send(&request).await.unwrap_err();

        assert_eq!(err.kind(), expected, "status {}", status);
        assert_eq!(err.status(), Some(status));
        assert!(err.to_string().contains(&format!("failed with {}", status)));
    }
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    let err = session.send(&RequestDescription::post(["limited"])).await.unwrap_err();

    match err {
        Error::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_json_success_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{broken", "application/json"))
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    let err = session.send(&RequestDescription::get(["broken"])).await.unwrap_err();

    assert!(matches!(err, Error::Json(_)));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn test_connection_refused_is_retryable() {
    // nothing listens on port 1
    let session = session("http://127.0.0.1:1");

    let err = session.send(&RequestDescription::get(["ping"])).await.unwrap_err();

    assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Retryable);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_timeout_is_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    init_tracing();
    let session = ClientSession::new(
        &mock_server.uri(),
        SessionConfig::default().with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = session.send(&RequestDescription::get(["slow"])).await.unwrap_err();

    assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
    assert!(err.is_retryable());
}

/// Accept one connection, read the request, write `reply` and hang up
async fn one_shot_server(reply: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket.write_all(reply).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_connection_dropped_before_response_is_retryable() {
    let uri = one_shot_server(b"").await;
    let session = session(&uri);

    let err = session.send(&RequestDescription::get(["ping"])).await.unwrap_err();

    assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Retryable);
}

#[tokio::test]
async fn test_truncated_body_is_retryable() {
    let uri = one_shot_server(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"ok\"",
    )
    .await;
    let session = session(&uri);

    let err = session.send(&RequestDescription::get(["ping"])).await.unwrap_err();

    assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::Retryable);
}

#[tokio::test]
async fn test_default_headers_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header_exists("x-request-id"))
        .and(header_exists("x-timestamp"))
        .and(header(
            "user-agent",
            format!("cio-client/{}", env!("CARGO_PKG_VERSION")).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    session.send(&RequestDescription::get(["ping"])).await.unwrap();
}

#[tokio::test]
async fn test_auth_and_caller_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/basic"))
        .and(header("authorization", "Basic c2l0ZTprZXk="))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bearer"))
        .and(header("authorization", "Bearer app-key"))
        .and(header("user-agent", "caller/1.0"))
        .and(header("x-custom", "yes"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());

    session
        .send(&RequestDescription::get(["basic"]).with_auth(Auth::basic("site", "key")))
        .await
        .unwrap();

    let request = RequestDescription::get(["bearer"])
        .with_auth(Auth::bearer("app-key"))
        .with_header(
            HeaderName::from_static("user-agent"),
            HeaderValue::from_static("caller/1.0"),
        )
        .with_header(HeaderName::from_static("x-custom"), HeaderValue::from_static("yes"));
    session.send(&request).await.unwrap();
}

#[tokio::test]
async fn test_path_and_query_encoding() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customers/a%2Fb%20c"))
        .and(query_param("email", "jane+doe@example.com"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    let request = RequestDescription::get(["customers", "a/b c"]).with_query("email", "jane+doe@example.com");

    session.send(&request).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_ids() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .expect(20)
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    let request = RequestDescription::get(["ping"]);

    let results = futures::future::join_all((0..20).map(|_| session.send(&request))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let received = mock_server.received_requests().await.unwrap();
    let ids: HashSet<String> = received
        .iter()
        .map(|r| r.headers.get("x-request-id").unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_max_connections_bounds_in_flight_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .expect(6)
        .mount(&mock_server)
        .await;

    init_tracing();
    let session = Arc::new(
        ClientSession::new(&mock_server.uri(), session_config().with_limits(2, 2)).unwrap(),
    );

    let started = Instant::now();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move { session.send(&RequestDescription::get(["slow"])).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // six calls, two at a time, 200ms each
    assert!(started.elapsed() >= Duration::from_millis(550), "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn test_send_after_close_issues_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = session(&mock_server.uri());
    session.send(&RequestDescription::get(["ping"])).await.unwrap();

    session.close();
    session.close();

    let err = session.send(&RequestDescription::get(["ping"])).await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn test_close_fails_sends_waiting_for_a_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&mock_server)
        .await;

    init_tracing();
    let session = Arc::new(
        ClientSession::new(&mock_server.uri(), session_config().with_limits(1, 1)).unwrap(),
    );

    let in_flight = {
        let session = session.clone();
        tokio::spawn(async move { session.send(&RequestDescription::get(["slow"])).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let queued = {
        let session = session.clone();
        tokio::spawn(async move { session.send(&RequestDescription::get(["slow"])).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    session.close();

    let err = tokio::time::timeout(Duration::from_millis(200), queued)
        .await
        .expect("queued send should fail without waiting for the slot")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed));

    // the call that already held the slot completes on its own handle
    in_flight.await.unwrap().unwrap();
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}
