//! Integration tests for `TwitterClient` using wiremock HTTP mocks.

use hashmood_core::parse_bot_config;
use hashmood_sentiment::{EventStream, SentimentError, StatusPublisher, StreamItem};
use hashmood_twitter::{TwitterClient, TwitterError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG: &str = r##"
target_hashtag: "#rustlang"
twitter_credentials:
  twitter_consumer_key: ck
  twitter_consumer_secret: cs
  twitter_access_token: user-token
  twitter_access_token_secret: user-secret
google_app_credentials_file: /dev/null
"##;

fn test_client(base_url: &str) -> TwitterClient {
    let cfg = parse_bot_config(CONFIG).expect("test config");
    TwitterClient::with_base_url(&cfg.twitter_credentials, 30, base_url)
        .expect("client construction should not fail")
}

async fn mount_token(server: &MockServer) {
    // base64("ck:cs")
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(header("authorization", "Basic Y2s6Y3M="))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "bearer",
            "access_token": "app-token"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn app_token_uses_basic_auth() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let token = test_client(&server.uri()).app_token().await.expect("token");
    assert_eq!(token, "app-token");
}

#[tokio::test]
async fn app_token_rejects_unexpected_token_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "mac",
            "access_token": "x"
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri()).app_token().await.unwrap_err();
    assert!(matches!(err, TwitterError::Api { .. }), "got: {err:?}");
}

#[tokio::test]
async fn sync_rules_replaces_stale_rules() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/stream/rules"))
        .and(header("authorization", "Bearer app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": "11", "value": "#oldtopic" }],
            "meta": { "sent": "2024-05-01T12:00:00.000Z", "result_count": 1 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets/search/stream/rules"))
        .and(body_json(serde_json::json!({ "delete": { "ids": ["11"] } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "meta": { "summary": { "deleted": 1 } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets/search/stream/rules"))
        .and(body_json(serde_json::json!({ "add": [{ "value": "#rustlang" }] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": [{ "id": "12", "value": "#rustlang" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server.uri())
        .sync_rules("app-token", "#rustlang")
        .await
        .expect("rules synced");
}

#[tokio::test]
async fn sync_rules_keeps_matching_rule() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/stream/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": "12", "value": "#rustlang" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets/search/stream/rules"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    test_client(&server.uri())
        .sync_rules("app-token", "#rustlang")
        .await
        .expect("rules synced");
}

#[tokio::test]
async fn open_stream_yields_events_and_skips_keep_alives() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/stream/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "meta": { "result_count": 0 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets/search/stream/rules"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let body = concat!(
        "\r\n",
        r##"{"data":{"id":"1","text":"#rustlang is great","lang":"en","created_at":"2024-05-01T12:00:00.000Z"}}"##,
        "\r\n\r\n",
        r#"{"errors":[{"title":"operational-disconnect"}]}"#,
        "\n",
        r#"{"data":{"id":"2","text":"RT @a: #rustlang","lang":"en","referenced_tweets":[{"type":"retweeted","id":"1"}]}}"#,
    );
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/stream"))
        .and(header("authorization", "Bearer app-token"))
        .and(query_param("expansions", "geo.place_id"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let mut stream = client.open_stream("#rustlang").await.expect("stream opens");

    match stream.next_item().await {
        Some(Ok(StreamItem::Event(e))) => {
            assert_eq!(e.text, "#rustlang is great");
            assert_eq!(e.lang, "en");
            assert!(!e.is_reshare);
        }
        other => panic!("expected first event, got {other:?}"),
    }
    assert_eq!(
        stream.next_item().await.expect("item").expect("ok"),
        StreamItem::Unrecognized("error payload: operational-disconnect".to_owned())
    );
    match stream.next_item().await {
        Some(Ok(StreamItem::Event(e))) => assert!(e.is_reshare),
        other => panic!("expected trailing reshare, got {other:?}"),
    }
    assert!(stream.next_item().await.is_none());
}

#[tokio::test]
async fn open_stream_surfaces_rate_limit_as_transient() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/stream/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets/search/stream/rules"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/stream"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .open_stream("#rustlang")
        .await
        .unwrap_err();
    assert!(
        matches!(err, TwitterError::Api { status: 429, .. }),
        "got: {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn post_status_is_signed_with_user_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header_regex("authorization", r"^OAuth oauth_consumer_key="))
        .and(header_regex("authorization", r#"oauth_token="user-token""#))
        .and(header_regex(
            "authorization",
            r#"oauth_signature="[A-Za-z0-9%]+", oauth_signature_method="HMAC-SHA1""#,
        ))
        .and(body_json(serde_json::json!({ "text": "hello" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": { "id": "1790000000000000000", "text": "hello" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = test_client(&server.uri())
        .post_status("hello")
        .await
        .expect("posted");
    assert_eq!(id, "1790000000000000000");
}

#[tokio::test]
async fn publish_maps_forbidden_to_permanent_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "title": "Forbidden",
            "detail": "You are not permitted to perform this action."
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .publish("hello")
        .await
        .unwrap_err();
    match err {
        SentimentError::Publish { message, retriable } => {
            assert!(!retriable);
            assert!(message.contains("403"), "{message}");
        }
        other => panic!("expected publish error, got {other:?}"),
    }
}

#[tokio::test]
async fn publish_maps_unavailable_to_retriable_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .publish("hello")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SentimentError::Publish {
            retriable: true,
            ..
        }
    ));
}

/// Reads one request and returns its request line.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];
    while !raw.ends_with(b"\r\n\r\n") {
        if socket.read(&mut byte).await.unwrap() == 0 {
            break;
        }
        raw.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&raw).into_owned();
    let length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map_or(0, |(_, v)| v.trim().parse::<usize>().unwrap());
    let mut body = vec![0u8; length];
    socket.read_exact(&mut body).await.unwrap();
    head.lines().next().unwrap_or_default().to_owned()
}

/// API stub whose stream sends one keep-alive and then goes silent.
async fn spawn_stalling_api() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let request_line = read_request(&mut socket).await;
                let body = if request_line.starts_with("POST /oauth2/token") {
                    r#"{"token_type":"bearer","access_token":"app-token"}"#
                } else if request_line.contains("/2/tweets/search/stream/rules") {
                    r##"{"data":[{"id":"12","value":"#rustlang"}]}"##
                } else {
                    socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\n\
                              content-type: application/json\r\n\
                              transfer-encoding: chunked\r\n\r\n\
                              2\r\n\r\n\r\n",
                        )
                        .await
                        .unwrap();
                    std::future::pending::<()>().await;
                    return;
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn stalled_stream_ends_with_retriable_error() {
    let base_url = spawn_stalling_api().await;
    let client = test_client(&base_url)
        .with_stream_read_timeout(Duration::from_millis(300))
        .expect("stream client");

    let mut stream = client.open_stream("#rustlang").await.expect("stream opens");
    let next = tokio::time::timeout(Duration::from_secs(10), stream.next_item())
        .await
        .expect("read timeout should fire before the test deadline");
    match next {
        Some(Err(SentimentError::Stream { retriable, .. })) => assert!(retriable),
        other => panic!("expected retriable stream error, got {other:?}"),
    }
}
