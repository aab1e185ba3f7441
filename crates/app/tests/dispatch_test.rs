//! End-to-end tests for the dispatch path against local servers.
//!
//! HTTP, GraphQL and SSE run against wiremock; WebSocket against a
//! tokio-tungstenite echo server bound to an ephemeral port.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use courier_application::{BulkItem, BulkRunner, CancellationToken, SendRequest, SessionState};
use courier_domain::{
    AuthDescriptor, BodyMode, DispatchOutcome, EngineSettings, EnvironmentVariableSet,
    HttpMethod, NormalizedResponse, Protocol, RequestDraft, SendPhase,
};
use courier_infrastructure::{
    InMemoryHistory, NetworkStreamTransport, ReqwestHttpTransport, SandboxScriptEngine,
    SystemClock,
};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    dispatcher: Arc<SendRequest>,
    history: Arc<InMemoryHistory>,
}

fn harness(settings: EngineSettings) -> Harness {
    let session = SessionState::new(settings);
    session
        .add_environment(
            EnvironmentVariableSet::new("local")
                .with_variable("user", "ada")
                .with_variable("token", "s3cret"),
        )
        .unwrap();
    session.set_active_environment(Some("local")).unwrap();

    let history = Arc::new(InMemoryHistory::new(20));
    let dispatcher = Arc::new(SendRequest::new(
        Arc::new(ReqwestHttpTransport::new().unwrap()),
        Arc::new(NetworkStreamTransport::new()),
        Arc::new(SandboxScriptEngine::new()),
        history.clone(),
        Arc::new(SystemClock::new()),
        Arc::new(session),
    ));
    Harness {
        dispatcher,
        history,
    }
}

async fn send(harness: &Harness, draft: &RequestDraft) -> NormalizedResponse {
    let (_token, cancel) = CancellationToken::new();
    match harness.dispatcher.send(draft, cancel).await.unwrap() {
        DispatchOutcome::Completed(response) => *response,
        DispatchOutcome::Aborted => panic!("send was not expected to abort"),
    }
}

#[tokio::test]
async fn test_http_get_with_variables_auth_and_assertions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/ada"))
        .and(query_param("verbose", "1"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let draft = RequestDraft::new(format!("{}/users/{{{{user}}}}", server.uri()))
        .with_param("verbose", "1")
        .with_auth(AuthDescriptor::Bearer {
            token: "s3cret".to_string(),
        })
        .with_test_script(
            "assert(response.status === 200, 'status ok');\n\
             assert(response.data.name === 'Grace', 'name matches');",
        );

    let response = send(&harness, &draft).await;

    assert_eq!(response.status, Some(200));
    assert_eq!(response.data, json!({"name": "Ada"}));
    assert_eq!(response.assertions.len(), 2);
    assert!(response.assertions[0].ok);
    assert!(!response.assertions[1].ok);
    assert_eq!(harness.dispatcher.phase(), SendPhase::Recorded);

    let records = harness.history.entries();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].environment_name.as_deref(), Some("local"));
    assert!(records[0].request.as_draft().url.ends_with("/users/ada"));
}

#[tokio::test]
async fn test_http_error_status_is_a_normal_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let draft = RequestDraft::new(format!("{}/items/1", server.uri())).with_method(HttpMethod::Delete);

    let response = send(&harness, &draft).await;

    assert_eq!(response.status, Some(404));
    assert_eq!(response.data, json!("missing"));
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_pre_request_script_shapes_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("x-signature", "ada"))
        .and(body_json(json!({"qty": 2})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let draft = RequestDraft::new(format!("{}/orders", server.uri()))
        .with_method(HttpMethod::Post)
        .with_body(BodyMode::Json, r#"{"qty": 1}"#)
        .with_pre_request_script(
            "ctx.setHeader('X-Signature', ctx.env.user);\n\
             const body = JSON.parse(ctx.body);\n\
             ctx.setBody({ qty: body.qty + 1 });",
        );

    let response = send(&harness, &draft).await;

    assert_eq!(response.status, Some(201));
}

#[tokio::test]
async fn test_graphql_posts_query_and_variables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "query": "query($id: ID!) { user(id: $id) { name } }",
            "variables": {"id": "ada"}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"user": {"name": "Ada"}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let draft = RequestDraft::new(format!("{}/graphql", server.uri()))
        .with_protocol(Protocol::Graphql)
        .with_graphql(
            "query($id: ID!) { user(id: $id) { name } }",
            r#"{"id": "{{user}}"}"#,
        );

    let response = send(&harness, &draft).await;

    assert_eq!(response.data["data"]["user"]["name"], json!("Ada"));
}

#[tokio::test]
async fn test_cookies_round_trip_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(204).insert_header("set-cookie", "session=abc; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"me": true})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(EngineSettings {
        with_credentials: true,
        ..EngineSettings::default()
    });

    send(
        &harness,
        &RequestDraft::new(format!("{}/login", server.uri())).with_method(HttpMethod::Post),
    )
    .await;
    let response = send(&harness, &RequestDraft::new(format!("{}/me", server.uri()))).await;

    assert_eq!(response.status, Some(200));
    assert_eq!(
        harness.dispatcher.session().cookie_header_for("127.0.0.1"),
        "session=abc"
    );
}

#[tokio::test]
async fn test_connection_refused_is_recorded_as_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let harness = harness(EngineSettings::default());
    let response = send(&harness, &RequestDraft::new(format!("http://{address}/"))).await;

    assert_eq!(response.status, None);
    assert!(response.error.is_some());
    assert_eq!(harness.dispatcher.phase(), SendPhase::Failed);
    assert_eq!(harness.history.len(), 1);
}

#[tokio::test]
async fn test_sse_collects_events_until_close() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(": hello\ndata: one\n\nevent: tick\ndata: two\ndata: lines\n\n"),
        )
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let draft = RequestDraft::new(format!("{}/events", server.uri())).with_protocol(Protocol::Sse);

    let response = send(&harness, &draft).await;

    let events = response.events.unwrap();
    let kinds: Vec<_> = events.iter().map(|event| event.kind.as_str()).collect();
    assert_eq!(kinds, vec!["message", "tick"]);
    assert_eq!(events[1].data, "two\nlines");
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_websocket_collects_frames_and_sends_handshake_headers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut seen_token = None;
        let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            seen_token = request
                .headers()
                .get("x-token")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            Ok(response)
        };
        let mut socket = tokio_tungstenite::accept_hdr_async(tcp, callback).await.unwrap();
        socket.send(Message::text("hello")).await.unwrap();
        socket.send(Message::text("world")).await.unwrap();
        socket.close(None).await.unwrap();
        while socket.next().await.is_some() {}
        seen_token
    });

    let harness = harness(EngineSettings::default());
    let draft = RequestDraft::new(format!("ws://{address}/socket"))
        .with_protocol(Protocol::Websocket)
        .with_header("X-Token", "{{token}}");

    let response = send(&harness, &draft).await;

    let data: Vec<_> = response
        .events
        .unwrap()
        .into_iter()
        .map(|event| event.data)
        .collect();
    assert_eq!(data, vec!["hello".to_string(), "world".to_string()]);
    assert_eq!(server.await.unwrap().as_deref(), Some("s3cret"));
}

#[tokio::test]
async fn test_cancel_aborts_without_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let (token, cancel) = CancellationToken::new();
    let draft = RequestDraft::new(server.uri());
    let dispatcher = harness.dispatcher.clone();
    let handle = tokio::spawn(async move { dispatcher.send(&draft, cancel).await });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    token.cancel();

    let outcome = handle.await.unwrap().unwrap();
    assert!(outcome.is_aborted());
    assert_eq!(harness.dispatcher.phase(), SendPhase::Cancelled);
    assert!(harness.history.is_empty());
}

#[tokio::test]
async fn test_bulk_run_records_every_item_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(500).set_body_string("b"))
        .mount(&server)
        .await;

    let harness = harness(EngineSettings::default());
    let items = vec![
        BulkItem::new("first", RequestDraft::new(format!("{}/a", server.uri()))),
        BulkItem::new("second", RequestDraft::new(format!("{}/b", server.uri()))),
    ];

    let results = BulkRunner::new(harness.dispatcher.clone())
        .run(items)
        .await
        .unwrap();

    let summary: Vec<_> = results
        .iter()
        .map(|result| {
            (
                result.id.as_str(),
                result.outcome.response().and_then(|response| response.status),
            )
        })
        .collect();
    assert_eq!(summary, vec![("first", Some(200)), ("second", Some(500))]);
    assert_eq!(harness.history.len(), 2);
}

#[tokio::test]
async fn test_settings_file_timeout_applies_to_http() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    tokio::fs::write(&settings_path, r#"{"timeoutMs": 200, "historyLimit": 5}"#)
        .await
        .unwrap();
    let settings = courier_infrastructure::SettingsLoader::with_path(&settings_path)
        .load_file()
        .await
        .unwrap();
    assert_eq!(settings.history_limit, 5);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(2)))
        .mount(&server)
        .await;

    let harness = harness(settings);
    let response = send(&harness, &RequestDraft::new(server.uri())).await;

    assert_eq!(response.status, None);
    assert!(response.error.unwrap().contains("timeout of 200ms exceeded"));
}

#[tokio::test]
async fn test_stream_ceiling_applies_while_handshake_stalls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let harness = harness(EngineSettings::default().with_stream_timeouts(200, 200));
    for draft in [
        RequestDraft::new(format!("ws://{address}/socket")).with_protocol(Protocol::Websocket),
        RequestDraft::new(format!("http://{address}/events")).with_protocol(Protocol::Sse),
    ] {
        let response = tokio::time::timeout(std::time::Duration::from_secs(3), send(&harness, &draft))
            .await
            .expect("stream send must finish at its ceiling");

        assert_eq!(response.status, None);
        assert_eq!(response.error, None);
        assert_eq!(response.events, Some(Vec::new()));
    }
    assert_eq!(harness.history.len(), 2);
    server.abort();
}
