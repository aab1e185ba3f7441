//! Send Request Use Case
//!
//! Drives one draft through `idle -> resolving -> scripting-pre -> sending ->
//! scripting-assert -> recorded`. Only the HTTP wait observes cancellation;
//! streaming sends end by close, error or their ceiling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use courier_domain::{
    DispatchOutcome, EngineSettings, ExchangeRecord, HeaderMap, HttpMethod, KeyValue,
    NormalizedResponse, PreRequestContext, Protocol, RequestDraft, ResolvedRequest, SendPhase,
    VariableMap, parse_set_cookies,
};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::normalize::{normalize_http, streaming_failure};
use super::stream::{FinishReason, StreamCollector, StreamLimits, elapsed_ms};
use crate::auth::apply_auth;
use crate::headers::{default_header, force_header};
use crate::payload::{RequestPayload, encode_payload};
use crate::ports::{
    CancellationReceiver, Clock, HistoryRecorder, HttpClientError, HttpTransport, ScriptEngine,
    StreamTransport, TransportRequest,
};
use crate::session::SessionState;
use crate::url_builder::{build_url_with_params, hostname_of};
use crate::variable_resolver::VariableResolver;

/// Conditions that refuse to start a send. Neither produces a history record.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SendError {
    /// URL is empty.
    #[error("URL is required")]
    EmptyUrl,

    /// Another send or a bulk run is in flight.
    #[error("a request is already in flight")]
    Busy,
}

/// Clears the in-flight flag when dropped.
pub(crate) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, SendError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { flag })
            .map_err(|_| SendError::Busy)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What the protocol sender produced.
enum SenderResult {
    Response(NormalizedResponse),
    Failed(NormalizedResponse),
    Aborted,
}

/// Use case for sending requests of every protocol.
///
/// At most one send is in flight at a time; a second interactive send is
/// refused with [`SendError::Busy`].
///
/// # Example
///
/// ```ignore
/// let dispatcher = SendRequest::new(http, streams, scripts, history, clock, session);
/// let (token, cancel) = CancellationToken::new();
/// let outcome = dispatcher.send(&draft, cancel).await?;
/// ```
pub struct SendRequest {
    http: Arc<dyn HttpTransport>,
    streams: Arc<dyn StreamTransport>,
    scripts: Arc<dyn ScriptEngine>,
    history: Arc<dyn HistoryRecorder>,
    clock: Arc<dyn Clock>,
    session: Arc<SessionState>,
    in_flight: AtomicBool,
    phase: watch::Sender<SendPhase>,
}

impl SendRequest {
    /// Creates the dispatcher over its ports and the shared session.
    #[must_use]
    pub fn new(
        http: Arc<dyn HttpTransport>,
        streams: Arc<dyn StreamTransport>,
        scripts: Arc<dyn ScriptEngine>,
        history: Arc<dyn HistoryRecorder>,
        clock: Arc<dyn Clock>,
        session: Arc<SessionState>,
    ) -> Self {
        let (phase, _) = watch::channel(SendPhase::Idle);
        Self {
            http,
            streams,
            scripts,
            history,
            clock,
            session,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    /// Returns the shared session.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SendPhase> {
        self.phase.subscribe()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SendPhase {
        *self.phase.borrow()
    }

    /// Returns true while a send or bulk run holds the dispatcher.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sends one draft interactively.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::EmptyUrl`] for a blank URL and [`SendError::Busy`]
    /// while another send is in flight. Transport failures are not errors;
    /// they are rendered into the response.
    pub async fn send(
        &self,
        draft: &RequestDraft,
        cancel: CancellationReceiver,
    ) -> Result<DispatchOutcome, SendError> {
        if draft.url.trim().is_empty() {
            return Err(SendError::EmptyUrl);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        Ok(self.dispatch(draft, Some(cancel)).await)
    }

    pub(crate) const fn in_flight_flag(&self) -> &AtomicBool {
        &self.in_flight
    }

    fn enter(&self, phase: SendPhase) {
        debug!(%phase, "Send phase");
        self.phase.send_replace(phase);
    }

    /// Runs one send to completion. The caller holds the in-flight guard.
    pub(crate) async fn dispatch(
        &self,
        draft: &RequestDraft,
        cancel: Option<CancellationReceiver>,
    ) -> DispatchOutcome {
        let started = Instant::now();
        info!(protocol = %draft.protocol, url = %draft.url, "Sending request");

        self.enter(SendPhase::Resolving);
        let settings = self.session.settings();
        let variables = self.session.merged_variables();
        let environment = self.session.active_environment();
        let resolver = VariableResolver::new(variables);
        let mut prepared = draft.clone();
        prepared.url_encoded = resolver.substitute_pairs(&draft.url_encoded);
        let resolved = resolver.resolve(&prepared);
        let variables = resolver.variables();

        let authed = apply_auth(&resolved.header_map(), &resolved.active_params(), &resolved.auth);

        self.enter(SendPhase::ScriptingPre);
        let context = self.run_pre_request(&resolved, authed.headers, authed.params, variables);

        self.enter(SendPhase::Sending);
        let result = match resolved.protocol {
            Protocol::Http | Protocol::Graphql => {
                self.send_http(&resolved, context, &settings, cancel, started)
                    .await
            }
            Protocol::Websocket | Protocol::Sse => {
                self.send_stream(&resolved, context, &settings, started).await
            }
        };

        let (mut response, failed) = match result {
            SenderResult::Aborted => {
                info!(url = %resolved.url, "Request cancelled");
                self.enter(SendPhase::Cancelled);
                return DispatchOutcome::Aborted;
            }
            SenderResult::Response(response) => (response, false),
            SenderResult::Failed(response) => (response, true),
        };

        self.enter(SendPhase::ScriptingAssert);
        response.assertions = self
            .scripts
            .run_assertions(&resolved.test_script, &response, variables);

        let record = ExchangeRecord::new(resolved, response.clone(), self.clock.now())
            .with_environment(environment.as_ref());
        self.history.record(record);
        self.enter(if failed {
            SendPhase::Failed
        } else {
            SendPhase::Recorded
        });

        DispatchOutcome::completed(response)
    }

    fn run_pre_request(
        &self,
        resolved: &ResolvedRequest,
        headers: HeaderMap,
        params: Vec<KeyValue>,
        variables: &VariableMap,
    ) -> PreRequestContext {
        let context =
            PreRequestContext::new(headers, params, resolved.body.clone(), resolved.form_data.clone());
        let outcome = self
            .scripts
            .run_pre_request(&resolved.pre_request_script, context, variables);
        if let Some(error) = &outcome.error {
            warn!(%error, "Pre-request script failed");
        }
        outcome.context
    }

    async fn send_http(
        &self,
        resolved: &ResolvedRequest,
        context: PreRequestContext,
        settings: &EngineSettings,
        cancel: Option<CancellationReceiver>,
        started: Instant,
    ) -> SenderResult {
        let url = build_url_with_params(&resolved.url, &context.params);
        let host = hostname_of(&url);
        let mut headers = context.headers;

        if settings.with_credentials {
            let cookie = self.session.cookie_header_for(&host);
            if !cookie.is_empty() {
                default_header(&mut headers, "Cookie", cookie);
            }
        }

        let (method, payload) = if resolved.protocol == Protocol::Graphql {
            force_header(&mut headers, "Content-Type", "application/json");
            (HttpMethod::Post, graphql_payload(resolved))
        } else {
            let payload = encode_payload(
                resolved.method,
                resolved.body_mode,
                &context.body,
                &context.form_data,
                &resolved.url_encoded,
                &mut headers,
            );
            (resolved.method, payload)
        };

        let request = TransportRequest {
            url,
            method,
            headers,
            payload,
            timeout_ms: settings.effective_timeout_ms(),
            tls: settings.tls.clone(),
            with_credentials: settings.with_credentials,
        };

        let result = match cancel {
            Some(mut cancel) => {
                tokio::select! {
                    result = self.http.perform_http(request) => result,
                    () = cancel.cancelled() => Err(HttpClientError::Cancelled),
                }
            }
            None => self.http.perform_http(request).await,
        };
        let duration_ms = elapsed_ms(started);

        match result {
            Ok(response) => {
                if settings.with_credentials {
                    let set_cookies = response.header_values("set-cookie");
                    self.session
                        .upsert_cookies(&host, parse_set_cookies(&set_cookies[..]));
                }
                SenderResult::Response(normalize_http(&response, duration_ms))
            }
            Err(HttpClientError::Cancelled) => SenderResult::Aborted,
            Err(error) => {
                warn!(%error, "Request failed");
                SenderResult::Failed(NormalizedResponse::failure(error.to_string(), duration_ms))
            }
        }
    }

    async fn send_stream(
        &self,
        resolved: &ResolvedRequest,
        context: PreRequestContext,
        settings: &EngineSettings,
        started: Instant,
    ) -> SenderResult {
        let url = build_url_with_params(&resolved.url, &context.params);
        let limits = if resolved.protocol == Protocol::Sse {
            StreamLimits {
                timeout: Duration::from_millis(settings.sse_timeout_ms),
                max_events: Some(settings.sse_max_events),
            }
        } else {
            StreamLimits {
                timeout: Duration::from_millis(settings.websocket_timeout_ms),
                max_events: None,
            }
        };

        // The ceiling covers the handshake too.
        let deadline = started + limits.timeout;
        let open = async {
            if resolved.protocol == Protocol::Sse {
                self.streams.open_event_source(&url, &context.headers).await
            } else {
                self.streams.open_websocket(&url, &context.headers).await
            }
        };
        let Ok(opened) = tokio::time::timeout_at(deadline, open).await else {
            debug!(url = %url, "Stream ceiling reached before the handshake finished");
            let response = StreamCollector::new(resolved.protocol)
                .finish(FinishReason::Timeout, None, elapsed_ms(started))
                .unwrap_or_else(|| NormalizedResponse::new(None, "", Value::Null));
            return SenderResult::Response(response);
        };

        match opened {
            Ok(subscription) => {
                let response = StreamCollector::new(resolved.protocol)
                    .drive(subscription, limits, started, self.clock.as_ref())
                    .await;
                SenderResult::Response(response)
            }
            Err(error) => {
                warn!(%error, url = %url, "Stream could not be opened");
                SenderResult::Failed(streaming_failure(
                    resolved.protocol,
                    &error.to_string(),
                    elapsed_ms(started),
                ))
            }
        }
    }
}

/// `{query, variables}`; variables are parsed JSON, or the raw text if they do not parse.
fn graphql_payload(resolved: &ResolvedRequest) -> RequestPayload {
    let raw = resolved.graphql_variables.trim();
    let variables = if raw.is_empty() {
        json!({})
    } else {
        serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(resolved.graphql_variables.clone()))
    };
    RequestPayload::Json(json!({
        "query": resolved.graphql_query,
        "variables": variables,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::{
        CancellationToken, StreamError, StreamEvent, StreamSubscription, TransportResponse,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use courier_domain::{
        AssertionResult, AuthDescriptor, BodyMode, EnvironmentVariableSet, GlobalVariableSet,
        PreRequestOutcome,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Mock HTTP transport recording every request.
    struct MockHttpTransport {
        response: Result<TransportResponse, HttpClientError>,
        delay: Option<Duration>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl MockHttpTransport {
        fn success(status: u16, body: &str, headers: &[(&str, &str)]) -> Self {
            Self {
                response: Ok(TransportResponse {
                    status,
                    status_text: "OK".to_string(),
                    headers: headers
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect(),
                    body: body.as_bytes().to_vec(),
                    duration_ms: 1,
                }),
                delay: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn error(error: HttpClientError) -> Self {
            Self {
                response: Err(error),
                delay: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn last_request(&self) -> TransportRequest {
            self.requests.lock().unwrap().last().cloned().expect("a request was sent")
        }
    }

    #[async_trait]
    impl HttpTransport for MockHttpTransport {
        async fn perform_http(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, HttpClientError> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.clone()
        }
    }

    /// Mock stream transport replaying scripted events.
    struct MockStreamTransport {
        events: Vec<StreamEvent>,
        fail_with: Option<StreamError>,
        hang: bool,
        opened: Mutex<Vec<(String, HeaderMap)>>,
    }

    impl MockStreamTransport {
        fn replay(events: Vec<StreamEvent>) -> Self {
            Self {
                events,
                fail_with: None,
                hang: false,
                opened: Mutex::new(Vec::new()),
            }
        }

        /// Never completes the handshake.
        fn silent() -> Self {
            Self {
                events: Vec::new(),
                fail_with: None,
                hang: true,
                opened: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: StreamError) -> Self {
            Self {
                events: Vec::new(),
                fail_with: Some(error),
                hang: false,
                opened: Mutex::new(Vec::new()),
            }
        }

        fn open(&self, url: &str, headers: &HeaderMap) -> Result<StreamSubscription, StreamError> {
            self.opened.lock().unwrap().push((url.to_string(), headers.clone()));
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            let (sender, subscription) = StreamSubscription::channel(self.events.len() + 1);
            for event in &self.events {
                sender.try_send(event.clone()).unwrap();
            }
            // Keep the sender alive so the stream only ends by event or timeout.
            tokio::spawn(async move { sender.closed().await });
            Ok(subscription)
        }
    }

    #[async_trait]
    impl StreamTransport for MockStreamTransport {
        async fn open_websocket(
            &self,
            url: &str,
            headers: &HeaderMap,
        ) -> Result<StreamSubscription, StreamError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.open(url, headers)
        }

        async fn open_event_source(
            &self,
            url: &str,
            headers: &HeaderMap,
        ) -> Result<StreamSubscription, StreamError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.open(url, headers)
        }
    }

    /// Script engine understanding two fixed scripts.
    struct MockScripts;

    impl ScriptEngine for MockScripts {
        fn run_pre_request(
            &self,
            script: &str,
            mut context: PreRequestContext,
            env: &VariableMap,
        ) -> PreRequestOutcome {
            match script {
                "sign" => {
                    let tenant = env.get("tenant").cloned().unwrap_or_default();
                    context.headers.insert("X-Tenant".to_string(), tenant);
                    context.params.push(KeyValue::new("signed", "1"));
                    PreRequestOutcome::unchanged(context)
                }
                "explode" => PreRequestOutcome {
                    context,
                    logs: Vec::new(),
                    error: Some("boom".to_string()),
                },
                _ => PreRequestOutcome::unchanged(context),
            }
        }

        fn run_assertions(
            &self,
            script: &str,
            response: &NormalizedResponse,
            _env: &VariableMap,
        ) -> Vec<AssertionResult> {
            if script.is_empty() {
                return Vec::new();
            }
            vec![AssertionResult {
                ok: response.status == Some(200),
                message: "status is 200".to_string(),
            }]
        }
    }

    #[derive(Default)]
    struct RecordingHistory {
        records: Mutex<Vec<ExchangeRecord>>,
    }

    impl RecordingHistory {
        fn records(&self) -> Vec<ExchangeRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl HistoryRecorder for RecordingHistory {
        fn record(&self, record: ExchangeRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        }
    }

    struct Harness {
        dispatcher: SendRequest,
        http: Arc<MockHttpTransport>,
        streams: Arc<MockStreamTransport>,
        history: Arc<RecordingHistory>,
        session: Arc<SessionState>,
    }

    fn harness(http: MockHttpTransport, streams: MockStreamTransport) -> Harness {
        let http = Arc::new(http);
        let streams = Arc::new(streams);
        let history = Arc::new(RecordingHistory::default());
        let session = Arc::new(SessionState::default());
        let dispatcher = SendRequest::new(
            http.clone(),
            streams.clone(),
            Arc::new(MockScripts),
            history.clone(),
            Arc::new(FixedClock),
            session.clone(),
        );
        Harness {
            dispatcher,
            http,
            streams,
            history,
            session,
        }
    }

    fn http_harness(http: MockHttpTransport) -> Harness {
        harness(http, MockStreamTransport::replay(Vec::new()))
    }

    async fn send(harness: &Harness, draft: &RequestDraft) -> DispatchOutcome {
        harness
            .dispatcher
            .send(draft, CancellationReceiver::never())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_resolves_authenticates_and_records() {
        let h = http_harness(MockHttpTransport::success(200, r#"{"id": 7}"#, &[]));
        h.session
            .set_globals(GlobalVariableSet::new().with_variable("host", "api.test"));
        h.session
            .add_environment(EnvironmentVariableSet::new("dev").with_variable("token", "t0k"))
            .unwrap();
        let draft = RequestDraft::new("https://{{host}}/users")
            .with_param("page", "{{page}}")
            .with_auth(AuthDescriptor::bearer("t0k"))
            .with_test_script("check");

        let outcome = send(&h, &draft).await;

        let sent = h.http.last_request();
        assert_eq!(sent.url, "https://api.test/users?page=%7B%7Bpage%7D%7D");
        assert_eq!(sent.headers.get("Authorization").unwrap(), "Bearer t0k");
        assert_eq!(sent.timeout_ms, 15_000);

        let response = outcome.response().unwrap();
        assert_eq!(response.data, json!({"id": 7}));
        assert_eq!(
            response.assertions,
            vec![AssertionResult {
                ok: true,
                message: "status is 200".to_string()
            }]
        );

        let records = h.history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request.url, "https://api.test/users");
        assert_eq!(records[0].environment_name.as_deref(), Some("dev"));
        assert_eq!(records[0].timestamp, FixedClock.now());
        assert_eq!(h.dispatcher.phase(), SendPhase::Recorded);
    }

    #[tokio::test]
    async fn test_get_never_attaches_body() {
        let h = http_harness(MockHttpTransport::success(200, "", &[]));
        let draft = RequestDraft::new("http://x.test").with_body(BodyMode::Json, r#"{"a":1}"#);

        send(&h, &draft).await;

        assert_eq!(h.http.last_request().payload, RequestPayload::None);
    }

    #[tokio::test]
    async fn test_urlencoded_pairs_are_substituted_but_form_fields_are_not() {
        let h = http_harness(MockHttpTransport::success(200, "", &[]));
        h.session
            .set_globals(GlobalVariableSet::new().with_variable("v", "resolved"));
        let urlencoded = RequestDraft::new("http://x.test")
            .with_method(HttpMethod::Post)
            .with_body(BodyMode::Urlencoded, "")
            .with_url_encoded("k", "{{v}}");
        let form = RequestDraft::new("http://x.test")
            .with_method(HttpMethod::Post)
            .with_body(BodyMode::FormData, "")
            .with_form_field("k", "{{v}}");

        send(&h, &urlencoded).await;
        assert_eq!(
            h.http.last_request().payload,
            RequestPayload::UrlEncoded(vec![KeyValue::new("k", "resolved")])
        );

        send(&h, &form).await;
        assert_eq!(
            h.http.last_request().payload,
            RequestPayload::Multipart(vec![KeyValue::new("k", "{{v}}")])
        );
    }

    #[tokio::test]
    async fn test_pre_request_mutations_reach_the_transport() {
        let h = http_harness(MockHttpTransport::success(200, "", &[]));
        h.session
            .set_globals(GlobalVariableSet::new().with_variable("tenant", "acme"));
        let draft = RequestDraft::new("http://x.test/a").with_pre_request_script("sign");

        send(&h, &draft).await;

        let sent = h.http.last_request();
        assert_eq!(sent.headers.get("X-Tenant").unwrap(), "acme");
        assert_eq!(sent.url, "http://x.test/a?signed=1");
    }

    #[tokio::test]
    async fn test_failing_pre_request_script_does_not_stop_the_send() {
        let h = http_harness(MockHttpTransport::success(200, "ok", &[]));
        let draft = RequestDraft::new("http://x.test").with_pre_request_script("explode");

        let outcome = send(&h, &draft).await;

        assert_eq!(outcome.response().unwrap().status, Some(200));
    }

    #[tokio::test]
    async fn test_graphql_is_posted_as_json() {
        let h = http_harness(MockHttpTransport::success(200, "{}", &[]));
        let draft = RequestDraft::new("http://x.test/graphql")
            .with_protocol(Protocol::Graphql)
            .with_header("content-type", "text/plain")
            .with_graphql("{ me { id } }", "{not json");

        send(&h, &draft).await;

        let sent = h.http.last_request();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.headers.len(), 1);
        assert_eq!(sent.headers.get("Content-Type").unwrap(), "application/json");
        assert_eq!(
            sent.payload,
            RequestPayload::Json(json!({"query": "{ me { id } }", "variables": "{not json"}))
        );
    }

    #[tokio::test]
    async fn test_graphql_variables_default_to_empty_object() {
        let h = http_harness(MockHttpTransport::success(200, "{}", &[]));
        let draft = RequestDraft::new("http://x.test/graphql")
            .with_protocol(Protocol::Graphql)
            .with_graphql("{ a }", "  ");

        send(&h, &draft).await;

        assert_eq!(
            h.http.last_request().payload,
            RequestPayload::Json(json!({"query": "{ a }", "variables": {}}))
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_rendered_and_recorded() {
        let h = http_harness(MockHttpTransport::error(HttpClientError::ConnectionRefused {
            host: "x.test".to_string(),
            port: 80,
        }));

        let outcome = send(&h, &RequestDraft::new("http://x.test").with_test_script("check")).await;

        let response = outcome.response().unwrap();
        assert_eq!(response.status, None);
        assert_eq!(response.status_text, "Request Failed");
        assert_eq!(response.error.as_deref(), Some("connection refused: x.test:80"));
        assert_eq!(response.data, json!("connection refused: x.test:80"));
        assert!(!response.assertions[0].ok);
        assert_eq!(h.history.records().len(), 1);
        assert_eq!(h.dispatcher.phase(), SendPhase::Failed);
    }

    #[tokio::test]
    async fn test_cookies_are_forwarded_and_stored_with_credentials() {
        let h = http_harness(MockHttpTransport::success(
            200,
            "",
            &[("Set-Cookie", "session=abc; Path=/"), ("Set-Cookie", "theme=dark")],
        ));
        h.session
            .update_settings(EngineSettings::default().with_credentials(true));
        h.session
            .upsert_cookies("x.test", parse_set_cookies(&["old=1"]));

        send(&h, &RequestDraft::new("http://x.test/login")).await;

        assert_eq!(h.http.last_request().headers.get("Cookie").unwrap(), "old=1");
        assert!(h.http.last_request().with_credentials);
        assert_eq!(
            h.session.cookie_header_for("x.test"),
            "old=1; session=abc; theme=dark"
        );
    }

    #[tokio::test]
    async fn test_explicit_cookie_header_wins() {
        let h = http_harness(MockHttpTransport::success(200, "", &[]));
        h.session
            .update_settings(EngineSettings::default().with_credentials(true));
        h.session.upsert_cookies("x.test", parse_set_cookies(&["a=1"]));

        send(&h, &RequestDraft::new("http://x.test").with_header("cookie", "mine=1")).await;

        let sent = h.http.last_request();
        assert_eq!(sent.headers.get("cookie").unwrap(), "mine=1");
        assert!(sent.headers.get("Cookie").is_none());
    }

    #[tokio::test]
    async fn test_cookies_ignored_without_credentials() {
        let h = http_harness(MockHttpTransport::success(200, "", &[("Set-Cookie", "a=1")]));
        h.session.upsert_cookies("x.test", parse_set_cookies(&["old=1"]));

        send(&h, &RequestDraft::new("http://x.test")).await;

        assert!(h.http.last_request().headers.get("Cookie").is_none());
        assert_eq!(h.session.cookie_header_for("x.test"), "old=1");
    }

    #[tokio::test]
    async fn test_cancel_mid_flight_aborts_without_side_effects() {
        let h = http_harness(
            MockHttpTransport::success(200, "", &[("Set-Cookie", "a=1")])
                .slow(Duration::from_secs(5)),
        );
        h.session
            .update_settings(EngineSettings::default().with_credentials(true));
        let (token, cancel) = CancellationToken::new();
        let draft = RequestDraft::new("http://x.test").with_test_script("check");

        let mut phases = h.dispatcher.subscribe();
        let canceller = async {
            phases.wait_for(|phase| *phase == SendPhase::Sending).await.unwrap();
            token.cancel();
        };
        let (outcome, ()) = tokio::join!(h.dispatcher.send(&draft, cancel), canceller);

        assert_eq!(outcome.unwrap(), DispatchOutcome::Aborted);
        assert!(h.history.records().is_empty());
        assert!(h.session.cookies().is_empty());
        assert_eq!(h.dispatcher.phase(), SendPhase::Cancelled);
        assert!(!h.dispatcher.is_busy());
    }

    #[tokio::test]
    async fn test_empty_url_is_refused() {
        let h = http_harness(MockHttpTransport::success(200, "", &[]));
        let result = h
            .dispatcher
            .send(&RequestDraft::new("  "), CancellationReceiver::never())
            .await;

        assert_eq!(result, Err(SendError::EmptyUrl));
        assert!(h.history.records().is_empty());
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_busy() {
        let h = http_harness(MockHttpTransport::success(200, "", &[]).slow(Duration::from_millis(200)));
        let draft = RequestDraft::new("http://x.test");

        let mut phases = h.dispatcher.subscribe();
        let second = async {
            phases.wait_for(|phase| *phase == SendPhase::Sending).await.unwrap();
            h.dispatcher.send(&draft, CancellationReceiver::never()).await
        };
        let (first, second) = tokio::join!(
            h.dispatcher.send(&draft, CancellationReceiver::never()),
            second
        );

        assert!(first.is_ok());
        assert_eq!(second, Err(SendError::Busy));
        assert_eq!(h.history.records().len(), 1);
    }

    #[tokio::test]
    async fn test_websocket_collects_events_with_handshake_headers() {
        let h = harness(
            MockHttpTransport::success(200, "", &[]),
            MockStreamTransport::replay(vec![
                StreamEvent::Message {
                    kind: "message".to_string(),
                    data: "hello".to_string(),
                },
                StreamEvent::Closed,
            ]),
        );
        let draft = RequestDraft::new("ws://x.test/socket")
            .with_protocol(Protocol::Websocket)
            .with_method(HttpMethod::Post)
            .with_body(BodyMode::Raw, "ignored")
            .with_auth(AuthDescriptor::api_key_query("key", "k1"))
            .with_header("X-A", "1");

        let outcome = send(&h, &draft).await;

        let (url, headers) = h.streams.opened.lock().unwrap()[0].clone();
        assert_eq!(url, "ws://x.test/socket?key=k1");
        assert_eq!(headers.get("X-A").unwrap(), "1");

        let response = outcome.response().unwrap();
        assert_eq!(response.status, None);
        assert_eq!(response.status_text, "WebSocket");
        assert_eq!(response.events.as_ref().unwrap()[0].data, "hello");
        assert_eq!(h.history.records()[0].protocol, Protocol::Websocket);
        assert!(h.http.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sse_finalizes_at_event_limit() {
        let events = (0..10)
            .map(|i| StreamEvent::Message {
                kind: "tick".to_string(),
                data: i.to_string(),
            })
            .collect();
        let h = harness(
            MockHttpTransport::success(200, "", &[]),
            MockStreamTransport::replay(events),
        );
        h.session
            .update_settings(EngineSettings::default().with_sse_max_events(4));
        let draft = RequestDraft::new("http://x.test/events").with_protocol(Protocol::Sse);

        let outcome = send(&h, &draft).await;

        let response = outcome.response().unwrap();
        assert_eq!(response.status_text, "SSE stream");
        assert_eq!(response.events.as_ref().unwrap().len(), 4);
        assert_eq!(response.events.as_ref().unwrap()[0].kind, "tick");
    }

    #[tokio::test]
    async fn test_stream_timeout_finalizes_quiet_socket() {
        let h = harness(
            MockHttpTransport::success(200, "", &[]),
            MockStreamTransport::replay(Vec::new()),
        );
        h.session
            .update_settings(EngineSettings::default().with_stream_timeouts(50, 50));
        let draft = RequestDraft::new("ws://x.test").with_protocol(Protocol::Websocket);

        let outcome = send(&h, &draft).await;

        let response = outcome.response().unwrap();
        assert_eq!(response.error, None);
        assert!(response.duration_ms >= 50);
    }

    #[tokio::test]
    async fn test_stream_open_failure_is_recorded() {
        let h = harness(
            MockHttpTransport::success(200, "", &[]),
            MockStreamTransport::failing(StreamError::Connection("refused".to_string())),
        );
        let draft = RequestDraft::new("http://x.test/events").with_protocol(Protocol::Sse);

        let outcome = send(&h, &draft).await;

        let response = outcome.response().unwrap();
        assert_eq!(response.status_text, "SSE error");
        assert_eq!(response.error.as_deref(), Some("refused"));
        assert_eq!(response.size, 0);
        assert_eq!(h.history.records().len(), 1);
        assert_eq!(h.dispatcher.phase(), SendPhase::Failed);
    }

    #[tokio::test]
    async fn test_stream_ceiling_covers_stalled_handshake() {
        for (protocol, url) in [
            (Protocol::Websocket, "ws://x.test"),
            (Protocol::Sse, "http://x.test/events"),
        ] {
            let h = harness(
                MockHttpTransport::success(200, "", &[]),
                MockStreamTransport::silent(),
            );
            h.session
                .update_settings(EngineSettings::default().with_stream_timeouts(50, 50));
            let draft = RequestDraft::new(url).with_protocol(protocol);

            let outcome = tokio::time::timeout(Duration::from_secs(2), send(&h, &draft))
                .await
                .unwrap();

            let response = outcome.response().unwrap();
            assert_eq!(response.error, None);
            assert_eq!(response.events, Some(Vec::new()));
            assert!(response.duration_ms >= 50);
            assert_eq!(h.history.records().len(), 1);
        }
    }
}
