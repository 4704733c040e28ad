//! HTTP endpoint integration tests.
//!
//! Serves the router on an ephemeral port backed by the mock service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use athena_relay::http::{serve, AppState, ErrorResponse, ExecuteQueryResponse, TableResponse};
use athena_relay::query::{PollPolicy, QueryLifecycle};
use athena_relay::service::{ExecutionState, MockQueryService, ScriptedExecution};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct TestServer {
    addr: SocketAddr,
    service: Arc<MockQueryService>,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn start(service: MockQueryService, policy: PollPolicy) -> Self {
        let service = Arc::new(service);
        let shutdown = CancellationToken::new();
        let state = AppState::new(
            QueryLifecycle::new(service.clone()),
            "archive-db",
            "s3://query-results/relay/",
            policy,
        )
        .with_shutdown(shutdown.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state));

        Self {
            addr,
            service,
            shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn fast_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(5), Duration::from_secs(5))
}

#[tokio::test]
async fn test_receive_returns_greeting() {
    let server = TestServer::start(MockQueryService::new(), fast_policy()).await;

    let response = reqwest::get(server.url("/receive")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Hello World!");
}

#[tokio::test]
async fn test_execute_query_returns_execution_id_without_waiting() {
    let server = TestServer::start(
        MockQueryService::with_script(ScriptedExecution::running_forever()),
        fast_policy(),
    )
    .await;

    let response = reqwest::Client::new()
        .get(server.url("/executeQuery"))
        .query(&[("query", "SELECT * FROM events")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ExecuteQueryResponse = response.json().await.unwrap();
    assert!(body.execution_id.as_str().starts_with("mock-exec-"));
    assert_eq!(server.service.submissions(), 1);
    assert_eq!(server.service.total_state_checks(), 0);
}

#[tokio::test]
async fn test_execute_query_rejects_blank_query() {
    let server = TestServer::start(MockQueryService::new(), fast_policy()).await;

    let response = reqwest::get(server.url("/executeQuery?query=%20"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.category, "Invalid Request");
    assert_eq!(server.service.submissions(), 0);
}

#[tokio::test]
async fn test_execute_query_without_query_param_returns_json_error() {
    let server = TestServer::start(MockQueryService::new(), fast_policy()).await;

    let response = reqwest::get(server.url("/executeQuery")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.category, "Invalid Request");
    assert!(body.error.contains("'query'"));
    assert_eq!(server.service.submissions(), 0);
}

#[tokio::test]
async fn test_execute_query_reports_rejected_submission() {
    let server = TestServer::start(
        MockQueryService::new().reject_submissions("InvalidRequestException: line 1:1"),
        fast_policy(),
    )
    .await;

    let response = reqwest::get(server.url("/executeQuery?query=SELEC"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.category, "Submission Error");
    assert!(body.error.contains("InvalidRequestException"));
}

#[tokio::test]
async fn test_load_table_returns_rows() {
    let service = MockQueryService::new().script_for(
        "SELECT * FROM events LIMIT 10",
        ScriptedExecution::succeeding().returning(vec![
            vec!["id", "kind"],
            vec!["1", "click"],
            vec!["2", "view"],
        ]),
    );
    let server = TestServer::start(service, fast_policy()).await;

    let response = reqwest::get(server.url("/loadTable?tableName=events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: TableResponse = response.json().await.unwrap();
    assert_eq!(body.row_count, 3);
    assert_eq!(
        body.rows,
        vec![vec!["id", "kind"], vec!["1", "click"], vec!["2", "view"]]
    );
}

#[tokio::test]
async fn test_load_table_rejects_invalid_table_name() {
    let server = TestServer::start(MockQueryService::new(), fast_policy()).await;

    let response = reqwest::Client::new()
        .get(server.url("/loadTable"))
        .query(&[("tableName", "events; DROP TABLE events")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.service.submissions(), 0);
}

#[tokio::test]
async fn test_load_table_without_table_name_returns_json_error() {
    let server = TestServer::start(MockQueryService::new(), fast_policy()).await;

    let response = reqwest::get(server.url("/loadTable?table=events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.category, "Invalid Request");
    assert!(body.error.contains("'tableName'"));
    assert_eq!(server.service.submissions(), 0);
}

#[tokio::test]
async fn test_load_table_reports_failed_state() {
    let server = TestServer::start(
        MockQueryService::with_script(ScriptedExecution::with_states(vec![
            ExecutionState::Queued,
            ExecutionState::Failed,
        ])),
        fast_policy(),
    )
    .await;

    let response = reqwest::get(server.url("/loadTable?tableName=missing_table"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.state, Some(ExecutionState::Failed));
    assert_eq!(body.category, "Query Execution Error");
    assert_eq!(server.service.result_calls(), 0);
}

#[tokio::test]
async fn test_load_table_times_out() {
    let server = TestServer::start(
        MockQueryService::with_script(ScriptedExecution::running_forever()),
        PollPolicy::new(Duration::from_millis(10), Duration::from_millis(100)),
    )
    .await;

    let response = reqwest::get(server.url("/loadTable?tableName=events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.category, "Poll Timeout");
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_load() {
    let server = TestServer::start(
        MockQueryService::with_script(ScriptedExecution::running_forever()),
        PollPolicy::new(Duration::from_millis(10), Duration::from_secs(30)),
    )
    .await;

    let url = server.url("/loadTable?tableName=events");
    let request = tokio::spawn(async move { reqwest::get(url).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.shutdown.cancel();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.category, "Cancelled");
}
