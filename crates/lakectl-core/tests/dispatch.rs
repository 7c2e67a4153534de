//! End-to-end dispatch tests against a mock backend.

use std::sync::Arc;

use lakectl_core::{
    ClientRegistry, DispatchError, ErrorKind, ResilienceConfig, Settings, SettingsFactory,
    build_router,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Router wired to the mock server, with zero backoff so retry tests run
/// in real time.
fn router_for(server: &MockServer) -> lakectl_core::Router {
    let resilience = ResilienceConfig {
        max_attempts: 3,
        backoff_ms: 0,
        max_backoff_ms: 0,
        max_workers: 4,
    };
    let settings = Settings {
        host: Some(server.uri()),
        token: Some("test-token".to_string()),
        account_host: Some(server.uri()),
        account_id: Some("acc-1".to_string()),
        resilience: resilience.clone(),
    };
    let factory = Arc::new(SettingsFactory::new(settings));
    let registry = Arc::new(ClientRegistry::new(factory, resilience.retry_policy()));
    build_router(registry, resilience)
}

/// The construction handshake for the workspace scope.
async fn mount_workspace_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/2.0/identity/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": "tester"})))
        .mount(server)
        .await;
}

async fn mount_account_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/2.0/accounts/acc-1/metastores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metastores": []})))
        .mount(server)
        .await;
}

fn operation_error(err: DispatchError) -> lakectl_core::ClassifiedError {
    match err {
        DispatchError::Operation(e) => e,
        other => panic!("expected operation error, got {other:?}"),
    }
}

#[tokio::test]
async fn dispatches_a_workspace_operation() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/list"))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clusters": [{"cluster_id": "c-1", "state": "RUNNING"}]
        })))
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router.dispatch("list-clusters", Value::Null).await.unwrap();
    assert_eq!(out["clusters"][0]["cluster_id"], "c-1");
}

#[tokio::test]
async fn dispatches_an_account_operation() {
    let server = MockServer::start().await;
    mount_account_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/accounts/acc-1/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"workspace_id": 42, "workspace_name": "prod"}
        ])))
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch("list-account-workspaces", Value::Null)
        .await
        .unwrap();
    assert_eq!(out[0]["workspace_id"], 42);
}

#[tokio::test]
async fn unknown_operation_never_reaches_the_backend() {
    let server = MockServer::start().await;
    let router = router_for(&server);

    let err = router.dispatch("frobnicate", Value::Null).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownOperation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/get"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/get"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"cluster_id": "c-9", "state": "RUNNING"})),
        )
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch("get-cluster", json!({"cluster_id": "c-9"}))
        .await
        .unwrap();
    assert_eq!(out["cluster_id"], "c-9");
}

#[tokio::test]
async fn retry_exhaustion_surfaces_the_last_error() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/get"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let err = operation_error(
        router
            .dispatch("get-cluster", json!({"cluster_id": "c-9"}))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.kind, ErrorKind::TransientServer);
    assert!(err.retries_exhausted);
}

#[tokio::test]
async fn auth_failures_are_not_retried() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/jobs/get"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error_code": "UNAUTHENTICATED", "message": "bad token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let err = operation_error(
        router
            .dispatch("get-job", json!({"job_id": 3}))
            .await
            .unwrap_err(),
    );
    assert_eq!(err.kind, ErrorKind::Auth);
    assert!(!err.retries_exhausted);
}

#[tokio::test]
async fn chunked_statement_results_are_assembled() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/sql/statements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s-1",
            "status": {"state": "SUCCEEDED"},
            "result": {"data_array": [["a"], ["b"]], "truncated": false},
            "manifest": {"total_chunk_count": 3, "total_row_count": 6, "schema": {"columns": []}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s-1/result/chunks/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data_array": [["c"], ["d"]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s-1/result/chunks/2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data_array": [["e"], ["f"]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch(
            "execute-statement",
            json!({"warehouse_id": "w-1", "statement": "select letter from letters"}),
        )
        .await
        .unwrap();

    assert_eq!(out["result"]["row_count"], 6);
    assert_eq!(
        out["result"]["data_array"],
        json!([["a"], ["b"], ["c"], ["d"], ["e"], ["f"]])
    );
    assert_eq!(out["result"]["truncated"], false);
    assert_eq!(out["manifest"]["chunks_fetched"], 3);
}

#[tokio::test]
async fn statement_row_limit_truncates_assembled_rows() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/sql/statements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s-2",
            "status": {"state": "SUCCEEDED"},
            "result": {"data_array": [[1], [2], [3], [4]], "truncated": false},
            "manifest": {"total_chunk_count": 2, "total_row_count": 8}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s-2/result/chunks/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data_array": [[5], [6], [7], [8]]})),
        )
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch(
            "execute-statement",
            json!({"warehouse_id": "w-1", "statement": "select n from numbers", "row_limit": 5}),
        )
        .await
        .unwrap();

    assert_eq!(out["result"]["row_count"], 5);
    assert_eq!(out["result"]["truncated"], true);
}

#[tokio::test]
async fn batch_get_isolates_per_item_failures() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    for id in ["1", "3"] {
        Mock::given(method("GET"))
            .and(path("/api/2.0/jobs/get"))
            .and(query_param("job_id", id))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"job_id": id, "name": "etl"})),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/2.0/jobs/get"))
        .and(query_param("job_id", "2"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "Job 2 does not exist"})),
        )
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch("get-jobs-batch", json!({"job_ids": [1, 2, 3]}))
        .await
        .unwrap();

    assert_eq!(out["total"], 3);
    assert_eq!(out["successful"], 2);
    assert_eq!(out["failed"], 1);

    let results = out["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    let failed = results.iter().find(|r| r["key"] == "2").unwrap();
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["error"]["kind"], "not_found");
}

#[tokio::test]
async fn concurrent_dispatches_construct_one_client() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"clusters": []})))
        .mount(&server)
        .await;

    let router = router_for(&server);
    let (a, b, c) = tokio::join!(
        router.dispatch("list-clusters", Value::Null),
        router.dispatch("list-clusters", Value::Null),
        router.dispatch("list-clusters", Value::Null),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let pings = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/2.0/identity/me")
        .count();
    assert_eq!(pings, 1);
}

#[tokio::test]
async fn failed_handshake_is_retried_on_the_next_dispatch() {
    let server = MockServer::start().await;
    // First handshake fails with a non-retryable 403.
    Mock::given(method("GET"))
        .and(path("/api/2.0/identity/me"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_workspace_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"clusters": []})))
        .mount(&server)
        .await;

    let router = router_for(&server);
    let err = operation_error(router.dispatch("list-clusters", Value::Null).await.unwrap_err());
    assert_eq!(err.kind, ErrorKind::Permission);

    // The failure was not cached; the next dispatch reconstructs and works.
    router.dispatch("list-clusters", Value::Null).await.unwrap();
}

#[tokio::test]
async fn run_job_waits_for_a_terminal_state() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/jobs/run-now"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"run_id": 88})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/jobs/runs/get"))
        .and(query_param("run_id", "88"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_id": 88, "state": {"life_cycle_state": "RUNNING"}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.0/jobs/runs/get"))
        .and(query_param("run_id", "88"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_id": 88,
            "state": {"life_cycle_state": "TERMINATED", "result_state": "SUCCESS"}
        })))
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch(
            "run-job",
            json!({"job_id": 12, "poll_interval_secs": 0, "timeout_secs": 30}),
        )
        .await
        .unwrap();
    assert_eq!(out["state"]["life_cycle_state"], "TERMINATED");
}

#[tokio::test]
async fn statements_batch_reports_per_statement_results() {
    let server = MockServer::start().await;
    mount_workspace_ping(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/2.0/sql/statements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s-n",
            "status": {"state": "SUCCEEDED"},
            "result": {"data_array": [[1]], "truncated": false},
            "manifest": {"total_chunk_count": 1, "total_row_count": 1}
        })))
        .mount(&server)
        .await;

    let router = router_for(&server);
    let out = router
        .dispatch(
            "execute-statements-batch",
            json!({"warehouse_id": "w-1", "statements": ["select 1", "select 2"]}),
        )
        .await
        .unwrap();

    assert_eq!(out["total"], 2);
    assert_eq!(out["successful"], 2);
    assert_eq!(out["failed"], 0);
    for key in ["0", "1"] {
        assert!(out["results"].as_array().unwrap().iter().any(|r| r["key"] == key));
    }
}
