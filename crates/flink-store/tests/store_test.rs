//! Integration tests for the statement store.
//!
//! Every remote interaction goes through a scripted gateway and every wait
//! through a manual clock, so minutes of polling run instantly.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{
    FakeGateway, default_properties, pending, pending_with, phase, remote, store, store_with,
};
use flink_proto::{
    ColumnDetails, DataType, Phase, ResultItem, ResultPage, ResultSchema, StatementException,
    StatementStatus, StatementTraits,
};
use flink_store::properties::{
    KEY_CATALOG, KEY_DATABASE, KEY_LOCAL_TIME_ZONE, KEY_RESULTS_TIMEOUT, KEY_SERVICE_ACCOUNT, KEY_STATEMENT_NAME,
};
use flink_store::store::{DEFAULT_RESULTS_TIMEOUT, INITIAL_POLL_WAIT, TERMINAL_POLL_INTERVAL};
use flink_store::{
    FlinkGateway, GatewayError, ManualClock, ProcessedStatement, StatementError, StatementKind,
    StatementOutcome, StatementStore,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ==================== Helper Functions ====================

async fn run<G: FlinkGateway>(
    store: &mut StatementStore<G, ManualClock>,
    sql: &str,
) -> Result<ProcessedStatement, StatementError> {
    match store.process_statement(sql).await? {
        StatementOutcome::Processed(statement) => Ok(statement),
        StatementOutcome::ExitRequested => panic!("unexpected exit for {sql}"),
    }
}

fn rows(statement: &ProcessedStatement) -> Vec<(String, String)> {
    statement
        .results()
        .rows
        .iter()
        .map(|row| (row.fields[0].to_string(), row.fields[1].to_string()))
        .collect()
}

fn listed_value(statement: &ProcessedStatement, key: &str) -> Option<String> {
    rows(statement)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

async fn submitted(store: &mut StatementStore<FakeGateway, ManualClock>) -> ProcessedStatement {
    run(store, "SELECT * FROM orders").await.unwrap()
}

// ==================== Local Statement Tests ====================

#[tokio::test]
async fn test_set_secret_is_sensitive() {
    let (mut store, _) = store(FakeGateway::new());
    let statement = run(&mut store, "SET 'sql.secrets.openai'='k';").await.unwrap();

    assert!(statement.is_local_statement());
    assert!(statement.is_sensitive_statement());
    assert_eq!(statement.status(), Phase::Completed);
    assert_eq!(rows(&statement), vec![("sql.secrets.openai".to_string(), "<hidden>".to_string())]);
    assert!(store.gateway().created().is_empty());
}

#[tokio::test]
async fn test_set_database_is_rejected() {
    let (mut store, _) = store(FakeGateway::new());
    let err = run(&mut store, "SET 'sql.current-database'='x'").await.unwrap_err();

    assert!(matches!(err, StatementError::Config { .. }));
    assert!(err.suggestion().unwrap().contains("USE"));
    assert_eq!(store.properties().get(KEY_DATABASE), None);
}

#[tokio::test]
async fn test_set_escaped_quotes_round_trip() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "SET '''key'''='it''s'").await.unwrap();
    assert_eq!(store.properties().get("'key'"), Some("it's"));
}

#[tokio::test]
async fn test_syntax_error_carries_usage() {
    let (mut store, _) = store(FakeGateway::new());
    let err = run(&mut store, "SET key value").await.unwrap_err();
    assert!(matches!(err, StatementError::Syntax { .. }));
    assert!(!err.usage().is_empty());
}

#[tokio::test]
async fn test_reset_then_list_never_leaks() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "SET 'sql.local-time-zone'='GMT+05:00'").await.unwrap();
    run(&mut store, "SET 'custom.key'='value'").await.unwrap();

    run(&mut store, "RESET 'sql.local-time-zone'").await.unwrap();
    run(&mut store, "RESET 'custom.key'").await.unwrap();
    let listed = run(&mut store, "SET").await.unwrap();

    assert_eq!(
        listed_value(&listed, "sql.local-time-zone").as_deref(),
        Some("GMT+00:00 (default)")
    );
    assert_eq!(listed_value(&listed, "custom.key"), None);
}

#[tokio::test]
async fn test_reset_all_then_list_never_leaks() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "SET 'custom.key'='value'").await.unwrap();
    run(&mut store, "USE CATALOG cat").await.unwrap();

    let reset = run(&mut store, "RESET;").await.unwrap();
    assert_eq!(reset.kind(), StatementKind::Reset);

    let listed = run(&mut store, "SET").await.unwrap();
    assert_eq!(listed_value(&listed, "custom.key"), None);
    assert_eq!(listed_value(&listed, KEY_CATALOG), None);
}

#[tokio::test]
async fn test_use_catalog_cascades_database() {
    let defaults = BTreeMap::from([("sql.local-time-zone".to_string(), "GMT+00:00".to_string())]);
    let initial = BTreeMap::from([
        (KEY_CATALOG.to_string(), "old".to_string()),
        (KEY_DATABASE.to_string(), "db1".to_string()),
    ]);
    let (mut store, _) = store_with(FakeGateway::new(), defaults, initial);

    run(&mut store, "use catalog `new`").await.unwrap();
    let listed = run(&mut store, "SET").await.unwrap();

    assert_eq!(listed_value(&listed, KEY_CATALOG).as_deref(), Some("new"));
    assert_eq!(listed_value(&listed, KEY_DATABASE), None);
}

#[tokio::test]
async fn test_use_catalog_then_list_has_no_database() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "USE `cat`.`db`").await.unwrap();
    run(&mut store, "USE CATALOG other").await.unwrap();

    let listed = run(&mut store, "SET").await.unwrap();
    assert_eq!(listed_value(&listed, KEY_CATALOG).as_deref(), Some("other"));
    assert_eq!(listed_value(&listed, KEY_DATABASE), None);

    submitted(&mut store).await;
    let sent = &store.gateway().created()[0].spec.properties;
    assert_eq!(sent.get(KEY_CATALOG).map(String::as_str), Some("other"));
    assert!(!sent.contains_key(KEY_DATABASE));
}

#[tokio::test]
async fn test_use_database_requires_catalog() {
    let (mut store, _) = store(FakeGateway::new());
    let err = run(&mut store, "USE db").await.unwrap_err();
    assert!(matches!(err, StatementError::Config { .. }));

    run(&mut store, "USE CATALOG cat").await.unwrap();
    let statement = run(&mut store, "USE db").await.unwrap();
    assert_eq!(rows(&statement), vec![(KEY_DATABASE.to_string(), "db".to_string())]);
}

#[tokio::test]
async fn test_exit_and_quit_request_exit() {
    let (mut store, _) = store(FakeGateway::new());
    for sql in ["EXIT", "quit;", "  Exit  "] {
        let outcome = store.process_statement(sql).await.unwrap();
        assert_eq!(outcome, StatementOutcome::ExitRequested);
    }
    assert!(store.gateway().created().is_empty());
}

// ==================== Submission Tests ====================

#[tokio::test]
async fn test_submit_strips_local_properties() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "SET 'client.results-timeout'='1000'").await.unwrap();
    run(&mut store, "SET 'table.exec.state.ttl'='1h'").await.unwrap();

    let statement = submitted(&mut store).await;
    assert!(!statement.is_local_statement());
    assert_eq!(statement.status(), Phase::Pending);
    assert!(statement.is_select_statement());

    let created = store.gateway().created();
    assert_eq!(created.len(), 1);
    let spec = &created[0].spec;
    assert_eq!(spec.statement, "SELECT * FROM orders");
    assert_eq!(spec.properties.get("table.exec.state.ttl").map(String::as_str), Some("1h"));
    assert!(spec.properties.keys().all(|k| !k.starts_with("client.")));
    assert_eq!(spec.compute_pool_id.as_deref(), Some("pool-1"));
    assert_eq!(spec.principal.as_deref(), Some("u-123"));
}

#[tokio::test]
async fn test_service_account_overrides_principal() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "SET 'client.service-account'='sa-42'").await.unwrap();
    submitted(&mut store).await;
    assert_eq!(store.gateway().created()[0].spec.principal.as_deref(), Some("sa-42"));
    assert_eq!(store.properties().get(KEY_SERVICE_ACCOUNT), Some("sa-42"));
}

#[tokio::test]
async fn test_statement_name_is_used_once() {
    let (mut store, _) = store(FakeGateway::new());
    run(&mut store, "SET 'client.statement-name'='my-stmt'").await.unwrap();

    let first = submitted(&mut store).await;
    let second = submitted(&mut store).await;

    assert_eq!(first.name(), "my-stmt");
    assert!(second.name().starts_with("cli-"));
    assert_ne!(second.name(), "my-stmt");
    assert!(!store.properties().has_key(KEY_STATEMENT_NAME));
}

#[tokio::test]
async fn test_submit_failure_surfaces_detail() {
    let gateway = FakeGateway::new().with_create_error(
        GatewayError::new("invalid statement")
            .with_status_code(400)
            .with_detail("SQL validation failed: table not found"),
    );
    let (mut store, _) = store(gateway);

    let err = run(&mut store, "SELECT * FROM missing").await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.failure_detail(), Some("SQL validation failed: table not found"));
}

// ==================== Pending Poll Tests ====================

#[tokio::test]
async fn test_poll_returns_when_phase_leaves_pending() {
    let gateway = FakeGateway::new().with_statuses([pending(), pending(), phase(Phase::Running)]);
    let (store, clock) = store(gateway);

    let statement = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(statement.status(), Phase::Running);
    assert_eq!(store.gateway().get_calls(), 3);
    assert_eq!(clock.sleeps(), vec![INITIAL_POLL_WAIT; 2]);
}

#[tokio::test]
async fn test_poll_wait_steps_every_ten_polls() {
    let mut statuses = vec![pending(); 12];
    statuses.push(phase(Phase::Running));
    let (store, clock) = store(FakeGateway::new().with_statuses(statuses));

    store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap();

    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 12);
    assert!(sleeps[..9].iter().all(|s| *s == Duration::from_millis(300)));
    assert!(sleeps[9..].iter().all(|s| *s == Duration::from_millis(600)));
}

#[tokio::test]
async fn test_poll_never_leaving_pending_times_out() {
    let (mut store, clock) = store(FakeGateway::new().with_statuses([pending()]));
    run(&mut store, "SET 'client.results-timeout'='10000'").await.unwrap();

    let err = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StatementError::Timeout { .. }));
    assert!(err.to_string().contains(KEY_RESULTS_TIMEOUT));
    assert!(clock.elapsed() >= Duration::from_secs(10));
    assert!(clock.elapsed() < Duration::from_secs(11));
}

#[tokio::test]
async fn test_six_pending_details_exhaust_retry_budget() {
    let statuses = (1..=6).map(|i| pending_with(&format!("waiting for resources ({i})")));
    let (store, _) = store(FakeGateway::new().with_statuses(statuses));

    let err = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        StatementError::RetryBudgetExceeded { retries, detail } => {
            assert_eq!(*retries, 6);
            assert!(detail.contains("(6)"));
        }
        other => panic!("expected retry budget error, got {other:?}"),
    }
    assert_eq!(store.gateway().get_calls(), 6);
}

#[tokio::test]
async fn test_five_pending_details_are_tolerated() {
    let mut statuses: Vec<StatementStatus> = (0..5).map(|_| pending_with("busy")).collect();
    statuses.push(phase(Phase::Completed));
    let (store, _) = store(FakeGateway::new().with_statuses(statuses));

    let statement = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(statement.status(), Phase::Completed);
}

#[tokio::test]
async fn test_poll_gateway_error_is_returned() {
    let gateway = FakeGateway::new().with_statement(Err(GatewayError::new("service unavailable")
        .with_status_code(503)
        .with_detail("try again later")));
    let (store, _) = store(gateway);

    let err = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.failure_detail(), Some("try again later"));
    assert!(store.gateway().deleted().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_poll_deletes_once() {
    let token = CancellationToken::new();
    let gateway = FakeGateway::new()
        .with_statuses([pending()])
        .cancel_after_gets(3, token.clone());
    let (store, _) = store(gateway);

    let err = store.wait_for_pending_statement("stmt", &token).await.unwrap_err();

    assert_eq!(err, StatementError::cancelled());
    assert_eq!(err.status_code(), Some(499));
    assert_eq!(store.gateway().deleted(), vec!["stmt".to_string()]);
    assert_eq!(store.gateway().get_calls(), 3);
}

#[tokio::test]
async fn test_cancel_before_poll_deletes_without_polling() {
    let token = CancellationToken::new();
    token.cancel();
    let (store, _) = store(FakeGateway::new().with_statuses([pending()]));

    let err = store.wait_for_pending_statement("stmt", &token).await.unwrap_err();
    assert!(matches!(err, StatementError::Cancelled { .. }));
    assert_eq!(store.gateway().deleted().len(), 1);
    assert_eq!(store.gateway().get_calls(), 0);
}

#[tokio::test]
async fn test_cancel_swallows_delete_failure() {
    let token = CancellationToken::new();
    let gateway = FakeGateway::new()
        .with_statuses([pending()])
        .with_delete_error(GatewayError::new("boom").with_status_code(500))
        .cancel_after_gets(1, token.clone());
    let (store, _) = store(gateway);

    let err = store.wait_for_pending_statement("stmt", &token).await.unwrap_err();
    assert_eq!(err, StatementError::cancelled());
    assert_eq!(store.gateway().deleted().len(), 1);
}

#[tokio::test]
async fn test_progress_is_reported_every_five_seconds() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (mut store, _) = store(FakeGateway::new().with_statuses([pending()]));
    run(&mut store, "SET 'client.results-timeout'='12000'").await.unwrap();
    let store = store.with_progress(tx);

    store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap_err();

    let mut reports = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        reports.push(progress);
    }
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|p| p.statement_name == "stmt" && p.phase == Phase::Pending));
    assert!(reports[0].elapsed >= Duration::from_secs(5));
    assert!(reports[1].elapsed >= Duration::from_secs(10));
    assert_eq!(reports[0].timeout, Duration::from_secs(12));
}

#[tokio::test]
async fn test_results_timeout_falls_back_on_bad_value() {
    let (mut store, _) = store(FakeGateway::new());
    assert_eq!(store.results_timeout(), DEFAULT_RESULTS_TIMEOUT);

    run(&mut store, "SET 'client.results-timeout'='soon'").await.unwrap();
    assert_eq!(store.results_timeout(), DEFAULT_RESULTS_TIMEOUT);

    run(&mut store, "SET 'client.results-timeout'='2500'").await.unwrap();
    assert_eq!(store.results_timeout(), Duration::from_millis(2500));
}

#[tokio::test]
async fn test_failed_statement_detail_backfilled_from_exceptions() {
    let gateway = FakeGateway::new()
        .with_statuses([phase(Phase::Failed)])
        .with_exceptions(Ok(vec![
            StatementException::new("ValidationException", "Table 'orders' not found"),
            StatementException::new("Older", "older failure"),
        ]));
    let (store, _) = store(gateway);

    let statement = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(statement.status(), Phase::Failed);
    assert_eq!(statement.status_detail(), "Table 'orders' not found");
}

#[tokio::test]
async fn test_exception_lookup_failure_yields_empty_detail() {
    let gateway = FakeGateway::new()
        .with_statuses([phase(Phase::Failing)])
        .with_exceptions(Err(GatewayError::new("nope")));
    let (store, _) = store(gateway);

    let statement = store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(statement.status_detail(), "");
    assert_eq!(store.gateway().exception_calls(), 1);
}

#[tokio::test]
async fn test_running_statement_skips_exception_lookup() {
    let (store, _) = store(FakeGateway::new().with_statuses([phase(Phase::Running)]));
    store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(store.gateway().exception_calls(), 0);
}

// ==================== Result Fetch Tests ====================

fn schema_status() -> StatementStatus {
    let traits = StatementTraits {
        sql_kind: "SELECT".into(),
        is_bounded: true,
        is_append_only: true,
        schema: Some(ResultSchema {
            columns: vec![
                ColumnDetails::new("id", DataType::atomic("INTEGER")),
                ColumnDetails::new("name", DataType::atomic("VARCHAR")),
            ],
        }),
        ..StatementTraits::default()
    };
    StatementStatus::new(Phase::Completed).with_traits(traits)
}

async fn completed_select(store: &StatementStore<FakeGateway, ManualClock>) -> ProcessedStatement {
    store
        .wait_for_pending_statement("stmt", &CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fetch_extracts_page_token() {
    let gateway = FakeGateway::new()
        .with_statuses([schema_status()])
        .with_page(Ok(ResultPage::new(
            vec![ResultItem::insert(vec![json!("1"), json!("alice")])],
            Some("https://flink.example/sql/v1/statements/stmt/results?page_token=ABC123".into()),
        )))
        .with_page(Ok(ResultPage::new(
            vec![ResultItem::insert(vec![json!("2"), json!(null)])],
            None,
        )));
    let (store, _) = store(gateway);
    let statement = completed_select(&store).await;

    let first = store.fetch_statement_results(statement).await.unwrap();
    assert_eq!(first.page_token(), "ABC123");
    assert_eq!(first.results().headers, vec!["id", "name"]);
    assert_eq!(first.results().rows[0].fields[1].to_string(), "alice");

    let second = store.fetch_statement_results(first).await.unwrap();
    assert_eq!(second.page_token(), "");
    assert!(!second.has_more_pages());
    assert_eq!(second.results().rows[0].fields[1].to_string(), "NULL");

    assert_eq!(store.gateway().page_tokens(), vec!["".to_string(), "ABC123".to_string()]);
}

#[tokio::test]
async fn test_fetch_is_noop_for_local_statements() {
    let (mut store, _) = store(FakeGateway::new());
    let statement = run(&mut store, "SET 'a'='b'").await.unwrap();

    let fetched = store.fetch_statement_results(statement.clone()).await.unwrap();
    assert_eq!(fetched, statement);
    assert!(store.gateway().page_tokens().is_empty());
}

#[tokio::test]
async fn test_fetch_conversion_error() {
    let gateway = FakeGateway::new()
        .with_statuses([schema_status()])
        .with_page(Ok(ResultPage::new(vec![ResultItem::insert(vec![json!("1")])], None)));
    let (store, _) = store(gateway);
    let statement = completed_select(&store).await;

    let err = store.fetch_statement_results(statement).await.unwrap_err();
    assert!(matches!(err, StatementError::ResultConversion(_)));
}

#[tokio::test]
async fn test_fetch_all_concatenates_pages() {
    let page = |id: &str, next: Option<&str>| -> Result<ResultPage, GatewayError> {
        Ok(ResultPage::new(
            vec![ResultItem::insert(vec![json!(id), json!("x")])],
            next.map(|t| format!("/results?page_token={t}")),
        ))
    };
    let gateway = FakeGateway::new()
        .with_statuses([schema_status()])
        .with_page(page("1", Some("p2")))
        .with_page(page("2", Some("p3")))
        .with_page(page("3", None));
    let (store, _) = store(gateway);
    let statement = completed_select(&store).await;

    let all = store
        .fetch_all_results(statement, &CancellationToken::new(), 10)
        .await
        .unwrap();
    let ids: Vec<String> = all.results().rows.iter().map(|r| r.fields[0].to_string()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert!(!all.has_more_pages());
}

#[tokio::test]
async fn test_fetch_all_stops_at_page_cap() {
    let page = |t: &str| -> Result<ResultPage, GatewayError> {
        Ok(ResultPage::new(
            vec![ResultItem::insert(vec![json!("1"), json!("x")])],
            Some(format!("/results?page_token={t}")),
        ))
    };
    let gateway = FakeGateway::new()
        .with_statuses([schema_status()])
        .with_page(page("a"))
        .with_page(page("b"))
        .with_page(page("c"));
    let (store, _) = store(gateway);
    let statement = completed_select(&store).await;

    let capped = store
        .fetch_all_results(statement, &CancellationToken::new(), 2)
        .await
        .unwrap();
    assert_eq!(capped.results().len(), 2);
    assert_eq!(capped.page_token(), "b");
}

#[tokio::test]
async fn test_fetch_all_pauses_on_empty_page() {
    let gateway = FakeGateway::new()
        .with_statuses([schema_status()])
        .with_page(Ok(ResultPage::new(
            vec![ResultItem::insert(vec![json!("1"), json!("x")])],
            Some("/results?page_token=p2".into()),
        )))
        .with_page(Ok(ResultPage::new(Vec::new(), Some("/results?page_token=p3".into()))))
        .with_page(Ok(ResultPage::new(
            vec![ResultItem::insert(vec![json!("3"), json!("x")])],
            None,
        )));
    let (store, _) = store(gateway);
    let statement = completed_select(&store).await;

    let fetched = store
        .fetch_all_results(statement, &CancellationToken::new(), 100)
        .await
        .unwrap();

    assert_eq!(fetched.results().len(), 1);
    assert_eq!(fetched.page_token(), "p3");
    assert!(fetched.has_more_pages());
    assert_eq!(store.gateway().page_tokens(), vec!["".to_string(), "p2".to_string()]);
}

// ==================== Stop / Delete Tests ====================

#[tokio::test]
async fn test_stop_statement_flips_stopped_flag() {
    let gateway = FakeGateway::new().with_statement(Ok(remote("stmt", "SELECT 1", phase(Phase::Running))));
    let (store, _) = store(gateway);

    assert!(store.stop_statement("stmt").await);
    let updated = store.gateway().updated();
    assert_eq!(updated.len(), 1);
    assert!(updated[0].spec.stopped);
}

#[tokio::test]
async fn test_stop_statement_failure_is_swallowed() {
    let gateway = FakeGateway::new()
        .with_statuses([phase(Phase::Running)])
        .with_update_error(GatewayError::new("conflict").with_status_code(409));
    let (store, _) = store(gateway);
    assert!(!store.stop_statement("stmt").await);

    let (store, _) = common::store(FakeGateway::new());
    assert!(!store.stop_statement("missing").await);
}

#[tokio::test]
async fn test_delete_statement_reports_outcome() {
    let (store, _) = store(FakeGateway::new());
    assert!(store.delete_statement("stmt").await);

    let gateway = FakeGateway::new().with_delete_error(GatewayError::new("gone").with_status_code(404));
    let (store, _) = common::store(gateway);
    assert!(!store.delete_statement("stmt").await);
}

// ==================== Terminal Wait Tests ====================

#[tokio::test]
async fn test_terminal_wait_polls_every_second() {
    let gateway = FakeGateway::new().with_statuses([
        phase(Phase::Running),
        phase(Phase::Running),
        phase(Phase::Completed),
    ]);
    let (store, clock) = store(gateway);

    let statement = store
        .wait_for_terminal_statement_state("stmt", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(statement.status(), Phase::Completed);
    assert_eq!(clock.sleeps(), vec![TERMINAL_POLL_INTERVAL; 2]);
}

#[tokio::test]
async fn test_terminal_wait_ignores_pending_details() {
    let mut statuses: Vec<StatementStatus> = (0..8).map(|_| pending_with("busy")).collect();
    statuses.push(phase(Phase::Stopped));
    let (store, _) = store(FakeGateway::new().with_statuses(statuses));

    let statement = store
        .wait_for_terminal_statement_state("stmt", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(statement.status(), Phase::Stopped);
}

#[tokio::test]
async fn test_terminal_wait_cancel_detaches() {
    let token = CancellationToken::new();
    let gateway = FakeGateway::new()
        .with_statuses([phase(Phase::Running)])
        .cancel_after_gets(2, token.clone());
    let (store, _) = store(gateway);

    let statement = store.wait_for_terminal_statement_state("stmt", &token).await.unwrap();
    assert_eq!(statement.status(), Phase::Running);
    assert!(store.gateway().deleted().is_empty());
    assert_eq!(store.gateway().get_calls(), 2);
}

#[tokio::test]
async fn test_defaults_survive_submission() {
    let (mut store, _) = store_with(FakeGateway::new(), default_properties(), BTreeMap::new());
    submitted(&mut store).await;
    assert_eq!(store.properties().get(KEY_LOCAL_TIME_ZONE), Some("GMT+00:00"));
}
