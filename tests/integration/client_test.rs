//! Retrying read tests.
//!
//! Drives `WarehouseClient` end to end through the public API.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use synapse_reader::auth::{AccessToken, StaticTokenProvider, TokenProvider};
use synapse_reader::config::ConnectionConfig;
use synapse_reader::db::{DriverError, ScriptedDriver, ScriptedOutcome};
use synapse_reader::query::{NoopObserver, ReadObserver, RetryPolicy};
use synapse_reader::wire::decode_token;
use synapse_reader::{ReaderError, WarehouseClient};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

const HOST: &str = "myws.sql.azuresynapse.net";

fn client_with(driver: &ScriptedDriver, policy: RetryPolicy) -> WarehouseClient {
    WarehouseClient::new(
        ConnectionConfig::new(HOST, "dw"),
        Arc::new(driver.clone()),
        Arc::new(StaticTokenProvider::new(AccessToken::new("eyJ.test.token"))),
    )
    .with_observer(Arc::new(NoopObserver))
    .with_policy(policy)
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(max_attempts)
        .with_sleep(Duration::from_millis(10))
}

#[derive(Default)]
struct DurationRecorder {
    completed: Mutex<Option<(u32, Duration)>>,
}

impl ReadObserver for DurationRecorder {
    fn completed(&self, attempts: u32, _rows: usize, elapsed: Duration) {
        *self.completed.lock().unwrap() = Some((attempts, elapsed));
    }
}

struct RotatingTokens {
    issued: Mutex<u32>,
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn get_token(&self) -> synapse_reader::Result<AccessToken> {
        let mut issued = self.issued.lock().unwrap();
        *issued += 1;
        Ok(AccessToken::new(format!("rotated-{issued}")))
    }
}

#[tokio::test]
async fn test_always_transient_exhausts_after_max_attempts() {
    let driver = ScriptedDriver::new().with_fallback(ScriptedOutcome::transient("connection failed"));
    let client = client_with(&driver, policy(3));

    let start = Instant::now();
    let err = client
        .read("SELECT 1", &CancellationToken::new())
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains(HOST), "unexpected message: {msg}");
    assert!(msg.contains("3 attempts"), "unexpected message: {msg}");
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(driver.stats().queries(), 3);
}

#[tokio::test]
async fn test_schema_error_surfaces_after_one_attempt() {
    let driver = ScriptedDriver::with_script([ScriptedOutcome::fatal(
        "Invalid object name 'dbo.does_not_exist'.",
    )]);
    let client = client_with(&driver, policy(5));

    let err = client
        .read("SELECT * FROM dbo.does_not_exist", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ReaderError::FatalQuery(detail) => {
            assert_eq!(detail, "Invalid object name 'dbo.does_not_exist'.")
        }
        other => panic!("Expected FatalQuery, got {other:?}"),
    }
    assert_eq!(driver.stats().queries(), 1);
}

#[tokio::test]
async fn test_retry_on_zero_returns_third_attempt() {
    let driver = ScriptedDriver::with_script([
        ScriptedOutcome::empty(),
        ScriptedOutcome::empty(),
        ScriptedOutcome::rows(2),
    ]);
    let recorder = Arc::new(DurationRecorder::default());
    let client = client_with(&driver, policy(5).with_retry_on_zero(true))
        .with_observer(recorder.clone());

    let result = assert_ok!(client.read("SELECT * FROM sales", &CancellationToken::new()).await);

    assert_eq!(result.row_count, 2);
    assert_eq!(driver.stats().queries(), 3);
    let (attempts, elapsed) = recorder.completed.lock().unwrap().unwrap();
    assert_eq!(attempts, 3);
    assert!(elapsed >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_every_attempt_releases_its_connection() {
    let driver = ScriptedDriver::with_script([
        ScriptedOutcome::transient("connection reset by peer"),
        ScriptedOutcome::ConnectError(DriverError::operational("Login timeout expired")),
        ScriptedOutcome::empty(),
        ScriptedOutcome::rows(1),
    ])
    .with_failing_release();
    let client = client_with(&driver, policy(5).with_retry_on_zero(true));

    assert_ok!(client.read("SELECT 1", &CancellationToken::new()).await);

    let stats = driver.stats();
    assert_eq!(stats.engines_created(), 4);
    assert_eq!(stats.connections_opened(), 3);
    assert!(stats.all_released());
}

#[tokio::test]
async fn test_fresh_token_for_each_attempt() {
    let driver = ScriptedDriver::with_script([
        ScriptedOutcome::transient("connection reset"),
        ScriptedOutcome::transient("connection reset"),
        ScriptedOutcome::rows(1),
    ]);
    let client = WarehouseClient::new(
        ConnectionConfig::new(HOST, "dw"),
        Arc::new(driver.clone()),
        Arc::new(RotatingTokens {
            issued: Mutex::new(0),
        }),
    )
    .with_observer(Arc::new(NoopObserver))
    .with_policy(policy(3));

    assert_ok!(client.read("SELECT 1", &CancellationToken::new()).await);

    let tokens: Vec<String> = driver
        .connects()
        .iter()
        .map(|c| decode_token(c.attrs_before.get(1256).unwrap()).unwrap())
        .collect();
    assert_eq!(tokens, vec!["rotated-1", "rotated-2", "rotated-3"]);
}

#[tokio::test]
async fn test_cancel_stops_hung_query() {
    let driver = ScriptedDriver::with_script([ScriptedOutcome::Hang]);
    let client = client_with(&driver, policy(3));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        canceller.cancel();
    });

    let err = assert_err!(client.read("SELECT 1", &cancel).await);
    assert!(matches!(err, ReaderError::Cancelled));
    assert!(driver.stats().all_released());
}

#[tokio::test]
async fn test_independent_clients_run_concurrently() {
    let slow = ScriptedDriver::new().with_latency(Duration::from_millis(30));
    let a = client_with(&slow, policy(1));
    let b = client_with(&slow, policy(1));
    let cancel = CancellationToken::new();

    let (ra, rb) = tokio::join!(a.read("SELECT 1", &cancel), b.read("SELECT 2", &cancel));

    assert_ok!(ra);
    assert_ok!(rb);
    assert_eq!(slow.stats().queries(), 2);
    assert!(slow.stats().all_released());
}
