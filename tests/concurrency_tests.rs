//! Connection Serialization Tests
//!
//! Tests for:
//! - Units sharing one connection never overlapping their statement calls
//! - Mixed shared and dedicated connections under repeated parallel calls
//! - Fail-fast isolation with shared connections

use shardexec::{
    EventBus, ExceptionHandler, ExecuteOption, ExecutionContext, ExecutorConfig, ExecutorEngine,
    IsolationMode, NoopPublisher, ShardConnection, ShardStatement, SqlError, SqlExecutionUnit,
    SqlType, StatementExecutor, StatementUnit,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

/// Instrumented connection state shared by every statement on one connection
#[derive(Default)]
struct ReentryDetector {
    busy: AtomicBool,
    overlaps: AtomicUsize,
    calls: AtomicUsize,
}

impl ReentryDetector {
    fn enter(&self) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

struct InstrumentedStatement {
    connection: Arc<ShardConnection>,
    detector: Arc<ReentryDetector>,
    hold: Duration,
    fail: bool,
}

impl InstrumentedStatement {
    fn call(&self) -> Result<u64, SqlError> {
        self.detector.enter();
        thread::sleep(self.hold);
        self.detector.exit();
        if self.fail {
            Err(SqlError::new("lost connection"))
        } else {
            Ok(1)
        }
    }
}

impl ShardStatement for InstrumentedStatement {
    type ResultSet = u64;

    fn connection(&self) -> &ShardConnection {
        &self.connection
    }

    fn execute_query(
        &self,
        _unit: &SqlExecutionUnit,
        _context: &ExecutionContext,
    ) -> Result<u64, SqlError> {
        self.call()
    }

    fn execute_update(
        &self,
        _unit: &SqlExecutionUnit,
        _option: &ExecuteOption,
        _context: &ExecutionContext,
    ) -> Result<u64, SqlError> {
        self.call()
    }

    fn execute(
        &self,
        _unit: &SqlExecutionUnit,
        _option: &ExecuteOption,
        _context: &ExecutionContext,
    ) -> Result<bool, SqlError> {
        self.call().map(|_| false)
    }
}

fn create_engine(threads: usize, isolation: IsolationMode) -> ExecutorEngine {
    let config = ExecutorConfig {
        max_threads: threads,
        isolation,
        ..ExecutorConfig::default()
    };
    ExecutorEngine::new(&config).unwrap()
}

fn unit_on(
    connection: &Arc<ShardConnection>,
    detector: &Arc<ReentryDetector>,
    table: usize,
) -> StatementUnit<InstrumentedStatement> {
    StatementUnit::new(
        SqlExecutionUnit::new(
            connection.data_source(),
            format!("UPDATE t_order_{table} SET status = 'PAID'"),
        ),
        InstrumentedStatement {
            connection: Arc::clone(connection),
            detector: Arc::clone(detector),
            hold: Duration::from_millis(20),
            fail: false,
        },
    )
}

// ============================================================================
// Mutual Exclusion Tests
// ============================================================================

#[test]
fn test_units_sharing_connection_never_overlap() {
    let engine = create_engine(4, IsolationMode::WaitForAll);
    let connection = Arc::new(ShardConnection::new("ds_0"));
    let detector = Arc::new(ReentryDetector::default());
    let units = vec![
        unit_on(&connection, &detector, 0),
        unit_on(&connection, &detector, 1),
    ];

    let executor = StatementExecutor::new(
        &engine,
        SqlType::Update,
        &units,
        Arc::new(NoopPublisher),
        Arc::new(ExceptionHandler::default()),
    );

    assert_eq!(*executor.execute_update().unwrap().value(), 2);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
    assert_eq!(detector.overlaps.load(Ordering::SeqCst), 0);
    assert!(!connection.is_in_use());
}

#[test]
fn test_mixed_connections_under_repeated_calls() {
    let engine = create_engine(8, IsolationMode::WaitForAll);
    let shared_a = Arc::new(ShardConnection::new("ds_0"));
    let shared_b = Arc::new(ShardConnection::new("ds_1"));
    let detector_a = Arc::new(ReentryDetector::default());
    let detector_b = Arc::new(ReentryDetector::default());

    let mut units = Vec::new();
    for table in 0..4 {
        units.push(unit_on(&shared_a, &detector_a, table));
        units.push(unit_on(&shared_b, &detector_b, table));
    }
    for unit in &mut units {
        unit.statement.hold = Duration::from_millis(2);
    }

    let bus = Arc::new(EventBus::new());
    let executor = StatementExecutor::new(
        &engine,
        SqlType::Update,
        &units,
        bus,
        Arc::new(ExceptionHandler::default()),
    );

    for _ in 0..10 {
        assert_eq!(*executor.execute_update().unwrap().value(), 8);
        assert_eq!(executor.execute_query().unwrap().len(), 8);
    }

    assert_eq!(detector_a.calls.load(Ordering::SeqCst), 80);
    assert_eq!(detector_b.calls.load(Ordering::SeqCst), 80);
    assert_eq!(detector_a.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(detector_b.overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_logical_calls_share_connection_lock() {
    let engine = Arc::new(create_engine(4, IsolationMode::WaitForAll));
    let connection = Arc::new(ShardConnection::new("ds_0"));
    let detector = Arc::new(ReentryDetector::default());
    let units = Arc::new(vec![
        unit_on(&connection, &detector, 0),
        unit_on(&connection, &detector, 1),
    ]);

    // Two callers issue logical statements against the same connection at once
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let units = Arc::clone(&units);
            thread::spawn(move || {
                let executor = StatementExecutor::new(
                    engine.as_ref(),
                    SqlType::Update,
                    units.as_slice(),
                    Arc::new(NoopPublisher),
                    Arc::new(ExceptionHandler::default()),
                );
                executor.execute_update().unwrap().into_value()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
    assert_eq!(detector.overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lock_released_after_failure() {
    let engine = create_engine(2, IsolationMode::FailFast);
    let connection = Arc::new(ShardConnection::new("ds_0"));
    let detector = Arc::new(ReentryDetector::default());
    let mut units = vec![
        unit_on(&connection, &detector, 0),
        unit_on(&connection, &detector, 1),
    ];
    units[0].statement.fail = true;

    let executor = StatementExecutor::new(
        &engine,
        SqlType::Delete,
        &units,
        Arc::new(NoopPublisher),
        Arc::new(ExceptionHandler::new(true)),
    );

    assert!(executor.execute_update().is_err());
    assert!(!connection.is_in_use());
    assert_eq!(detector.overlaps.load(Ordering::SeqCst), 0);
}
