//! Statement Execution Module
//!
//! Runs one logical statement that routing has split into several physical
//! statements:
//! - Single-unit fast path on the calling thread
//! - Parallel fan-out/fan-in on the worker pool for multiple units
//! - Per-connection serialization of units sharing a connection
//! - Lifecycle events and a configurable suppress/propagate failure policy

mod context;
mod engine;
mod event;
mod exception;
mod metrics;
mod outcome;
mod statement;
mod unit;

pub use context::{DataMap, ExecutionContext};
pub use engine::{ExecutionEngine, ExecutorEngine};
pub use event::{
    EventBus, EventCategory, EventExecutionType, EventPublisher, ExecutionEvent, NoopPublisher,
    SqlType,
};
pub use exception::{ExceptionHandler, ExceptionPolicy};
pub use metrics::{ExecutionMetrics, TimerContext, TimerStats};
pub use outcome::{Merged, SuppressedFailure, UnitOutcome};
pub use statement::StatementExecutor;
pub use unit::{
    AutoGeneratedKeys, ExecuteOption, ShardConnection, ShardStatement, SqlExecutionUnit,
    StatementUnit,
};

/// Failure raised by a physical statement against one shard
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (SQLState: {}, vendor code: {vendor_code})", .sql_state.as_deref().unwrap_or("none"))]
pub struct SqlError {
    pub message: String,
    pub sql_state: Option<String>,
    pub vendor_code: i32,
}

impl SqlError {
    pub fn new(message: impl Into<String>) -> Self {
        SqlError {
            message: message.into(),
            sql_state: None,
            vendor_code: 0,
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn with_vendor_code(mut self, vendor_code: i32) -> Self {
        self.vendor_code = vendor_code;
        self
    }
}

/// Execution error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// A unit failed and the exception policy propagated it
    #[error("Execution failed on data source '{data_source}' for SQL '{sql}': {source}")]
    Execution {
        data_source: String,
        sql: String,
        #[source]
        source: SqlError,
    },

    /// Worker pool failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl ExecutorError {
    /// The statement failure wrapped by a propagated unit error
    pub fn sql_error(&self) -> Option<&SqlError> {
        match self {
            ExecutorError::Execution { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for execution operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
