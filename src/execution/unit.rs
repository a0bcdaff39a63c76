//! Execution units and the physical statement contract
//!
//! A `StatementUnit` pairs one shard's statement handle with the SQL routed to
//! it. Several units may share a `ShardConnection`; the connection carries the
//! lock that keeps their statement calls from interleaving.

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::ExecutionContext;
use super::SqlError;

/// Counter for connection identities
static CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

/// SQL routed to a single data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlExecutionUnit {
    /// Name of the target data source (shard)
    pub data_source: String,

    /// Physical SQL text
    pub sql: String,

    /// Bound parameters, empty for plain statements
    #[serde(default)]
    pub parameters: Vec<serde_json::Value>,
}

impl SqlExecutionUnit {
    pub fn new(data_source: impl Into<String>, sql: impl Into<String>) -> Self {
        SqlExecutionUnit {
            data_source: data_source.into(),
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<serde_json::Value>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Physical shard connection shared by every statement created on it
#[derive(Debug)]
pub struct ShardConnection {
    id: u64,
    data_source: String,
    lock: Mutex<()>,
}

impl ShardConnection {
    pub fn new(data_source: impl Into<String>) -> Self {
        ShardConnection {
            id: CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            data_source: data_source.into(),
            lock: Mutex::new(()),
        }
    }

    /// Process-unique identity of this connection instance
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// Acquire exclusive use of the connection until the guard drops
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Whether a statement currently holds the connection
    pub fn is_in_use(&self) -> bool {
        self.lock.is_locked()
    }
}

/// Generated-key retrieval mode for update and execute calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoGeneratedKeys {
    /// Make auto-generated keys available for retrieval
    Return,
    /// Do not retrieve auto-generated keys
    NoReturn,
}

/// Which form of the underlying update/execute call to invoke
///
/// Only changes how the statement is called; dispatch, locking, events and
/// failure handling are the same for every variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecuteOption {
    #[default]
    Plain,
    GeneratedKeys(AutoGeneratedKeys),
    ColumnIndexes(Vec<usize>),
    ColumnNames(Vec<String>),
}

/// Physical statement bound to one shard connection
///
/// Implementations receive the caller's `ExecutionContext` so code running on
/// a worker thread sees the same policy flag and correlation data as the
/// thread that issued the logical call.
pub trait ShardStatement: Send + Sync {
    /// Result set handle produced by a query
    type ResultSet: Send;

    /// Connection this statement was created on
    fn connection(&self) -> &ShardConnection;

    fn execute_query(
        &self,
        unit: &SqlExecutionUnit,
        context: &ExecutionContext,
    ) -> Result<Self::ResultSet, SqlError>;

    /// Returns the number of affected rows
    fn execute_update(
        &self,
        unit: &SqlExecutionUnit,
        option: &ExecuteOption,
        context: &ExecutionContext,
    ) -> Result<u64, SqlError>;

    /// Returns true when the statement produced a result set
    fn execute(
        &self,
        unit: &SqlExecutionUnit,
        option: &ExecuteOption,
        context: &ExecutionContext,
    ) -> Result<bool, SqlError>;
}

/// One shard's share of a logical statement
#[derive(Debug, Clone)]
pub struct StatementUnit<S> {
    pub sql_unit: SqlExecutionUnit,
    pub statement: S,
}

impl<S> StatementUnit<S> {
    pub fn new(sql_unit: SqlExecutionUnit, statement: S) -> Self {
        StatementUnit {
            sql_unit,
            statement,
        }
    }
}
