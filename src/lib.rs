//! # shardexec
//!
//! Statement execution core for database-sharding middleware.
//!
//! Routing splits one logical SQL statement into several physical statements,
//! one per shard connection. This crate runs them and hands back a single
//! logical result.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Logical call (query / update / execute)
//!     ↓
//! [Context snapshot]       → exception policy flag + correlation data
//!     ↓
//! 1 unit ──→ [Inline execution on the calling thread]
//! N units ─→ [ExecutorEngine]  → rayon worker pool, results in unit order
//!                ↓ per unit
//!            [Connection lock] → units sharing a connection never overlap
//!            [Lifecycle events] → BeforeExecute, then ExecuteSuccess / ExecuteFailure
//!            [ExceptionPolicy]  → propagate or suppress unit failures
//!     ↓
//! [Merge]                  → result sets as-is / summed row counts / first flag
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shardexec::{Config, EventBus, ExceptionHandler, ExecutorEngine, SqlType, StatementExecutor};
//! use std::sync::Arc;
//!
//! let config = Config::load()?;
//! shardexec::init_logging(&config.logging);
//!
//! let engine = ExecutorEngine::new(&config.executor)?;
//! let events = Arc::new(EventBus::new());
//! let policy = Arc::new(ExceptionHandler::from_config(&config.executor));
//!
//! // `units` come from the routing layer, one per target shard
//! let executor = StatementExecutor::new(&engine, SqlType::Update, &units, events, policy);
//! let affected = executor.execute_update()?;
//! println!("{} rows", affected.value());
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `execution` | Executor, engine, events, failure policy, metrics |
//! | `config` | Layered configuration (TOML + env) |
//! | `logging` | Tracing subscriber setup |

pub mod config;
pub mod execution;
pub mod logging;

pub use config::{Config, ExecutorConfig, IsolationMode, LoggingConfig};
pub use logging::init_logging;

// Re-export execution types
pub use execution::{
    AutoGeneratedKeys, DataMap, EventBus, EventCategory, EventExecutionType, EventPublisher,
    ExceptionHandler, ExceptionPolicy, ExecuteOption, ExecutionContext, ExecutionEngine,
    ExecutionEvent, ExecutionMetrics, ExecutorEngine, ExecutorError, ExecutorResult, Merged,
    NoopPublisher, ShardConnection, ShardStatement, SqlError, SqlExecutionUnit, SqlType,
    StatementExecutor, StatementUnit, SuppressedFailure, TimerContext, TimerStats, UnitOutcome,
};
