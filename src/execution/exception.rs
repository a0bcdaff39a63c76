//! Unit failure policy
//!
//! Decides whether a unit failure aborts the logical call or is absorbed so
//! the remaining units can still contribute partial results.

use std::sync::atomic::{AtomicBool, Ordering};

use super::event::ExecutionEvent;
use super::{ExecutorError, SqlError};
use crate::config::ExecutorConfig;

/// Classifies unit failures into propagate or suppress
pub trait ExceptionPolicy: Send + Sync {
    /// Policy flag captured into the execution context at call start
    fn is_exception_thrown(&self) -> bool;

    /// Handle one unit failure.
    ///
    /// `exception_thrown` is the flag captured for the logical call, not the
    /// live setting. Returns `Err` to propagate, or hands the error back when
    /// it is suppressed.
    fn handle(
        &self,
        exception_thrown: bool,
        event: &ExecutionEvent,
        error: SqlError,
    ) -> Result<SqlError, ExecutorError>;
}

/// Default policy backed by a switchable flag
#[derive(Debug)]
pub struct ExceptionHandler {
    exception_thrown: AtomicBool,
}

impl ExceptionHandler {
    pub fn new(exception_thrown: bool) -> Self {
        ExceptionHandler {
            exception_thrown: AtomicBool::new(exception_thrown),
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.exception_thrown)
    }

    /// Change the policy for logical calls started from now on
    pub fn set_exception_thrown(&self, exception_thrown: bool) {
        self.exception_thrown
            .store(exception_thrown, Ordering::Relaxed);
    }
}

impl Default for ExceptionHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExceptionPolicy for ExceptionHandler {
    fn is_exception_thrown(&self) -> bool {
        self.exception_thrown.load(Ordering::Relaxed)
    }

    fn handle(
        &self,
        exception_thrown: bool,
        event: &ExecutionEvent,
        error: SqlError,
    ) -> Result<SqlError, ExecutorError> {
        if exception_thrown {
            return Err(ExecutorError::Execution {
                data_source: event.data_source().to_string(),
                sql: event.sql().to_string(),
                source: error,
            });
        }
        tracing::error!(
            event_id = %event.id(),
            data_source = %event.data_source(),
            sql = %event.sql(),
            error = %error,
            "unit_failure_suppressed"
        );
        Ok(error)
    }
}
