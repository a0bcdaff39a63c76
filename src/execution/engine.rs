//! Parallel Execution Engine
//!
//! Runs one action per input on a dedicated rayon worker pool and returns the
//! results in input order, whatever order the workers finish in.
//!
//! ## Failure isolation
//!
//! - `IsolationMode::WaitForAll`: every input runs; the error of the
//!   lowest-indexed failing input is returned afterwards.
//! - `IsolationMode::FailFast`: rayon stops handing out inputs once an error
//!   is observed. Inputs already running finish.
//!
//! A panicking action is reported as `ExecutorError::Engine` instead of
//! unwinding into the caller.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::{ExecutorError, ExecutorResult};
use crate::config::{ExecutorConfig, IsolationMode};

/// Fan-out/fan-in executor consumed by `StatementExecutor`
pub trait ExecutionEngine: Send + Sync {
    /// Run `action` once per input; output position `i` belongs to input `i`
    fn execute<I, T, F>(&self, inputs: &[I], action: F) -> ExecutorResult<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> ExecutorResult<T> + Sync + Send;
}

/// Worker pool backed engine
#[derive(Debug)]
pub struct ExecutorEngine {
    pool: ThreadPool,
    isolation: IsolationMode,
}

impl ExecutorEngine {
    pub fn new(config: &ExecutorConfig) -> ExecutorResult<Self> {
        config.validate()?;
        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.effective_threads())
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()
            .map_err(|e| ExecutorError::Engine(format!("Failed to build worker pool: {e}")))?;

        tracing::debug!(
            threads = pool.current_num_threads(),
            isolation = ?config.isolation,
            "executor_engine_started"
        );

        Ok(ExecutorEngine {
            pool,
            isolation: config.isolation,
        })
    }

    /// Number of worker threads
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn isolation(&self) -> IsolationMode {
        self.isolation
    }
}

impl ExecutionEngine for ExecutorEngine {
    fn execute<I, T, F>(&self, inputs: &[I], action: F) -> ExecutorResult<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> ExecutorResult<T> + Sync + Send,
    {
        let guarded = |input: &I| -> ExecutorResult<T> {
            catch_panic(|| action(input)).and_then(|result| result)
        };

        match self.isolation {
            IsolationMode::WaitForAll => {
                let results: Vec<ExecutorResult<T>> =
                    self.pool.install(|| inputs.par_iter().map(&guarded).collect());
                results.into_iter().collect()
            }
            IsolationMode::FailFast => {
                self.pool.install(|| inputs.par_iter().map(&guarded).collect())
            }
        }
    }
}

/// Run `f`, reporting a panic as `ExecutorError::Engine` instead of unwinding
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> ExecutorResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        ExecutorError::Engine(format!(
            "Execution panicked: {}",
            panic_message(payload.as_ref())
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
