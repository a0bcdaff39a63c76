//! Statement Executor
//!
//! Executes the physical statements of one logical statement and merges the
//! per-unit results:
//!
//! | call | merge |
//! |------|-------|
//! | `execute_query` | per-unit outcomes in unit order |
//! | `execute_update*` | sum of affected rows |
//! | `execute*` | first unit's flag |
//!
//! One unit runs inline on the calling thread. Two or more units are handed to
//! the `ExecutionEngine`, and each worker holds the unit's connection lock
//! around the statement call so units sharing a connection never interleave.
//! Both paths publish the same lifecycle events and apply the same failure
//! policy. A panicking statement publishes `ExecuteFailure` and fails the call
//! with `ExecutorError::Engine` on either path.

use std::sync::Arc;

use super::context::{DataMap, ExecutionContext};
use super::engine::{catch_panic, ExecutionEngine};
use super::event::{EventPublisher, ExecutionEvent, SqlType};
use super::exception::ExceptionPolicy;
use super::metrics::ExecutionMetrics;
use super::outcome::{Merged, SuppressedFailure, UnitOutcome};
use super::unit::{
    AutoGeneratedKeys, ExecuteOption, ShardStatement, SqlExecutionUnit, StatementUnit,
};
use super::{ExecutorResult, SqlError};

const EXECUTE_QUERY_TIMER: &str = "ShardingStatement-executeQuery";
const EXECUTE_UPDATE_TIMER: &str = "ShardingStatement-executeUpdate";
const EXECUTE_TIMER: &str = "ShardingStatement-execute";

/// Executor for the units of one logical statement
pub struct StatementExecutor<'a, E, S> {
    engine: &'a E,
    sql_type: SqlType,
    units: &'a [StatementUnit<S>],
    events: Arc<dyn EventPublisher>,
    exception_policy: Arc<dyn ExceptionPolicy>,
    metrics: Option<Arc<ExecutionMetrics>>,
    data_map: DataMap,
}

impl<'a, E, S> StatementExecutor<'a, E, S>
where
    E: ExecutionEngine,
    S: ShardStatement,
{
    pub fn new(
        engine: &'a E,
        sql_type: SqlType,
        units: &'a [StatementUnit<S>],
        events: Arc<dyn EventPublisher>,
        exception_policy: Arc<dyn ExceptionPolicy>,
    ) -> Self {
        StatementExecutor {
            engine,
            sql_type,
            units,
            events,
            exception_policy,
            metrics: None,
            data_map: DataMap::new(),
        }
    }

    /// Correlation data handed to every unit of every call
    pub fn with_data_map(mut self, data_map: DataMap) -> Self {
        self.data_map = data_map;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ExecutionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn units(&self) -> &[StatementUnit<S>] {
        self.units
    }

    /// Run every unit as a query.
    ///
    /// Result sets are returned unmerged, one per unit in unit order.
    pub fn execute_query(&self) -> ExecutorResult<Vec<UnitOutcome<S::ResultSet>>> {
        self.run(EXECUTE_QUERY_TIMER, |statement, unit, context| {
            statement.execute_query(unit, context)
        })
    }

    /// Run every unit as an update and sum the affected rows
    pub fn execute_update(&self) -> ExecutorResult<Merged<u64>> {
        self.execute_update_with(ExecuteOption::Plain)
    }

    pub fn execute_update_with_generated_keys(
        &self,
        keys: AutoGeneratedKeys,
    ) -> ExecutorResult<Merged<u64>> {
        self.execute_update_with(ExecuteOption::GeneratedKeys(keys))
    }

    pub fn execute_update_with_column_indexes(
        &self,
        column_indexes: &[usize],
    ) -> ExecutorResult<Merged<u64>> {
        self.execute_update_with(ExecuteOption::ColumnIndexes(column_indexes.to_vec()))
    }

    pub fn execute_update_with_column_names(
        &self,
        column_names: &[String],
    ) -> ExecutorResult<Merged<u64>> {
        self.execute_update_with(ExecuteOption::ColumnNames(column_names.to_vec()))
    }

    pub fn execute_update_with(&self, option: ExecuteOption) -> ExecutorResult<Merged<u64>> {
        let outcomes = self.run(EXECUTE_UPDATE_TIMER, |statement, unit, context| {
            statement.execute_update(unit, &option, context)
        })?;
        Ok(Merged::sum(outcomes))
    }

    /// Run every unit as a generic execute.
    ///
    /// The merged flag is the first unit's: true when it produced a result set.
    pub fn execute(&self) -> ExecutorResult<Merged<bool>> {
        self.execute_with(ExecuteOption::Plain)
    }

    pub fn execute_with_generated_keys(
        &self,
        keys: AutoGeneratedKeys,
    ) -> ExecutorResult<Merged<bool>> {
        self.execute_with(ExecuteOption::GeneratedKeys(keys))
    }

    pub fn execute_with_column_indexes(
        &self,
        column_indexes: &[usize],
    ) -> ExecutorResult<Merged<bool>> {
        self.execute_with(ExecuteOption::ColumnIndexes(column_indexes.to_vec()))
    }

    pub fn execute_with_column_names(
        &self,
        column_names: &[String],
    ) -> ExecutorResult<Merged<bool>> {
        self.execute_with(ExecuteOption::ColumnNames(column_names.to_vec()))
    }

    pub fn execute_with(&self, option: ExecuteOption) -> ExecutorResult<Merged<bool>> {
        let outcomes = self.run(EXECUTE_TIMER, |statement, unit, context| {
            statement.execute(unit, &option, context)
        })?;
        Ok(Merged::first(outcomes))
    }

    /// Dispatch `invoke` over all units: inline for one unit, through the
    /// engine otherwise
    fn run<T, F>(&self, timer: &'static str, invoke: F) -> ExecutorResult<Vec<UnitOutcome<T>>>
    where
        T: Send,
        F: Fn(&S, &SqlExecutionUnit, &ExecutionContext) -> Result<T, SqlError> + Sync + Send,
    {
        let _timer = self.metrics.as_ref().map(|metrics| metrics.start(timer));
        let context =
            ExecutionContext::capture(self.exception_policy.is_exception_thrown(), &self.data_map);

        if let [unit] = self.units {
            tracing::debug!(sql_type = %self.sql_type, data_source = %unit.sql_unit.data_source, "execute_inline");
            return Ok(vec![self.execute_unit(0, unit, &context, false, &invoke)?]);
        }

        tracing::debug!(sql_type = %self.sql_type, units = self.units.len(), "execute_parallel");
        let indexed: Vec<(usize, &StatementUnit<S>)> = self.units.iter().enumerate().collect();
        self.engine.execute(&indexed, |&(index, unit)| {
            self.execute_unit(index, unit, &context, true, &invoke)
        })
    }

    /// Execute one unit: publish the before event, call the statement, then
    /// publish the outcome and apply the failure policy
    fn execute_unit<T, F>(
        &self,
        index: usize,
        unit: &StatementUnit<S>,
        context: &ExecutionContext,
        serialize: bool,
        invoke: &F,
    ) -> ExecutorResult<UnitOutcome<T>>
    where
        F: Fn(&S, &SqlExecutionUnit, &ExecutionContext) -> Result<T, SqlError>,
    {
        let mut event = ExecutionEvent::new(self.sql_type, &unit.sql_unit);
        self.events.publish(&event);

        let result = {
            let _connection = serialize.then(|| unit.statement.connection().lock());
            catch_panic(|| invoke(&unit.statement, &unit.sql_unit, context))
        };

        let result = match result {
            Ok(result) => result,
            // Panics bypass the exception policy
            Err(panicked) => {
                event.mark_failure(&SqlError::new(panicked.to_string()));
                self.events.publish(&event);
                return Err(panicked);
            }
        };

        match result {
            Ok(value) => {
                event.mark_success();
                self.events.publish(&event);
                Ok(UnitOutcome::Completed(value))
            }
            Err(error) => {
                event.mark_failure(&error);
                self.events.publish(&event);
                let error =
                    self.exception_policy
                        .handle(context.is_exception_thrown(), &event, error)?;
                Ok(UnitOutcome::Suppressed(SuppressedFailure {
                    index,
                    data_source: unit.sql_unit.data_source.clone(),
                    sql: unit.sql_unit.sql.clone(),
                    error,
                }))
            }
        }
    }
}
