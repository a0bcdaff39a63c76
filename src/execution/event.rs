//! Execution lifecycle events
//!
//! Each unit execution publishes a `BeforeExecute` event and then the same
//! event again, mutated to `ExecuteSuccess` or `ExecuteFailure`. Subscribers
//! correlate the two publications through the event id.
//!
//! Publishing is fire-and-forget: `EventPublisher::publish` never blocks the
//! execution path and never fails it.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::unit::SqlExecutionUnit;
use super::SqlError;

/// Kind of the logical statement being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlType {
    /// True for query (DQL) statements
    pub fn is_query(self) -> bool {
        matches!(self, SqlType::Select)
    }

    pub fn category(self) -> EventCategory {
        if self.is_query() {
            EventCategory::Dql
        } else {
            EventCategory::Dml
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Select => "SELECT",
            SqlType::Insert => "INSERT",
            SqlType::Update => "UPDATE",
            SqlType::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Query events vs data-manipulation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    Dql,
    Dml,
}

/// Stage of a unit execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventExecutionType {
    BeforeExecute,
    ExecuteSuccess,
    ExecuteFailure,
}

/// One unit execution attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionEvent {
    id: Uuid,
    category: EventCategory,
    sql_type: SqlType,
    data_source: String,
    sql: String,
    parameters: Vec<serde_json::Value>,
    execution_type: EventExecutionType,
    failure: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExecutionEvent {
    /// New event in the `BeforeExecute` stage
    pub fn new(sql_type: SqlType, unit: &SqlExecutionUnit) -> Self {
        ExecutionEvent {
            id: Uuid::new_v4(),
            category: sql_type.category(),
            sql_type,
            data_source: unit.data_source.clone(),
            sql: unit.sql.clone(),
            parameters: unit.parameters.clone(),
            execution_type: EventExecutionType::BeforeExecute,
            failure: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[serde_json::Value] {
        &self.parameters
    }

    pub fn execution_type(&self) -> EventExecutionType {
        self.execution_type
    }

    /// Message of the failure recorded by `mark_failure`
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mark_success(&mut self) {
        self.execution_type = EventExecutionType::ExecuteSuccess;
    }

    pub fn mark_failure(&mut self, error: &SqlError) {
        self.execution_type = EventExecutionType::ExecuteFailure;
        self.failure = Some(error.to_string());
    }
}

/// Sink for lifecycle events
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &ExecutionEvent);
}

/// Publisher that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: &ExecutionEvent) {}
}

/// In-process event bus fanning events out to channel subscribers
///
/// Each publication sends a copy of the event to every live subscriber. The
/// subscriber list is locked only to take a snapshot; sends happen outside
/// the lock. Subscribers whose receiver has been dropped are pruned on the
/// next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<ExecutionEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Receiver<ExecutionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: &ExecutionEvent) {
        tracing::trace!(
            event_id = %event.id,
            data_source = %event.data_source,
            execution_type = ?event.execution_type,
            "execution_event"
        );
        let subscribers = self.subscribers.lock().clone();
        let disconnected: Vec<Sender<ExecutionEvent>> = subscribers
            .into_iter()
            .filter(|tx| matches!(tx.try_send(event.clone()), Err(TrySendError::Disconnected(_))))
            .collect();

        if !disconnected.is_empty() {
            self.subscribers
                .lock()
                .retain(|tx| !disconnected.iter().any(|dead| dead.same_channel(tx)));
        }
    }
}
