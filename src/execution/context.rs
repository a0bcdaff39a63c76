//! Per-call execution context
//!
//! Captured once on the calling thread and handed to every unit as an
//! argument. Workers only ever borrow it for the duration of the call.

use std::collections::HashMap;

/// Correlation data carried alongside a logical call
pub type DataMap = HashMap<String, serde_json::Value>;

/// Snapshot of the failure policy and correlation data for one logical call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    exception_thrown: bool,
    data_map: DataMap,
}

impl ExecutionContext {
    /// Copy the caller's state into a new snapshot
    pub fn capture(exception_thrown: bool, data_map: &DataMap) -> Self {
        ExecutionContext {
            exception_thrown,
            data_map: data_map.clone(),
        }
    }

    pub fn is_exception_thrown(&self) -> bool {
        self.exception_thrown
    }

    pub fn data_map(&self) -> &DataMap {
        &self.data_map
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data_map.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_copies_data_map() {
        let mut data = DataMap::new();
        data.insert("trace_id".to_string(), json!("abc"));

        let context = ExecutionContext::capture(false, &data);
        data.insert("trace_id".to_string(), json!("changed"));

        assert_eq!(context.get("trace_id"), Some(&json!("abc")));
        assert!(!context.is_exception_thrown());
    }

    #[test]
    fn test_default_context_is_empty() {
        let context = ExecutionContext::default();
        assert!(context.data_map().is_empty());
        assert!(context.get("missing").is_none());
    }
}
