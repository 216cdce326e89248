//! In-process control-plane table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::ControlPlane;

#[derive(Debug, Clone, Copy, PartialEq)]
enum TableValue {
    F64(f64),
    Bool(bool),
}

/// A [`ControlPlane`] backed by a shared in-process map.
///
/// Clones share the same underlying table, so one handle can sit in the
/// frame loop while another plays the operator. A write replaces whatever
/// was under the key, including a value of the other type.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    entries: Arc<RwLock<HashMap<String, TableValue>>>,
}

impl MemoryTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, key: &str) -> Option<TableValue> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).copied()
    }

    fn write(&self, key: &str, value: TableValue) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
    }
}

impl ControlPlane for MemoryTable {
    fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.read(key) {
            Some(TableValue::F64(value)) => value,
            _ => default,
        }
    }

    fn set_f64(&self, key: &str, value: f64) {
        self.write(key, TableValue::F64(value));
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.read(key) {
            Some(TableValue::Bool(value)) => value,
            _ => default,
        }
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.write(key, TableValue::Bool(value));
    }

    fn contains_key(&self, key: &str) -> bool {
        self.read(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_keys_fall_back_to_defaults() {
        let table = MemoryTable::new();
        assert_eq!(table.get_f64("missing", -1.0), -1.0);
        assert!(table.get_bool("missing", true));
        assert!(!table.contains_key("missing"));
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let table = MemoryTable::new();
        table.set_f64("distance", 42.5);
        table.set_bool("enable", true);
        assert_eq!(table.get_f64("distance", 0.0), 42.5);
        assert!(table.get_bool("enable", false));
        assert!(table.contains_key("distance"));
    }

    #[test]
    fn test_clones_share_the_same_entries() {
        let table = MemoryTable::new();
        let operator = table.clone();
        operator.set_f64("distance", 96.0);
        assert_eq!(table.get_f64("distance", 0.0), 96.0);
    }

    #[test]
    fn test_mismatched_type_reads_as_absent() {
        let table = MemoryTable::new();
        table.set_bool("distance", true);
        assert_eq!(table.get_f64("distance", -1.0), -1.0);
        assert!(table.contains_key("distance"));
    }
}
