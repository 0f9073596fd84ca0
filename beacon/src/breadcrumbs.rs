//! Breadcrumb trails attached to notices.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::now_rfc3339;

/// Category assigned to breadcrumbs created without one.
const DEFAULT_CATEGORY: &str = "custom";

/// Replacement marker for metadata values that are not primitives.
const DEPTH_MARKER: &str = "[DEPTH]";

/// Maximum byte length of a metadata string value.
const MAX_VALUE_BYTES: usize = 64_000;

/// A fixed-capacity FIFO buffer that evicts the oldest entry when full.
///
/// A capacity of zero retains nothing.
#[derive(Clone, Debug)]
pub struct EvictingQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> EvictingQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Appends an item, evicting the oldest entry if the queue is over
    /// capacity.
    pub fn add(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// Iterates over the retained items in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns the retained items in insertion order, oldest first.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }

    /// Empties the queue without affecting its capacity.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the number of retained items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no items are retained.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A lightweight record of a recent application action.
///
/// Breadcrumbs carry flat, primitive-only metadata: nested values are
/// replaced by a marker and long strings are truncated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// Human readable description of the action.
    pub message: String,
    /// Grouping category, `"custom"` unless specified.
    pub category: String,
    /// Flat mapping of primitive values.
    pub metadata: Map<String, Value>,
    /// RFC 3339 timestamp of when the breadcrumb was recorded.
    pub timestamp: String,
}

impl Breadcrumb {
    /// Creates a breadcrumb, sanitizing its metadata.
    pub fn new(
        message: impl Into<String>,
        metadata: Map<String, Value>,
        category: Option<&str>,
    ) -> Self {
        Self {
            message: message.into(),
            category: category.unwrap_or(DEFAULT_CATEGORY).to_owned(),
            metadata: sanitize_metadata(metadata),
            timestamp: now_rfc3339(),
        }
    }
}

/// Restricts metadata to flat primitive values.
fn sanitize_metadata(metadata: Map<String, Value>) -> Map<String, Value> {
    metadata
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(truncate(s)),
                value @ (Value::Null | Value::Bool(_) | Value::Number(_)) => value,
                Value::Array(_) | Value::Object(_) => Value::String(DEPTH_MARKER.to_owned()),
            };
            (key, value)
        })
        .collect()
}

/// Truncates a string to [`MAX_VALUE_BYTES`], respecting char boundaries.
fn truncate(mut s: String) -> String {
    if s.len() > MAX_VALUE_BYTES {
        let mut end = MAX_VALUE_BYTES;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_eviction_keeps_newest() {
        let mut queue = EvictingQueue::new(3);
        for i in 0..7 {
            queue.add(i);
        }

        assert_eq!(queue.to_vec(), vec![4, 5, 6]);
    }

    #[test]
    fn test_insertion_order() {
        let mut queue = EvictingQueue::new(10);
        queue.add("a");
        queue.add("b");
        queue.add("c");

        assert_eq!(queue.to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut queue = EvictingQueue::new(0);
        queue.add(1);

        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut queue = EvictingQueue::new(3);
        queue.add(1);
        queue.clear();

        assert!(queue.is_empty());

        // Capacity is unaffected by clearing.
        for i in 0..5 {
            queue.add(i);
        }
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_default_category() {
        let crumb = Breadcrumb::new("checkout", Map::new(), None);
        assert_eq!(crumb.category, "custom");

        let crumb = Breadcrumb::new("query", Map::new(), Some("db"));
        assert_eq!(crumb.category, "db");
    }

    #[test]
    fn test_metadata_keeps_primitives() {
        let metadata = json!({
            "count": 3,
            "flag": true,
            "name": "checkout",
            "none": null,
        });

        let crumb = Breadcrumb::new("m", metadata.as_object().cloned().unwrap(), None);
        assert_eq!(serde_json::to_value(&crumb.metadata).unwrap(), metadata);
    }

    #[test]
    fn test_metadata_replaces_nested_values() {
        let metadata = json!({
            "list": [1, 2, 3],
            "nested": {"a": 1},
        });

        let crumb = Breadcrumb::new("m", metadata.as_object().cloned().unwrap(), None);
        assert_eq!(crumb.metadata["list"], json!(DEPTH_MARKER));
        assert_eq!(crumb.metadata["nested"], json!(DEPTH_MARKER));
    }

    #[test]
    fn test_metadata_truncates_long_strings() {
        let long = "x".repeat(MAX_VALUE_BYTES + 500);
        let metadata = json!({"long": long});

        let crumb = Breadcrumb::new("m", metadata.as_object().cloned().unwrap(), None);
        assert_eq!(
            crumb.metadata["long"].as_str().unwrap().len(),
            MAX_VALUE_BYTES
        );
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // A multi-byte char straddling the limit is dropped entirely.
        let mut s = "x".repeat(MAX_VALUE_BYTES - 1);
        s.push('é');
        s.push_str("tail");

        let truncated = truncate(s);
        assert_eq!(truncated.len(), MAX_VALUE_BYTES - 1);
        assert!(truncated.chars().all(|c| c == 'x'));
    }
}
