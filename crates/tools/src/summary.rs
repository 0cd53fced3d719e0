//! Model-facing summaries of tool payloads.
//!
//! The caller gets the full payload; the model gets only scalar fields
//! (counts, echoed query parameters) so prompt growth stays bounded no
//! matter how many rows a search returns.

use serde_json::{Map, Value};

/// Builds the token-economical view of a tool result.
#[derive(Debug, Clone, Copy)]
pub struct Summarizer {
    string_limit: usize,
}

impl Summarizer {
    pub fn new(string_limit: usize) -> Self {
        Self {
            string_limit: string_limit.max(1),
        }
    }

    /// Summarize a full payload.
    ///
    /// - object: scalars kept, strings truncated, each array field `k`
    ///   replaced by `k_count` unless the payload already has that key,
    ///   nested objects summarized recursively
    /// - array: `{"count": n}`
    /// - scalar: kept (strings truncated)
    ///
    /// The result never serializes larger than the input.
    pub fn summarize(&self, full: &Value) -> Value {
        let summary = match full {
            Value::Object(map) => Value::Object(self.summarize_object(map)),
            Value::Array(items) => serde_json::json!({ "count": items.len() }),
            Value::String(s) => Value::String(self.truncate(s)),
            other => other.clone(),
        };

        if serialized_len(&summary) > serialized_len(full) {
            full.clone()
        } else {
            summary
        }
    }

    fn summarize_object(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    let count_key = format!("{key}_count");
                    // A field already present in the payload wins.
                    if !map.contains_key(&count_key) {
                        out.insert(count_key, Value::from(items.len()));
                    }
                }
                Value::Object(inner) => {
                    out.insert(key.clone(), Value::Object(self.summarize_object(inner)));
                }
                Value::String(s) => {
                    out.insert(key.clone(), Value::String(self.truncate(s)));
                }
                scalar => {
                    out.insert(key.clone(), scalar.clone());
                }
            }
        }
        out
    }

    fn truncate(&self, s: &str) -> String {
        if s.chars().count() <= self.string_limit {
            return s.to_string();
        }
        let mut cut: String = s.chars().take(self.string_limit).collect();
        cut.push_str("...");
        cut
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new(500)
    }
}

fn serialized_len(value: &Value) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}
