//! JSON output formatting

use serde::Serialize;

/// Pretty JSON; serialization failures become an error object
pub fn format<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize output: {}"}}"#, e))
}
