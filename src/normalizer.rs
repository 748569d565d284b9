//! Keeps formatter-owned keys out of the top level of user context.
//!
//! User context becomes the top level of the emitted JSON object, so any key
//! the formatter writes itself (`message`, `level`, ...) must not be supplied
//! by the caller. Such values are moved under the nested `context` key
//! instead of being dropped.

use serde_json::{Map, Value};
use tracing::trace;

/// Key under which displaced and caller-nested context is collected.
pub const NESTED_KEY: &str = "context";

/// Move every reserved key of `context` into the nested `context` map.
///
/// Non-reserved keys keep their order. An existing `context` entry keeps its
/// position and has the displaced values merged into it (displaced values
/// win); otherwise a new `context` entry is appended, holding only the
/// displaced values (possibly none).
pub fn normalize(context: Map<String, Value>, reserved_keys: &[&str]) -> Map<String, Value> {
    let mut stash = Map::new();
    let mut existing_nested = None;
    let mut normalized = Map::with_capacity(context.len() + 1);

    for (key, value) in context {
        if reserved_keys.contains(&key.as_str()) {
            stash.insert(key, value);
        } else if key == NESTED_KEY {
            existing_nested = Some(value);
            // placeholder keeps the slot; filled in below
            normalized.insert(key, Value::Null);
        } else {
            normalized.insert(key, value);
        }
    }

    let mut displaced = Map::with_capacity(stash.len());
    for key in reserved_keys {
        if let Some(value) = stash.remove(*key) {
            displaced.insert((*key).to_string(), value);
        }
    }
    if !displaced.is_empty() {
        trace!(keys = ?displaced.keys().collect::<Vec<_>>(), "displacing reserved context keys");
    }

    let nested = match existing_nested {
        Some(existing) => {
            let mut nested = coerce_to_map(existing);
            for (key, value) in displaced {
                nested.insert(key, value);
            }
            nested
        }
        None => displaced,
    };

    normalized.insert(NESTED_KEY.to_string(), Value::Object(nested));
    normalized
}

/// Turn any value into a map so it can take merged keys.
///
/// Objects pass through, `null` becomes empty, arrays are keyed by index and
/// any other scalar becomes the single entry `"0"`.
pub fn coerce_to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        Value::Array(items) => {
            trace!(len = items.len(), "coercing nested context array into a map");
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect()
        }
        scalar => {
            trace!("coercing scalar nested context into a map");
            let mut map = Map::with_capacity(1);
            map.insert("0".to_string(), scalar);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const RESERVED: &[&str] = &["application", "category", "level", "message"];

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn keys(map: &Map<String, Value>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn reserved_keys_are_moved_under_context() {
        let out = normalize(
            map(json!({ "user": 7, "message": "hijack", "level": 1 })),
            RESERVED,
        );
        assert_eq!(keys(&out), vec!["user", "context"]);
        assert_eq!(out["context"], json!({ "level": 1, "message": "hijack" }));
        let nested = out["context"].as_object().unwrap();
        // reserved key order, not input order
        assert_eq!(keys(nested), vec!["level", "message"]);
    }

    #[test]
    fn displaced_value_wins_over_existing_nested_value() {
        let out = normalize(
            map(json!({ "context": { "category": "x", "keep": true }, "category": "y" })),
            RESERVED,
        );
        assert_eq!(out["context"], json!({ "category": "y", "keep": true }));
    }

    #[test]
    fn existing_context_keeps_its_position() {
        let out = normalize(map(json!({ "a": 1, "context": {}, "b": 2 })), RESERVED);
        assert_eq!(keys(&out), vec!["a", "context", "b"]);
    }

    #[test]
    fn empty_reserved_set_only_adds_context() {
        let out = normalize(map(json!({ "message": "m" })), &[]);
        assert_eq!(out, map(json!({ "message": "m", "context": {} })));
    }

    #[test]
    fn scalar_nested_context_is_coerced() {
        let out = normalize(map(json!({ "context": "raw", "level": 3 })), RESERVED);
        assert_eq!(out["context"], json!({ "0": "raw", "level": 3 }));
    }

    #[test]
    fn coerce_covers_every_shape() {
        assert_eq!(coerce_to_map(Value::Null), Map::new());
        assert_eq!(coerce_to_map(json!(false)), map(json!({ "0": false })));
        assert_eq!(coerce_to_map(json!(["a", "b"])), map(json!({ "0": "a", "1": "b" })));
        assert_eq!(coerce_to_map(json!({ "k": 1 })), map(json!({ "k": 1 })));
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = normalize(map(json!({ "a": 1, "message": "m" })), RESERVED);
        let twice = normalize(once.clone(), RESERVED);
        assert_eq!(once, twice);
    }
}
