//! Recursive merge of JSON override fragments.
//!
//! Merge rules: objects merge key-by-key, arrays merge element-by-element
//! (extra override elements are appended), anything else is replaced by
//! the override. `null` overrides nothing.

use serde_json::Value;

/// Deep-merge `fragment` onto `base`, returning the merged value.
/// Neither input is mutated.
pub fn deep_merge(base: &Value, fragment: &Value) -> Value {
    match (base, fragment) {
        (_, Value::Null) => base.clone(),
        (Value::Object(base_map), Value::Object(frag_map)) => {
            let mut result = base_map.clone();
            for (key, frag_value) in frag_map {
                let merged = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, frag_value),
                    None => frag_value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Object(result)
        }
        (Value::Array(base_items), Value::Array(frag_items)) => {
            let mut result = Vec::with_capacity(base_items.len().max(frag_items.len()));
            for i in 0..base_items.len().max(frag_items.len()) {
                match (base_items.get(i), frag_items.get(i)) {
                    (Some(base_item), Some(frag_item)) => {
                        result.push(deep_merge(base_item, frag_item));
                    }
                    (Some(base_item), None) => result.push(base_item.clone()),
                    (None, Some(frag_item)) => result.push(frag_item.clone()),
                    (None, None) => unreachable!(),
                }
            }
            Value::Array(result)
        }
        // scalar conflict or type mismatch: override wins
        (_, other) => other.clone(),
    }
}
