//! Presence metadata: free-form JSON dictionaries describing this client
//! and the joined room. Only changed keys are ever transmitted.

use serde_json::Value;

pub type AttributeDict = serde_json::Map<String, Value>;

/// Fold `fresh` into `held` and return the entries that actually changed,
/// or `None` when the dictionaries already agree. Keys absent from
/// `fresh` are left alone; an explicit `Value::Null` clears a key.
pub fn update_and_diff(held: &mut AttributeDict, fresh: &AttributeDict) -> Option<AttributeDict> {
    let mut changed = AttributeDict::new();
    for (key, value) in fresh {
        if value.is_null() {
            if held.remove(key).is_some() {
                changed.insert(key.clone(), Value::Null);
            }
            continue;
        }
        if held.get(key) != Some(value) {
            held.insert(key.clone(), value.clone());
            changed.insert(key.clone(), value.clone());
        }
    }
    if changed.is_empty() {
        None
    } else {
        Some(changed)
    }
}
