//! State snapshots and typed field access
//!
//! A snapshot is a JSON object keyed by property name. `set_state`
//! implementations receive partial snapshots (a single property during a
//! model update), so absent keys must leave the field untouched.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Property name -> JSON value
pub type StateSnapshot = Map<String, Value>;

/// Positional action parameters
pub type Params = Vec<Value>;

/// Event payload
pub type Payload = Map<String, Value>;

/// Read `key` from a snapshot if present
///
/// Returns `Ok(None)` when the key is absent, and an error when it is present
/// with the wrong shape.
///
/// ```ignore
/// fn set_state(&mut self, state: &StateSnapshot) -> anyhow::Result<()> {
///     if let Some(count) = snapshot::field(state, "count")? {
///         self.count = count;
///     }
///     Ok(())
/// }
/// ```
pub fn field<T: DeserializeOwned>(state: &StateSnapshot, key: &str) -> Result<Option<T>> {
    state
        .get(key)
        .map(|value| {
            serde_json::from_value(value.clone())
                .with_context(|| format!("Invalid value for property '{}'", key))
        })
        .transpose()
}

/// Assign `key` into `target` when present in the snapshot
pub fn assign<T: DeserializeOwned>(state: &StateSnapshot, key: &str, target: &mut T) -> Result<()> {
    if let Some(value) = field(state, key)? {
        *target = value;
    }
    Ok(())
}

/// Positional parameter `index`, deserialized
pub fn param<T: DeserializeOwned>(params: &Params, index: usize) -> Result<T> {
    let value = params
        .get(index)
        .with_context(|| format!("Missing parameter #{}", index))?;
    serde_json::from_value(value.clone())
        .with_context(|| format!("Invalid parameter #{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_absent_is_none() {
        let state = StateSnapshot::new();
        assert_eq!(field::<i64>(&state, "count").unwrap(), None);
    }

    #[test]
    fn test_field_wrong_type_is_error() {
        let mut state = StateSnapshot::new();
        state.insert("count".to_string(), json!("three"));

        let err = field::<i64>(&state, "count").unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_assign_leaves_target_when_absent() {
        let mut count = 7;
        assign(&StateSnapshot::new(), "count", &mut count).unwrap();
        assert_eq!(count, 7);

        let mut state = StateSnapshot::new();
        state.insert("count".to_string(), json!(9));
        assign(&state, "count", &mut count).unwrap();
        assert_eq!(count, 9);
    }

    #[test]
    fn test_param_reads_positionally() {
        let params = vec![json!(5), json!("x")];
        assert_eq!(param::<i64>(&params, 0).unwrap(), 5);
        assert_eq!(param::<String>(&params, 1).unwrap(), "x");
        assert!(param::<i64>(&params, 2).is_err());
        assert!(param::<i64>(&params, 1).is_err());
    }
}
