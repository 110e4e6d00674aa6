//! Adapters between the dynamic attribute store and typed API structs.
//!
//! Every accessor returns `Ok(None)` for an absent or null attribute so that
//! "unset" stays distinguishable from a zero value. A present value of the
//! wrong dynamic type means the schema and the handler disagree; that is
//! reported as [`ProviderError::Sdk`] rather than blamed on the user.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::state::ResourceData;

/// Read an attribute as `T`.
pub fn get_p<T: DeserializeOwned>(data: &ResourceData, key: &str) -> Result<Option<T>, ProviderError> {
    match data.get(key) {
        None => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            ProviderError::Sdk(format!("attribute '{}' has unexpected type: {}", key, e))
        }),
    }
}

/// Read a required attribute as `T`.
pub fn get_required<T: DeserializeOwned>(data: &ResourceData, key: &str) -> Result<T, ProviderError> {
    get_p(data, key)?
        .ok_or_else(|| ProviderError::Validation(format!("attribute '{}' must be set", key)))
}

/// Read an integer attribute narrowed to 64 bits.
pub fn get_int64(data: &ResourceData, key: &str) -> Result<Option<i64>, ProviderError> {
    get_p::<i64>(data, key)
}

/// Read an integer attribute narrowed to the 32 bits most API fields use.
pub fn get_int32(data: &ResourceData, key: &str) -> Result<Option<i32>, ProviderError> {
    match get_int64(data, key)? {
        None => Ok(None),
        Some(v) => i32::try_from(v).map(Some).map_err(|_| {
            ProviderError::Validation(format!("attribute '{}' is out of range: {}", key, v))
        }),
    }
}

/// Decode a JSON-encoded string attribute into `T`.
///
/// An empty string counts as unset.
pub fn get_json<T: DeserializeOwned>(data: &ResourceData, key: &str) -> Result<Option<T>, ProviderError> {
    let raw = match get_p::<String>(data, key)? {
        None => return Ok(None),
        Some(s) if s.trim().is_empty() => return Ok(None),
        Some(s) => s,
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| ProviderError::Validation(format!("attribute '{}' is not valid JSON: {}", key, e)))
}

/// Convert a list attribute into a typed vector. An absent list is empty.
pub fn cast_slice<T: DeserializeOwned>(data: &ResourceData, key: &str) -> Result<Vec<T>, ProviderError> {
    let items = match data.get(key) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ProviderError::Sdk(format!(
                "attribute '{}' is not a list: {}",
                key, other
            )))
        },
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item.clone()).map_err(|e| {
                ProviderError::Sdk(format!("attribute '{}.{}' has unexpected type: {}", key, i, e))
            })
        })
        .collect()
}

/// Convert a list of integers into `i32` values.
pub fn cast_slice_int32(data: &ResourceData, key: &str) -> Result<Vec<i32>, ProviderError> {
    cast_slice::<i64>(data, key)?
        .into_iter()
        .map(|v| {
            i32::try_from(v).map_err(|_| {
                ProviderError::Validation(format!("attribute '{}' contains out of range value {}", key, v))
            })
        })
        .collect()
}

/// Write any serializable value into the store. `None` stores null.
pub fn set_wrapper<T: Serialize>(data: &mut ResourceData, key: &str, value: T) -> Result<(), ProviderError> {
    let value = serde_json::to_value(value)?;
    data.set(key, value);
    Ok(())
}

/// Write a value as a JSON-encoded string.
///
/// The locally stored string is kept when it decodes to the same document, so
/// reformatting or key order never shows up as drift.
pub fn set_json<T: Serialize>(data: &mut ResourceData, key: &str, value: &T) -> Result<(), ProviderError> {
    let remote = serde_json::to_value(value)?;
    let local = data
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| serde_json::from_str::<Value>(s).ok());
    if local.as_ref() == Some(&remote) {
        return Ok(());
    }
    data.set(key, Value::String(serde_json::to_string(&remote)?));
    Ok(())
}

/// Render each element with its `Display` implementation.
pub fn slice_to_string<T: Display>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Merge a locally configured list with the list observed remotely.
///
/// Returns `local` when both hold the same elements with the same
/// multiplicities in any order, otherwise `remote`. The API does not keep
/// unordered collections in a stable order, and list diffs are order
/// sensitive.
pub fn list_consistent_merge<T: Eq + Hash + Clone>(local: &[T], remote: &[T]) -> Vec<T> {
    if same_multiset(local, remote) {
        local.to_vec()
    } else {
        remote.to_vec()
    }
}

fn same_multiset<T: Eq + Hash>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&T, isize> = HashMap::with_capacity(a.len());
    for item in a {
        *counts.entry(item).or_default() += 1;
    }
    for item in b {
        match counts.get_mut(item) {
            Some(c) if *c > 0 => *c -= 1,
            _ => return false,
        }
    }
    true
}
