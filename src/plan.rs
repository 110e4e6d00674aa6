//! Plan computation.
//!
//! The planned state is built attribute by attribute from the schema:
//!
//! - configured values are taken as proposed, except JSON strings that are
//!   semantically equal to the prior text, which keep the prior text;
//! - unset optional attributes get their schema default;
//! - computed attributes the config does not set keep their prior value.
//!
//! Every attribute whose planned value differs from the prior one is reported
//! as a change. A change to a `force_new` attribute of an existing object
//! requires replacement.

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};

fn present<'a>(state: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    state.and_then(|s| s.get(name)).filter(|v| !v.is_null())
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(a), Some(b)) => match (serde_json::from_str::<Value>(a), serde_json::from_str::<Value>(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

fn planned_value(attr: &Attribute, proposed: Option<&Value>, prior: Option<&Value>) -> Option<Value> {
    match proposed {
        Some(value) if attr.is_json() && prior.is_some_and(|p| json_equal(p, value)) => prior.cloned(),
        Some(value) => Some(value.clone()),
        None if attr.flags.computed => prior.cloned().or_else(|| attr.default.clone()),
        None => attr.default.clone(),
    }
}

/// Plan the transition from `prior` to `proposed` for a resource with `schema`.
///
/// `prior` is `None` on create. A `Null` `proposed` plans a destroy.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> Result<PlanResult, ProviderError> {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        let Some(prior) = prior else {
            return Ok(PlanResult::no_change(Value::Null));
        };
        let changes = prior
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
            .collect();
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    }

    if !proposed.is_object() {
        return Err(ProviderError::InvalidRequest(
            "proposed state must be an object".to_string(),
        ));
    }

    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.attributes {
        let before = present(prior, name);
        let after = planned_value(attr, present(Some(proposed), name), before);

        match (before, &after) {
            (None, Some(value)) => changes.push(AttributeChange::added(name.clone(), value.clone())),
            (Some(old), None) => changes.push(AttributeChange::removed(name.clone(), old.clone())),
            (Some(old), Some(new)) if old != new => {
                changes.push(AttributeChange::modified(name.clone(), old.clone(), new.clone()));
                requires_replace |= attr.force_new;
            }
            _ => {}
        }

        if let Some(value) = after {
            planned.insert(name.clone(), value);
        }
    }

    if changes.is_empty() {
        return Ok(PlanResult::no_change(Value::Object(planned)));
    }
    Ok(PlanResult::with_changes(Value::Object(planned), changes, requires_replace))
}
