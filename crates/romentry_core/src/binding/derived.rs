//! Weight-normalized value computation.
//!
//! # Responsibility
//! - Compute the value of a derived (`...Norm`) control from its raw sibling
//!   and the body weight.
//!
//! # Invariants
//! - `NoValue` on either input yields `NoValue`.
//! - Zero body weight yields `NoValue`; division never fails.

use crate::binding::registry::{ControlBinding, Registry};
use crate::model::value::{Record, Value};

static MISSING: Value = Value::NoValue;

/// Normalizes `raw` by `weight`.
pub fn normalize(raw: &Value, weight: &Value) -> Value {
    match (raw, weight) {
        (Value::Number(raw), Value::Number(weight)) if *weight != 0.0 => {
            Value::Number(raw / weight)
        }
        _ => Value::NoValue,
    }
}

/// Recomputes one derived control from the dependency values in `record`.
///
/// Returns `None` for controls that are not derived.
pub fn recompute(control: &ControlBinding, registry: &Registry, record: &Record) -> Option<Value> {
    let from = control.derived_from.as_ref()?;
    let raw = dependency_value(registry, record, &from.raw);
    let weight = dependency_value(registry, record, &from.weight);
    Some(normalize(raw, weight))
}

fn dependency_value<'r>(registry: &Registry, record: &'r Record, control_id: &str) -> &'r Value {
    registry
        .get(control_id)
        .and_then(|control| record.get(&control.variable_name))
        .unwrap_or(&MISSING)
}
