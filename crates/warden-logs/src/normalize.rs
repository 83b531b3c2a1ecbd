//! Converts metadata that may carry captured errors into plain JSON.
//!
//! Traversal uses an explicit work stack so arbitrarily deep metadata never
//! grows the call stack. `LogValue` is an owned tree, so it cannot contain a
//! reference back to one of its ancestors.

use serde_json::{Map, Value};

use crate::value::LogValue;

enum Step {
    Visit(LogValue),
    CollectList(usize),
    CollectMap(Vec<String>),
}

/// Replaces every captured error with `{ message, name, stack }`, leaving all
/// other values untouched.
pub fn normalize(value: LogValue) -> Value {
    let mut steps = vec![Step::Visit(value)];
    let mut finished: Vec<Value> = Vec::new();

    while let Some(step) = steps.pop() {
        match step {
            Step::Visit(LogValue::Json(value)) => finished.push(value),
            Step::Visit(LogValue::Error(error)) => finished.push(error.into_json()),
            Step::Visit(LogValue::List(items)) => {
                steps.push(Step::CollectList(items.len()));
                steps.extend(items.into_iter().rev().map(Step::Visit));
            }
            Step::Visit(LogValue::Map(entries)) => {
                let (keys, values): (Vec<String>, Vec<LogValue>) = entries.into_iter().unzip();
                steps.push(Step::CollectMap(keys));
                steps.extend(values.into_iter().rev().map(Step::Visit));
            }
            Step::CollectList(len) => {
                let items = finished.split_off(finished.len().saturating_sub(len));
                finished.push(Value::Array(items));
            }
            Step::CollectMap(keys) => {
                let values = finished.split_off(finished.len().saturating_sub(keys.len()));
                let object: Map<String, Value> = keys.into_iter().zip(values).collect();
                finished.push(Value::Object(object));
            }
        }
    }

    finished.pop().unwrap_or(Value::Null)
}
