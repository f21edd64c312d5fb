//! Named reduce functions used by pivot to combine duplicate cells.

use std::fmt;

use crate::data::Value;
use crate::error::DatacastError;
use crate::Result;

/// Combines the values that landed in one pivot cell.
pub type ReduceFn = fn(&[Value]) -> Value;

/// Lookup table from aggregation name to reduce function.
///
/// Starts with `sum`, `mean`, `first` and `last`; deployments can register
/// more (or override the built-ins) before handing the table to a
/// [`Transformer`](super::Transformer).
#[derive(Clone)]
pub struct AggregationTable {
    functions: Vec<(String, ReduceFn)>,
}

impl Default for AggregationTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for AggregationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.functions.iter().map(|(name, _)| name))
            .finish()
    }
}

impl AggregationTable {
    /// A table with no functions.
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    /// A table holding `sum`, `mean`, `first` and `last`.
    pub fn with_builtins() -> Self {
        Self::empty()
            .register("sum", sum)
            .register("mean", mean)
            .register("first", first)
            .register("last", last)
    }

    /// Builder: add or replace a function.
    pub fn register(mut self, name: impl Into<String>, f: ReduceFn) -> Self {
        let name = name.into();
        match self.functions.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = f,
            None => self.functions.push((name, f)),
        }
        self
    }

    /// Look up a function by name.
    pub fn get(&self, name: &str) -> Result<ReduceFn> {
        self.functions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| *f)
            .ok_or_else(|| DatacastError::UnknownAggregation(name.to_string()))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(n, _)| n.as_str())
    }
}

/// Numeric values, or `None` if a present value is not numeric.
fn numbers(values: &[Value]) -> Option<Vec<f64>> {
    values
        .iter()
        .filter(|v| !v.is_missing())
        .map(Value::as_f64)
        .collect()
}

/// Sum of the present values. Integers stay integers. Non-numeric input
/// or no present values yields the missing-marker.
pub fn sum(values: &[Value]) -> Value {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_missing()).collect();
    if present.is_empty() {
        return Value::Missing;
    }
    // None on a non-integer or on overflow; both fall through to floats.
    let integral = present.iter().try_fold(0i64, |acc, v| match v {
        Value::Integer(i) => acc.checked_add(*i),
        _ => None,
    });
    if let Some(total) = integral {
        return Value::Integer(total);
    }
    match numbers(values) {
        Some(nums) => Value::Float(nums.iter().sum()),
        None => Value::Missing,
    }
}

/// Arithmetic mean of the present values.
pub fn mean(values: &[Value]) -> Value {
    match numbers(values) {
        Some(nums) if !nums.is_empty() => Value::Float(nums.iter().sum::<f64>() / nums.len() as f64),
        _ => Value::Missing,
    }
}

/// First present value.
pub fn first(values: &[Value]) -> Value {
    values
        .iter()
        .find(|v| !v.is_missing())
        .cloned()
        .unwrap_or_default()
}

/// Last present value.
pub fn last(values: &[Value]) -> Value {
    values
        .iter()
        .rev()
        .find(|v| !v.is_missing())
        .cloned()
        .unwrap_or_default()
}
