//! Single filter conditions.
//!
//! An [`OperatorValue`] is one `(field, operator, value)` triple, the leaf
//! of every filter tree.

use serde_json::{Map, Value};

use crate::body::{KeyedBody, ToBody};
use crate::error::Result;
use crate::op::Op;

/// A single filter condition.
///
/// The operator defaults to `=`. Instances are immutable once constructed.
///
/// # Example
///
/// ```
/// use datakit_query::{Op, OperatorValue, ToBody};
/// use serde_json::json;
///
/// let condition = OperatorValue::new("year", 1999);
/// assert_eq!(condition.operator(), &Op::Eq);
/// assert_eq!(
///     condition.body_value().unwrap(),
///     json!({"year": {"operator": "=", "value": 1999}})
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorValue {
    field: String,
    operator: Op,
    value: Option<Value>,
}

impl OperatorValue {
    /// Creates an equality condition.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_operator(field, Op::Eq, value)
    }

    /// Creates a condition with an explicit operator.
    pub fn with_operator(
        field: impl Into<String>,
        operator: impl Into<Op>,
        value: impl Into<Value>,
    ) -> Self {
        OperatorValue {
            field: field.into(),
            operator: operator.into(),
            value: Some(value.into()),
        }
    }

    /// Creates a condition that carries no value, such as `exists`.
    pub fn without_value(field: impl Into<String>, operator: impl Into<Op>) -> Self {
        OperatorValue {
            field: field.into(),
            operator: operator.into(),
            value: None,
        }
    }

    /// Returns the target field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the operator.
    pub fn operator(&self) -> &Op {
        &self.operator
    }

    /// Returns the compared value, if the operator takes one.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub(crate) fn payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("operator".to_string(), Value::from(self.operator.as_str()));
        if let Some(value) = &self.value {
            payload.insert("value".to_string(), value.clone());
        }
        Value::Object(payload)
    }
}

impl ToBody for OperatorValue {
    fn body(&self) -> Result<KeyedBody> {
        KeyedBody::new(&self.field, self.payload())
    }
}
