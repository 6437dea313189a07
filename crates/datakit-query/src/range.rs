//! Value ranges used by range filters and bucketing aggregations.

use serde::Serialize;
use serde_json::{Map, Value};

/// A half-open or closed range, serialized as `{"from"?, "to"?}`.
///
/// # Example
///
/// ```
/// use datakit_query::Range;
/// use serde_json::json;
///
/// assert_eq!(serde_json::to_value(Range::between(1, 5)).unwrap(), json!({"from": 1, "to": 5}));
/// assert_eq!(serde_json::to_value(Range::up_to(5)).unwrap(), json!({"to": 5}));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<Value>,
}

impl Range {
    /// Range with only a lower bound.
    pub fn starting_at(from: impl Into<Value>) -> Self {
        Range {
            from: Some(from.into()),
            to: None,
        }
    }

    /// Range with only an upper bound.
    pub fn up_to(to: impl Into<Value>) -> Self {
        Range {
            from: None,
            to: Some(to.into()),
        }
    }

    /// Range with both bounds.
    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Range {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    /// Returns the lower bound.
    pub fn from_value(&self) -> Option<&Value> {
        self.from.as_ref()
    }

    /// Returns the upper bound.
    pub fn to_value(&self) -> Option<&Value> {
        self.to.as_ref()
    }

    pub(crate) fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(from) = &self.from {
            map.insert("from".to_string(), from.clone());
        }
        if let Some(to) = &self.to {
            map.insert("to".to_string(), to.clone());
        }
        map
    }
}

impl From<Range> for Value {
    fn from(range: Range) -> Self {
        Value::Object(range.to_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bounds() {
        let range = Range::between(0, 10);
        assert_eq!(range.from_value(), Some(&json!(0)));
        assert_eq!(range.to_value(), Some(&json!(10)));

        assert_eq!(Range::starting_at("2020-01-01").to_value(), None);
        assert!(Range::default().to_map().is_empty());
    }

    #[test]
    fn json_matches_serialize() {
        let range = Range::starting_at(2.5);
        assert_eq!(Value::from(range.clone()), serde_json::to_value(&range).unwrap());
        assert_eq!(Value::from(range), json!({"from": 2.5}));
    }
}
