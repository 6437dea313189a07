//! Filter trees.
//!
//! A [`Filter`] is a predicate node that serializes to exactly one
//! [`KeyedBody`]. Leaves are [`OperatorValue`] conditions; negation,
//! `and`/`or` groups and named composite filters wrap or extend them.
//!
//! ```text
//! Condition  {field: {"operator": op, "value": v}}
//! Not        {"not": <inner keyed body>}
//! Group      {"and"|"or": [<keyed body>, ...]}
//! Named      {field: {"operator": name, "value": {...}}}
//! ```

use serde_json::{Map, Value};

use crate::body::{KeyedBody, ToBody};
use crate::error::{QueryError, Result};
use crate::geo::{Point, Shape};
use crate::op::Op;
use crate::operator_value::OperatorValue;
use crate::range::Range;

/// Connective joining the members of a filter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    /// Every member must match.
    And,
    /// At least one member must match.
    Or,
}

impl Connective {
    /// Returns the wire name of this connective.
    pub fn as_str(self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

impl std::fmt::Display for Connective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A composable filter predicate.
///
/// # Example
///
/// ```
/// use datakit_query::{Filter, ToBody};
/// use serde_json::json;
///
/// let filter = Filter::gte("year", 1990).and(Filter::not_field("genre", "horror"));
///
/// assert_eq!(
///     filter.body_value().unwrap(),
///     json!({"and": [
///         {"year": {"operator": ">=", "value": 1990}},
///         {"not": {"genre": {"operator": "=", "value": "horror"}}}
///     ]})
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A single `(field, operator, value)` condition.
    Condition(OperatorValue),
    /// Negation of exactly one filter.
    Not(Box<Filter>),
    /// Filters joined by a connective, in insertion order.
    Group {
        connective: Connective,
        filters: Vec<Filter>,
    },
    /// A composite filter whose value is a structured map.
    Named(NamedFilter),
}

impl Filter {
    // ========================================================================
    // Leaf conditions
    // ========================================================================

    /// Equality condition on a field.
    pub fn field(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::Condition(OperatorValue::new(field, value))
    }

    /// Condition with an explicit operator.
    pub fn field_op(
        field: impl Into<String>,
        operator: impl Into<Op>,
        value: impl Into<Value>,
    ) -> Filter {
        Filter::Condition(OperatorValue::with_operator(field, operator, value))
    }

    /// Field equals `value`.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::field_op(field, Op::Eq, value)
    }

    /// Field differs from `value`.
    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::field_op(field, Op::Ne, value)
    }

    /// Field greater than `value`.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::field_op(field, Op::Gt, value)
    }

    /// Field greater than or equal to `value`.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::field_op(field, Op::Gte, value)
    }

    /// Field less than `value`.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::field_op(field, Op::Lt, value)
    }

    /// Field less than or equal to `value`.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::field_op(field, Op::Lte, value)
    }

    /// Regular expression condition (`~`).
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Filter {
        Filter::field_op(field, Op::Regex, pattern.into())
    }

    /// Field value is one of `values`.
    pub fn any<I, V>(field: impl Into<String>, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::field_op(field, Op::Any, collect_values(values))
    }

    /// Field value is none of `values`.
    pub fn none<I, V>(field: impl Into<String>, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::field_op(field, Op::None, collect_values(values))
    }

    /// Field is present. Serialized without a `value` key.
    pub fn exists(field: impl Into<String>) -> Filter {
        Filter::Condition(OperatorValue::without_value(field, Op::Exists))
    }

    /// Field is absent. Serialized without a `value` key.
    pub fn missing(field: impl Into<String>) -> Filter {
        Filter::Condition(OperatorValue::without_value(field, Op::Missing))
    }

    // ========================================================================
    // Text search
    // ========================================================================

    /// Full-text match on a field.
    pub fn matching(field: impl Into<String>, query: impl Into<String>) -> Filter {
        Filter::field_op(field, Op::Match, query.into())
    }

    /// Full-text match on every field (`*`).
    pub fn match_all(query: impl Into<String>) -> Filter {
        Filter::matching("*", query)
    }

    /// Exact phrase match on a field.
    pub fn phrase(field: impl Into<String>, query: impl Into<String>) -> Filter {
        Filter::field_op(field, Op::Phrase, query.into())
    }

    /// Field starts with `query`.
    pub fn prefix(field: impl Into<String>, query: impl Into<String>) -> Filter {
        Filter::field_op(field, Op::Prefix, query.into())
    }

    /// Fuzzy match with the server's default fuzziness.
    pub fn fuzzy(field: impl Into<String>, query: impl Into<String>) -> Filter {
        Filter::Named(NamedFilter::new(field, Op::Fuzzy).set("query", query.into()))
    }

    /// Fuzzy match with an explicit fuzziness.
    pub fn fuzzy_with(
        field: impl Into<String>,
        query: impl Into<String>,
        fuzziness: impl Into<Value>,
    ) -> Filter {
        Filter::Named(
            NamedFilter::new(field, Op::Fuzzy)
                .set("query", query.into())
                .set("fuzziness", fuzziness),
        )
    }

    /// "More like this" filter. See [`SimilarFilter`] for the tuning setters.
    pub fn similar(field: impl Into<String>, query: impl Into<String>) -> SimilarFilter {
        SimilarFilter::new(field, query)
    }

    // ========================================================================
    // Structured values
    // ========================================================================

    /// Field value within `range`.
    pub fn range(field: impl Into<String>, range: Range) -> Filter {
        Filter::Named(NamedFilter::with_value(field, Op::Range, range.to_map()))
    }

    /// Field within `max` distance (e.g. `"10km"`) of `location`.
    pub fn distance(
        field: impl Into<String>,
        location: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Filter {
        Filter::Named(
            NamedFilter::new(field, Op::GeoDistance)
                .set("location", location)
                .set("max", max),
        )
    }

    /// Field distance from `location` within `range`; bounds become `min`/`max`.
    pub fn distance_range(
        field: impl Into<String>,
        location: impl Into<Value>,
        range: Range,
    ) -> Filter {
        let mut named = NamedFilter::new(field, Op::GeoDistance).set("location", location);
        if let Some(from) = range.from_value() {
            named = named.set("min", from.clone());
        }
        if let Some(to) = range.to_value() {
            named = named.set("max", to.clone());
        }
        Filter::Named(named)
    }

    /// Field inside the polygon described by `points`.
    pub fn polygon(field: impl Into<String>, points: impl IntoIterator<Item = Point>) -> Filter {
        Filter::field_op(field, Op::GeoPolygon, collect_values(points))
    }

    /// Field intersecting any of `shapes`.
    pub fn shape(field: impl Into<String>, shapes: impl IntoIterator<Item = Shape>) -> Filter {
        Filter::Named(
            NamedFilter::new(field, Op::GeoShape)
                .set("type", "geometrycollection")
                .set("geometries", collect_values(shapes)),
        )
    }

    // ========================================================================
    // Negation
    // ========================================================================

    /// Negates a filter.
    pub fn not(filter: impl Into<Filter>) -> Filter {
        Filter::Not(Box::new(filter.into()))
    }

    /// Negates an optional filter.
    ///
    /// Returns [`QueryError::MissingFilter`] when there is nothing to negate.
    pub fn try_not(filter: Option<Filter>) -> Result<Filter> {
        filter.map(Filter::not).ok_or(QueryError::MissingFilter)
    }

    /// Negated equality condition.
    pub fn not_field(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter::not(Filter::field(field, value))
    }

    /// Negated condition with an explicit operator.
    pub fn not_field_op(
        field: impl Into<String>,
        operator: impl Into<Op>,
        value: impl Into<Value>,
    ) -> Filter {
        Filter::not(Filter::field_op(field, operator, value))
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Joins filters under one connective.
    pub fn group<I, F>(connective: Connective, filters: I) -> Filter
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        Filter::Group {
            connective,
            filters: filters.into_iter().map(Into::into).collect(),
        }
    }

    /// Requires both this filter and `other`.
    ///
    /// Chaining `and` on an `and` group appends to it instead of nesting.
    pub fn and(self, other: impl Into<Filter>) -> Filter {
        self.join(Connective::And, other.into())
    }

    /// Requires this filter or `other`.
    ///
    /// Chaining `or` on an `or` group appends to it instead of nesting.
    pub fn or(self, other: impl Into<Filter>) -> Filter {
        self.join(Connective::Or, other.into())
    }

    fn join(self, connective: Connective, other: Filter) -> Filter {
        match self {
            Filter::Group {
                connective: current,
                mut filters,
            } if current == connective => {
                filters.push(other);
                Filter::Group {
                    connective,
                    filters,
                }
            }
            first => Filter::Group {
                connective,
                filters: vec![first, other],
            },
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

impl ToBody for Filter {
    fn body(&self) -> Result<KeyedBody> {
        match self {
            Filter::Condition(condition) => condition.body(),
            Filter::Not(inner) => KeyedBody::new("not", inner.body_value()?),
            Filter::Group {
                connective,
                filters,
            } => {
                let bodies = filters
                    .iter()
                    .map(ToBody::body_value)
                    .collect::<Result<Vec<_>>>()?;
                KeyedBody::new(connective.as_str(), Value::Array(bodies))
            }
            Filter::Named(named) => named.body(),
        }
    }
}

impl From<OperatorValue> for Filter {
    fn from(condition: OperatorValue) -> Self {
        Filter::Condition(condition)
    }
}

impl From<NamedFilter> for Filter {
    fn from(named: NamedFilter) -> Self {
        Filter::Named(named)
    }
}

impl From<SimilarFilter> for Filter {
    fn from(similar: SimilarFilter) -> Self {
        Filter::Named(similar.0)
    }
}

fn collect_values<I, V>(values: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Value::Array(values.into_iter().map(Into::into).collect())
}

/// Composite filter: a field, an operator fixed to the filter's name and a
/// structured value map.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFilter {
    field: String,
    operator: Op,
    value: Map<String, Value>,
}

impl NamedFilter {
    /// Creates a named filter with an empty value map.
    pub fn new(field: impl Into<String>, operator: impl Into<Op>) -> Self {
        Self::with_value(field, operator, Map::new())
    }

    /// Creates a named filter with an initial value map.
    pub fn with_value(
        field: impl Into<String>,
        operator: impl Into<Op>,
        value: Map<String, Value>,
    ) -> Self {
        NamedFilter {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }

    /// Sets an entry of the value map, replacing any previous entry.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.value.insert(key.into(), value.into());
        self
    }

    /// Returns the target field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the operator.
    pub fn operator(&self) -> &Op {
        &self.operator
    }

    /// Returns the structured value map.
    pub fn value(&self) -> &Map<String, Value> {
        &self.value
    }
}

impl ToBody for NamedFilter {
    fn body(&self) -> Result<KeyedBody> {
        let mut payload = Map::new();
        payload.insert("operator".to_string(), Value::from(self.operator.as_str()));
        payload.insert("value".to_string(), Value::Object(self.value.clone()));
        KeyedBody::new(&self.field, Value::Object(payload))
    }
}

/// "More like this" filter with document-frequency tuning.
///
/// # Example
///
/// ```
/// use datakit_query::{Filter, ToBody};
/// use serde_json::json;
///
/// let filter: Filter = Filter::similar("plot", "space pirates")
///     .min_tf(2)
///     .stop_words(["the", "a"])
///     .into();
///
/// assert_eq!(
///     filter.body_value().unwrap(),
///     json!({"plot": {"operator": "similar", "value": {
///         "query": "space pirates", "minTf": 2, "stopWords": ["the", "a"]
///     }}})
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarFilter(NamedFilter);

impl SimilarFilter {
    /// Documents similar to `query` in `field`.
    pub fn new(field: impl Into<String>, query: impl Into<String>) -> Self {
        SimilarFilter(NamedFilter::new(field, Op::Similar).set("query", query.into()))
    }

    /// Ignores terms that appear in more than `value` documents.
    pub fn max_df(self, value: u32) -> Self {
        SimilarFilter(self.0.set("maxDf", value))
    }

    /// Ignores terms that appear in fewer than `value` documents.
    pub fn min_df(self, value: u32) -> Self {
        SimilarFilter(self.0.set("minDf", value))
    }

    /// Ignores terms that appear fewer than `value` times in the query.
    pub fn min_tf(self, value: u32) -> Self {
        SimilarFilter(self.0.set("minTf", value))
    }

    /// Ignores the given words.
    pub fn stop_words<I, S>(self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<Value> = words.into_iter().map(|w| Value::String(w.into())).collect();
        SimilarFilter(self.0.set("stopWords", words))
    }

    /// Returns the underlying named filter.
    pub fn as_named(&self) -> &NamedFilter {
        &self.0
    }
}

impl ToBody for SimilarFilter {
    fn body(&self) -> Result<KeyedBody> {
        self.0.body()
    }
}
