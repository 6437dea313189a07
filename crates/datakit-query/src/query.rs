//! Query builder and serializer.
//!
//! [`QueryBuilder`] accumulates the facets of a query through a fluent API;
//! [`QueryBuilder::build`] finalizes them into an immutable [`Query`] whose
//! [`Query::body`] is the canonical request body.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::aggregation::Aggregation;
use crate::body::ToBody;
use crate::error::Result;
use crate::filter::Filter;
use crate::op::Op;
use crate::ordering::{Dir, Sort};

/// The kind of result a query asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Return matching documents.
    Fetch,
    /// Return only the number of matching documents.
    Count,
    /// Any other server-side query type.
    Custom(String),
}

impl QueryType {
    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            QueryType::Fetch => "fetch",
            QueryType::Count => "count",
            QueryType::Custom(name) => name,
        }
    }
}

impl From<&str> for QueryType {
    fn from(name: &str) -> Self {
        match name {
            "fetch" => QueryType::Fetch,
            "count" => QueryType::Count,
            other => QueryType::Custom(other.to_string()),
        }
    }
}

impl From<String> for QueryType {
    fn from(name: String) -> Self {
        QueryType::from(name.as_str())
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A finalized query.
///
/// The serialized body contains only the facets that were set, in this
/// order:
///
/// ```text
/// {type?, fields?, filter?, aggregation?, sort?, search?, highlight?, limit?, offset?}
/// ```
///
/// # Example
///
/// ```
/// use datakit_query::{Filter, Query};
/// use serde_json::json;
///
/// let query = Query::builder()
///     .fetch()
///     .filter(Filter::gt("year", 2000))
///     .sort("title")
///     .limit(10)
///     .build();
///
/// assert_eq!(
///     query.body().unwrap(),
///     json!({
///         "type": "fetch",
///         "filter": [{"year": {"operator": ">", "value": 2000}}],
///         "sort": [{"title": "asc"}],
///         "limit": 10
///     })
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    query_type: Option<QueryType>,
    fields: Vec<String>,
    filters: Vec<Filter>,
    aggregations: Vec<Aggregation>,
    sorts: Vec<Sort>,
    searches: Vec<Filter>,
    highlights: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    /// Starts building a query.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serializes this query to its JSON body.
    ///
    /// Every filter, search clause and aggregation is serialized in its own
    /// pass. Fails without producing a body if any aggregation tree contains
    /// a cycle.
    pub fn body(&self) -> Result<Value> {
        self.body_map().map(Value::Object)
    }

    /// Serializes this query to compact JSON text.
    pub fn body_as_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body_map()?)?)
    }

    /// Encodes the body as URL query parameters.
    ///
    /// Each top-level key becomes one `key=value` pair, where the value is
    /// the percent-encoded JSON text of that facet. An empty query encodes
    /// to an empty string.
    pub fn encoded_query_string(&self) -> Result<String> {
        let body = self.body_map()?;
        let mut pairs = Vec::with_capacity(body.len());
        for (key, value) in &body {
            let json = serde_json::to_string(value)?;
            pairs.push(format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&json)
            ));
        }
        Ok(pairs.join("&"))
    }

    fn body_map(&self) -> Result<Map<String, Value>> {
        let mut body = Map::new();

        if let Some(query_type) = &self.query_type {
            body.insert("type".to_string(), Value::from(query_type.as_str()));
        }
        if !self.fields.is_empty() {
            body.insert("fields".to_string(), Value::from(self.fields.clone()));
        }
        if !self.filters.is_empty() {
            body.insert("filter".to_string(), bodies(&self.filters)?);
        }
        if !self.aggregations.is_empty() {
            body.insert("aggregation".to_string(), bodies(&self.aggregations)?);
        }
        if !self.sorts.is_empty() {
            body.insert("sort".to_string(), serde_json::to_value(&self.sorts)?);
        }
        if !self.searches.is_empty() {
            body.insert("search".to_string(), bodies(&self.searches)?);
        }
        if !self.highlights.is_empty() {
            body.insert("highlight".to_string(), Value::from(self.highlights.clone()));
        }
        if let Some(limit) = self.limit {
            body.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(offset) = self.offset {
            body.insert("offset".to_string(), Value::from(offset));
        }

        tracing::debug!(facets = body.len(), "serialized query body");
        Ok(body)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn query_type(&self) -> Option<&QueryType> {
        self.query_type.as_ref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn aggregations(&self) -> &[Aggregation] {
        &self.aggregations
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn searches(&self) -> &[Filter] {
        &self.searches
    }

    pub fn highlights(&self) -> &[String] {
        &self.highlights
    }

    /// Returns the limit, if set.
    pub fn get_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the offset, if set.
    pub fn get_offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns `true` if no facet is set (the body is `{}`).
    pub fn is_empty(&self) -> bool {
        self.query_type.is_none()
            && self.fields.is_empty()
            && self.filters.is_empty()
            && self.aggregations.is_empty()
            && self.sorts.is_empty()
            && self.searches.is_empty()
            && self.highlights.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }
}

fn bodies<T: ToBody>(nodes: &[T]) -> Result<Value> {
    nodes
        .iter()
        .map(ToBody::body_value)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.body_map()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

/// Fluent builder for [`Query`].
///
/// Setting the type more than once is allowed: `fetch()`, `count()` and
/// `query_type()` overwrite each other and the last call wins. Every other
/// facet accumulates in call order.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    // ========================================================================
    // Type
    // ========================================================================

    /// Asks for matching documents.
    pub fn fetch(self) -> Self {
        self.query_type(QueryType::Fetch)
    }

    /// Asks for the number of matching documents.
    pub fn count(self) -> Self {
        self.query_type(QueryType::Count)
    }

    /// Sets the query type, replacing any previous one.
    pub fn query_type(mut self, query_type: impl Into<QueryType>) -> Self {
        self.query.query_type = Some(query_type.into());
        self
    }

    // ========================================================================
    // Field selection
    // ========================================================================

    /// Selects one field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.query.fields.push(name.into());
        self
    }

    /// Selects fields, appending to any already selected.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.fields.extend(names.into_iter().map(Into::into));
        self
    }

    // ========================================================================
    // Filters
    // ========================================================================

    /// Adds a filter.
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.query.filters.push(filter.into());
        self
    }

    /// Adds an equality filter.
    pub fn filter_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::field(field, value))
    }

    /// Adds a filter with an explicit operator.
    pub fn filter_op(
        self,
        field: impl Into<String>,
        operator: impl Into<Op>,
        value: impl Into<Value>,
    ) -> Self {
        self.filter(Filter::field_op(field, operator, value))
    }

    // ========================================================================
    // Aggregations
    // ========================================================================

    /// Adds an aggregation.
    pub fn aggregate(mut self, aggregation: impl Into<Aggregation>) -> Self {
        self.query.aggregations.push(aggregation.into());
        self
    }

    /// Adds a metric aggregation by operator name.
    pub fn aggregate_op(
        self,
        name: impl Into<String>,
        field: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        self.aggregate(Aggregation::of(name, field, operator))
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Adds a search clause.
    pub fn search(mut self, filter: impl Into<Filter>) -> Self {
        self.query.searches.push(filter.into());
        self
    }

    /// Adds a full-text search over every field (`*`).
    pub fn search_text(self, query: impl Into<String>) -> Self {
        self.search(Filter::match_all(query))
    }

    /// Adds a full-text search on one field.
    pub fn search_field(self, field: impl Into<String>, query: impl Into<String>) -> Self {
        self.search(Filter::matching(field, query))
    }

    /// Adds a search clause with an explicit operator.
    pub fn search_op(
        self,
        field: impl Into<String>,
        operator: impl Into<Op>,
        query: impl Into<Value>,
    ) -> Self {
        self.search(Filter::field_op(field, operator, query))
    }

    // ========================================================================
    // Sorting and highlighting
    // ========================================================================

    /// Sorts ascending by a field.
    pub fn sort(self, field: impl Into<String>) -> Self {
        self.sort_by(field, Dir::Asc)
    }

    /// Sorts by a field in the given direction.
    pub fn sort_by(mut self, field: impl Into<String>, dir: Dir) -> Self {
        self.query.sorts.push(Sort::new(field, dir));
        self
    }

    /// Highlights matches in one field.
    pub fn highlight(mut self, field: impl Into<String>) -> Self {
        self.query.highlights.push(field.into());
        self
    }

    /// Highlights matches in several fields.
    pub fn highlights<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.highlights.extend(fields.into_iter().map(Into::into));
        self
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Sets the maximum number of results to return.
    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Sets the number of results to skip.
    pub fn offset(mut self, n: usize) -> Self {
        self.query.offset = Some(n);
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Finalizes the query.
    ///
    /// Aggregation trees reachable from the query are frozen: adding nested
    /// aggregations to any of their nodes afterwards fails.
    pub fn build(self) -> Query {
        for aggregation in &self.query.aggregations {
            aggregation.freeze();
        }
        tracing::debug!(
            filters = self.query.filters.len(),
            aggregations = self.query.aggregations.len(),
            searches = self.query.searches.len(),
            "built query"
        );
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use serde_json::json;

    #[test]
    fn empty_fetch() {
        let query = Query::builder().fetch().build();
        assert_eq!(query.body_as_json().unwrap(), r#"{"type":"fetch"}"#);
    }

    #[test]
    fn empty_query_is_empty_object() {
        let query = Query::builder().build();
        assert!(query.is_empty());
        assert_eq!(query.body().unwrap(), json!({}));
        assert_eq!(query.encoded_query_string().unwrap(), "");
    }

    #[test]
    fn type_last_call_wins() {
        let query = Query::builder().fetch().count().build();
        assert_eq!(query.query_type(), Some(&QueryType::Count));

        let query = Query::builder().count().query_type("type").build();
        assert_eq!(query.body().unwrap(), json!({"type": "type"}));

        let query = Query::builder().query_type("fetch").build();
        assert_eq!(query.query_type(), Some(&QueryType::Fetch));
    }

    #[test]
    fn fields_accumulate() {
        let query = Query::builder()
            .fields(["field1"])
            .fields(["field2", "field3"])
            .field("field1")
            .build();
        assert_eq!(
            query.body().unwrap(),
            json!({"fields": ["field1", "field2", "field3", "field1"]})
        );
    }

    #[test]
    fn filters_in_order() {
        let query = Query::builder()
            .filter_eq("field1", 1)
            .filter_eq("field1", 1)
            .filter_op("field2", "regex", "value")
            .filter(Filter::field("field3", 0.55))
            .filter(Filter::field_op("field4", "pre", "str"))
            .filter(Filter::not_field("field5", 1))
            .filter(Filter::not_field_op("field7", "!=", 1))
            .filter(Filter::not(Filter::field("field8", 1)))
            .build();

        assert_eq!(
            query.body().unwrap(),
            json!({"filter": [
                {"field1": {"operator": "=", "value": 1}},
                {"field1": {"operator": "=", "value": 1}},
                {"field2": {"operator": "regex", "value": "value"}},
                {"field3": {"operator": "=", "value": 0.55}},
                {"field4": {"operator": "pre", "value": "str"}},
                {"not": {"field5": {"operator": "=", "value": 1}}},
                {"not": {"field7": {"operator": "!=", "value": 1}}},
                {"not": {"field8": {"operator": "=", "value": 1}}}
            ]})
        );
    }

    #[test]
    fn aggregations() {
        let query = Query::builder()
            .aggregate_op("a", "f", "min")
            .aggregate(Aggregation::missing("m", "f"))
            .build();

        assert_eq!(
            query.body().unwrap(),
            json!({"aggregation": [
                {"f": {"name": "a", "operator": "min"}},
                {"f": {"name": "m", "operator": "missing"}}
            ]})
        );
    }

    #[test]
    fn searches() {
        let query = Query::builder()
            .search_text("query")
            .search_text("query")
            .search_field("field", "value")
            .search_op("field", "=", "value")
            .search(Filter::field("field", "value"))
            .build();

        assert_eq!(
            query.body().unwrap(),
            json!({"search": [
                {"*": {"operator": "match", "value": "query"}},
                {"*": {"operator": "match", "value": "query"}},
                {"field": {"operator": "match", "value": "value"}},
                {"field": {"operator": "=", "value": "value"}},
                {"field": {"operator": "=", "value": "value"}}
            ]})
        );
    }

    #[test]
    fn sorts() {
        let query = Query::builder()
            .sort("field1")
            .sort_by("field2", Dir::Asc)
            .sort_by("field3", Dir::Desc)
            .build();

        assert_eq!(
            query.body().unwrap(),
            json!({"sort": [{"field1": "asc"}, {"field2": "asc"}, {"field3": "desc"}]})
        );
    }

    #[test]
    fn highlights() {
        let query = Query::builder()
            .highlight("field1")
            .highlights(["field2", "field3"])
            .build();

        assert_eq!(
            query.body().unwrap(),
            json!({"highlight": ["field1", "field2", "field3"]})
        );
    }

    #[test]
    fn limit_and_offset() {
        let query = Query::builder().limit(1).offset(2).build();
        assert_eq!(query.body_as_json().unwrap(), r#"{"limit":1,"offset":2}"#);
        assert_eq!(query.get_limit(), Some(1));
        assert_eq!(query.get_offset(), Some(2));
    }

    #[test]
    fn key_order_is_fixed() {
        let query = Query::builder()
            .offset(5)
            .limit(10)
            .highlight("h")
            .search_text("s")
            .sort("o")
            .aggregate(Aggregation::avg("a", "f"))
            .filter_eq("x", 1)
            .fields(["f"])
            .count()
            .build();

        let body = query.body().unwrap();
        let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "type",
                "fields",
                "filter",
                "aggregation",
                "sort",
                "search",
                "highlight",
                "limit",
                "offset"
            ]
        );
    }

    #[test]
    fn circular_aggregation_fails_whole_body() {
        let node = Aggregation::avg("loop", "f");
        node.clone().add_nested_aggregation([node.clone()]).unwrap();

        let query = Query::builder().fetch().aggregate(node).build();
        assert!(matches!(
            query.body(),
            Err(QueryError::CircularReference { .. })
        ));
        assert!(query.body_as_json().is_err());
        assert!(serde_json::to_string(&query).is_err());
    }

    #[test]
    fn build_freezes_aggregations() {
        let child = Aggregation::min("child", "c");
        let root = Aggregation::avg("root", "r")
            .add_nested_aggregation([child.clone()])
            .unwrap();

        let _query = Query::builder().aggregate(root.clone()).build();

        assert!(matches!(
            child.add_nested_aggregation([Aggregation::max("late", "l")]),
            Err(QueryError::FrozenAggregation { .. })
        ));
        assert!(root.add_nested_aggregation([Aggregation::max("late", "l")]).is_err());
    }

    #[test]
    fn encoded_query_string() {
        let query = Query::builder().fetch().limit(5).build();
        assert_eq!(
            query.encoded_query_string().unwrap(),
            "type=%22fetch%22&limit=5"
        );

        let query = Query::builder().filter_eq("a", "b c").build();
        assert_eq!(
            query.encoded_query_string().unwrap(),
            format!(
                "filter={}",
                urlencoding::encode(r#"[{"a":{"operator":"=","value":"b c"}}]"#)
            )
        );
    }

    #[test]
    fn serialize_matches_body() {
        let query = Query::builder().fetch().sort("a").build();
        assert_eq!(serde_json::to_value(&query).unwrap(), query.body().unwrap());
    }

    #[test]
    fn introspection() {
        let query = Query::builder()
            .fetch()
            .fields(["a"])
            .filter_eq("b", 1)
            .aggregate(Aggregation::sum("c", "d"))
            .sort("e")
            .search_text("f")
            .highlight("g")
            .build();

        assert_eq!(query.fields(), ["a".to_string()]);
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.aggregations().len(), 1);
        assert_eq!(query.sorts(), [Sort::asc("e")]);
        assert_eq!(query.searches().len(), 1);
        assert_eq!(query.highlights(), ["g".to_string()]);
        assert!(!query.is_empty());
    }
}
