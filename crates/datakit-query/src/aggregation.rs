//! Aggregation trees and cycle-safe serialization.
//!
//! An [`Aggregation`] is a cheap, shareable handle to a node. Children are
//! attached with [`Aggregation::add_nested_aggregation`], which means the
//! same node can appear in several places of a tree, or (by mistake) inside
//! its own subtree.
//!
//! # Serialization passes
//!
//! Each call to [`ToBody::body`] on an aggregation is one pass. The pass
//! carries a visited path holding the identity of every node between the
//! root and the node being serialized:
//!
//! ```text
//! enter(root) -> payload(root)
//!   for child in children:
//!     enter(child)        fails with CircularReference if already on the path
//!     payload(child) ...  recursive
//!     leave(child)
//! ```
//!
//! The path lives on the stack of the root call, so concurrent passes never
//! see each other and nothing survives a failed pass. A node shared by two
//! siblings, or by two top-level aggregations, is not a cycle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::body::{KeyedBody, ToBody};
use crate::error::{QueryError, Result};
use crate::ordering::BucketOrder;
use crate::range::Range;

/// The computation performed by an aggregation node.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationKind {
    /// Single-operator metric such as `avg` or `cardinality`.
    Metric { operator: String },
    /// Fixed-interval histogram.
    Histogram { interval: i64 },
    /// Buckets per distinct term.
    Terms {
        size: Option<usize>,
        orders: Vec<BucketOrder>,
    },
    /// Buckets per value range.
    Range { ranges: Vec<Range> },
    /// Buckets per distance range from a location.
    Distance {
        location: Value,
        ranges: Vec<Range>,
        unit: Option<String>,
    },
}

impl AggregationKind {
    /// Returns the wire operator of this kind.
    pub fn operator(&self) -> &str {
        match self {
            AggregationKind::Metric { operator } => operator,
            AggregationKind::Histogram { .. } => "histogram",
            AggregationKind::Terms { .. } => "terms",
            AggregationKind::Range { .. } => "range",
            AggregationKind::Distance { .. } => "geoDistance",
        }
    }

    /// Returns the `value` entry of the payload, if any.
    pub fn value(&self) -> Option<Value> {
        match self {
            AggregationKind::Metric { .. } => None,
            AggregationKind::Histogram { interval } => Some(Value::from(*interval)),
            AggregationKind::Terms { size, orders } => {
                if size.is_none() && orders.is_empty() {
                    return None;
                }
                let mut value = Map::new();
                if let Some(size) = size {
                    value.insert("size".to_string(), Value::from(*size));
                }
                if !orders.is_empty() {
                    let orders = orders.iter().map(BucketOrder::to_json).collect();
                    value.insert("order".to_string(), Value::Array(orders));
                }
                Some(Value::Object(value))
            }
            AggregationKind::Range { ranges } => Some(ranges_value(ranges)),
            AggregationKind::Distance {
                location,
                ranges,
                unit,
            } => {
                let mut value = Map::new();
                value.insert("location".to_string(), location.clone());
                value.insert("ranges".to_string(), ranges_value(ranges));
                if let Some(unit) = unit {
                    value.insert("unit".to_string(), Value::from(unit.as_str()));
                }
                Some(Value::Object(value))
            }
        }
    }
}

fn ranges_value(ranges: &[Range]) -> Value {
    Value::Array(ranges.iter().map(|r| Value::Object(r.to_map())).collect())
}

struct Node {
    name: String,
    field: String,
    kind: AggregationKind,
    children: RwLock<Vec<Aggregation>>,
    frozen: AtomicBool,
}

/// A shareable aggregation node.
///
/// Cloning an `Aggregation` clones the handle, not the node: both handles
/// refer to the same node and compare as the same identity during cycle
/// detection.
///
/// # Example
///
/// ```
/// use datakit_query::{Aggregation, ToBody};
/// use serde_json::json;
///
/// let genres = Aggregation::terms("genres", "genre")
///     .size(5)
///     .add_nested_aggregation([Aggregation::avg("rating", "stars")])
///     .unwrap();
///
/// assert_eq!(
///     genres.body_value().unwrap(),
///     json!({"genre": {
///         "name": "genres",
///         "operator": "terms",
///         "value": {"size": 5},
///         "aggregation": [{"stars": {"name": "rating", "operator": "avg"}}]
///     }})
/// );
/// ```
#[derive(Clone)]
pub struct Aggregation(Arc<Node>);

// Children are summarized: a misused tree may contain cycles.
impl std::fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregation")
            .field("name", &self.0.name)
            .field("field", &self.0.field)
            .field("kind", &self.0.kind)
            .field("children", &self.0.children.read().len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl Aggregation {
    /// Creates an aggregation of any kind.
    pub fn new(name: impl Into<String>, field: impl Into<String>, kind: AggregationKind) -> Self {
        Aggregation(Arc::new(Node {
            name: name.into(),
            field: field.into(),
            kind,
            children: RwLock::new(Vec::new()),
            frozen: AtomicBool::new(false),
        }))
    }

    /// Creates a metric aggregation with an arbitrary operator.
    pub fn of(
        name: impl Into<String>,
        field: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            field,
            AggregationKind::Metric {
                operator: operator.into(),
            },
        )
    }

    // ========================================================================
    // Metric factories
    // ========================================================================

    /// Average of a numeric field.
    pub fn avg(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "avg")
    }

    /// Sum of a numeric field.
    pub fn sum(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "sum")
    }

    /// Number of values of a field.
    pub fn count(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "count")
    }

    /// Approximate number of distinct values.
    pub fn cardinality(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "cardinality")
    }

    /// Stats plus variance and standard deviation.
    pub fn extended_stats(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "extendedStats")
    }

    /// Maximum value of a field.
    pub fn max(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "max")
    }

    /// Minimum value of a field.
    pub fn min(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "min")
    }

    /// Number of documents without the field.
    pub fn missing(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "missing")
    }

    /// Count, min, max, avg and sum in one aggregation.
    pub fn stats(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::of(name, field, "stats")
    }

    // ========================================================================
    // Bucketing factories
    // ========================================================================

    /// Buckets of a fixed numeric `interval`.
    pub fn histogram(name: impl Into<String>, field: impl Into<String>, interval: i64) -> Self {
        Self::new(name, field, AggregationKind::Histogram { interval })
    }

    /// Starts a terms aggregation. Set `size` and bucket orders on the
    /// returned builder.
    pub fn terms(name: impl Into<String>, field: impl Into<String>) -> TermsAggregation {
        TermsAggregation::new(name, field)
    }

    /// Buckets per value range. Returns a builder for adding ranges.
    pub fn range(
        name: impl Into<String>,
        field: impl Into<String>,
        ranges: impl IntoIterator<Item = Range>,
    ) -> RangeAggregation {
        RangeAggregation::new(name, field, ranges)
    }

    /// Buckets per distance from `location`. Returns a builder.
    pub fn distance(
        name: impl Into<String>,
        field: impl Into<String>,
        location: impl Into<Value>,
        ranges: impl IntoIterator<Item = Range>,
    ) -> DistanceAggregation {
        DistanceAggregation::new(name, field, location, ranges)
    }

    // ========================================================================
    // Tree building
    // ========================================================================

    /// Appends nested aggregations, preserving order.
    ///
    /// Returns [`QueryError::FrozenAggregation`] once this node belongs to a
    /// built [`Query`](crate::Query).
    ///
    /// Nodes are reference counted. Adding a node to its own subtree creates
    /// a reference cycle that keeps every node on it alive until the cycle is
    /// broken with [`clear_nested_aggregations`](Self::clear_nested_aggregations).
    pub fn add_nested_aggregation<I, A>(self, children: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Aggregation>,
    {
        self.ensure_mutable()?;
        // The iterator may read this node, so drain it before locking.
        let children: Vec<Aggregation> = children.into_iter().map(Into::into).collect();
        self.0.children.write().extend(children);
        Ok(self)
    }

    /// Detaches and returns every nested aggregation of this node.
    ///
    /// Breaks reference cycles created by adding a node to its own subtree.
    /// Returns [`QueryError::FrozenAggregation`] once this node belongs to a
    /// built [`Query`](crate::Query).
    pub fn clear_nested_aggregations(&self) -> Result<Vec<Aggregation>> {
        self.ensure_mutable()?;
        Ok(std::mem::take(&mut *self.0.children.write()))
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(QueryError::FrozenAggregation {
                name: self.0.name.clone(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns the aggregation name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the aggregated field.
    pub fn field(&self) -> &str {
        &self.0.field
    }

    /// Returns the computation performed.
    pub fn kind(&self) -> &AggregationKind {
        &self.0.kind
    }

    /// Returns the wire operator.
    pub fn operator(&self) -> &str {
        self.0.kind.operator()
    }

    /// Returns handles to the nested aggregations, in order.
    pub fn children(&self) -> Vec<Aggregation> {
        self.0.children.read().clone()
    }

    /// Returns `true` once a built query owns this node.
    pub fn is_frozen(&self) -> bool {
        self.0.frozen.load(Ordering::Acquire)
    }

    /// Returns `true` if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Aggregation) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Marks this node and everything reachable from it as frozen.
    pub(crate) fn freeze(&self) {
        let mut seen = HashSet::new();
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            if !seen.insert(node.id()) {
                continue;
            }
            node.0.frozen.store(true, Ordering::Release);
            pending.extend(node.children());
        }
        tracing::trace!(aggregation = %self.0.name, nodes = seen.len(), "froze aggregation tree");
    }

    fn body_in(&self, path: &mut VisitedPath) -> Result<KeyedBody> {
        let mut payload = Map::new();
        payload.insert("name".to_string(), Value::from(self.0.name.as_str()));
        payload.insert("operator".to_string(), Value::from(self.operator()));
        if let Some(value) = self.0.kind.value() {
            payload.insert("value".to_string(), value);
        }

        // Snapshot the children so no lock is held while descending.
        let children = self.children();
        if !children.is_empty() {
            let mut bodies = Vec::with_capacity(children.len());
            for child in &children {
                path.enter(child)?;
                bodies.push(child.body_in(path)?.into_value());
                path.leave(child);
            }
            payload.insert("aggregation".to_string(), Value::Array(bodies));
        }

        KeyedBody::new(&self.0.field, Value::Object(payload))
    }
}

impl ToBody for Aggregation {
    fn body(&self) -> Result<KeyedBody> {
        let mut path = VisitedPath::default();
        path.enter(self)?;
        let body = self.body_in(&mut path);
        if let Err(QueryError::CircularReference { name }) = &body {
            tracing::warn!(root = %self.0.name, at = %name, "aggregation serialization aborted");
        }
        body
    }
}

/// Identities of the aggregation nodes on the current root-to-node path of a
/// serialization pass.
#[derive(Debug, Default)]
struct VisitedPath {
    ids: HashSet<usize>,
}

impl VisitedPath {
    fn enter(&mut self, node: &Aggregation) -> Result<()> {
        if !self.ids.insert(node.id()) {
            return Err(QueryError::CircularReference {
                name: node.0.name.clone(),
            });
        }
        tracing::trace!(aggregation = %node.0.name, depth = self.ids.len(), "entered aggregation");
        Ok(())
    }

    fn leave(&mut self, node: &Aggregation) {
        self.ids.remove(&node.id());
    }
}

// ============================================================================
// Specialized builders
// ============================================================================

/// Builder for a terms aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsAggregation {
    name: String,
    field: String,
    size: Option<usize>,
    orders: Vec<BucketOrder>,
}

impl TermsAggregation {
    /// Starts a terms aggregation with no size or ordering.
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        TermsAggregation {
            name: name.into(),
            field: field.into(),
            size: None,
            orders: Vec::new(),
        }
    }

    /// Sets the maximum number of buckets.
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Appends a bucket ordering.
    pub fn order(mut self, order: BucketOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Appends several bucket orderings.
    pub fn orders(mut self, orders: impl IntoIterator<Item = BucketOrder>) -> Self {
        self.orders.extend(orders);
        self
    }

    /// Finishes the builder and appends nested aggregations.
    pub fn add_nested_aggregation<I, A>(self, children: I) -> Result<Aggregation>
    where
        I: IntoIterator<Item = A>,
        A: Into<Aggregation>,
    {
        Aggregation::from(self).add_nested_aggregation(children)
    }
}

impl From<TermsAggregation> for Aggregation {
    fn from(terms: TermsAggregation) -> Self {
        Aggregation::new(
            terms.name,
            terms.field,
            AggregationKind::Terms {
                size: terms.size,
                orders: terms.orders,
            },
        )
    }
}

/// Builder for a range aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeAggregation {
    name: String,
    field: String,
    ranges: Vec<Range>,
}

impl RangeAggregation {
    /// Starts a range aggregation with the given ranges.
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        ranges: impl IntoIterator<Item = Range>,
    ) -> Self {
        RangeAggregation {
            name: name.into(),
            field: field.into(),
            ranges: ranges.into_iter().collect(),
        }
    }

    /// Appends a bucket range.
    pub fn add_range(mut self, range: Range) -> Self {
        self.ranges.push(range);
        self
    }

    /// Finishes the builder and appends nested aggregations.
    pub fn add_nested_aggregation<I, A>(self, children: I) -> Result<Aggregation>
    where
        I: IntoIterator<Item = A>,
        A: Into<Aggregation>,
    {
        Aggregation::from(self).add_nested_aggregation(children)
    }
}

impl From<RangeAggregation> for Aggregation {
    fn from(range: RangeAggregation) -> Self {
        Aggregation::new(
            range.name,
            range.field,
            AggregationKind::Range {
                ranges: range.ranges,
            },
        )
    }
}

/// Builder for a geographic distance aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceAggregation {
    name: String,
    field: String,
    location: Value,
    ranges: Vec<Range>,
    unit: Option<String>,
}

impl DistanceAggregation {
    /// Starts a distance aggregation around `location`.
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        location: impl Into<Value>,
        ranges: impl IntoIterator<Item = Range>,
    ) -> Self {
        DistanceAggregation {
            name: name.into(),
            field: field.into(),
            location: location.into(),
            ranges: ranges.into_iter().collect(),
            unit: None,
        }
    }

    /// Appends a bucket range.
    pub fn add_range(mut self, range: Range) -> Self {
        self.ranges.push(range);
        self
    }

    /// Sets the distance unit, e.g. `"km"`.
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Finishes the builder and appends nested aggregations.
    pub fn add_nested_aggregation<I, A>(self, children: I) -> Result<Aggregation>
    where
        I: IntoIterator<Item = A>,
        A: Into<Aggregation>,
    {
        Aggregation::from(self).add_nested_aggregation(children)
    }
}

impl From<DistanceAggregation> for Aggregation {
    fn from(distance: DistanceAggregation) -> Self {
        Aggregation::new(
            distance.name,
            distance.field,
            AggregationKind::Distance {
                location: distance.location,
                ranges: distance.ranges,
                unit: distance.unit,
            },
        )
    }
}
