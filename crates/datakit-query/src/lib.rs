//! Datakit Query - Fluent builder for data service queries.
//!
//! Builds the JSON body a data service expects for a query. It supports:
//!
//! - Filters: comparisons, text search, geo predicates, `and`/`or`/`not` trees
//! - Aggregations: metrics, histograms, terms, ranges, geo distance, nesting
//! - Sorting, field selection, highlighting and pagination
//! - Cycle detection when serializing shared aggregation trees
//!
//! # Quick Start
//!
//! ```rust
//! use datakit_query::{Aggregation, Dir, Filter, Query};
//! use serde_json::json;
//!
//! let query = Query::builder()
//!     .fetch()
//!     .filter(Filter::gte("year", 1990).or(Filter::equal("classic", true)))
//!     .aggregate(Aggregation::avg("avg_rating", "rating"))
//!     .sort_by("year", Dir::Desc)
//!     .limit(20)
//!     .build();
//!
//! assert_eq!(
//!     query.body().unwrap(),
//!     json!({
//!         "type": "fetch",
//!         "filter": [{"or": [
//!             {"year": {"operator": ">=", "value": 1990}},
//!             {"classic": {"operator": "=", "value": true}}
//!         ]}],
//!         "aggregation": [{"rating": {"name": "avg_rating", "operator": "avg"}}],
//!         "sort": [{"year": "desc"}],
//!         "limit": 20
//!     })
//! );
//! ```
//!
//! # Body Shape
//!
//! Every filter and aggregation serializes to a single-entry object keyed by
//! its field (see [`KeyedBody`]). The query body only contains the facets
//! that were set:
//!
//! | Key | Content |
//! |-----|---------|
//! | `type` | `"fetch"`, `"count"` or a custom type |
//! | `fields` | selected field names |
//! | `filter` | filter bodies |
//! | `aggregation` | aggregation bodies |
//! | `sort` | `{field: "asc" \| "desc"}` entries |
//! | `search` | search bodies |
//! | `highlight` | highlighted field names |
//! | `limit`, `offset` | pagination |

mod aggregation;
mod body;
mod error;
mod filter;
mod geo;
mod op;
mod operator_value;
mod ordering;
mod query;
mod range;

// Re-export public API
pub use aggregation::{
    Aggregation, AggregationKind, DistanceAggregation, RangeAggregation, TermsAggregation,
};
pub use body::{KeyedBody, ToBody};
pub use error::{QueryError, Result};
pub use filter::{Connective, Filter, NamedFilter, SimilarFilter};
pub use geo::{Point, Shape};
pub use op::Op;
pub use operator_value::OperatorValue;
pub use ordering::{BucketOrder, Dir, Sort};
pub use query::{Query, QueryBuilder, QueryType};
pub use range::Range;
