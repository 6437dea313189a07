//! Ordering types for sort clauses and aggregation buckets.
//!
//! Provides [`Dir`] for sort direction, [`Sort`] for field-based result
//! ordering and [`BucketOrder`] for ordering terms aggregation buckets.

use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::QueryError;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Returns `true` if this is ascending order.
    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// Returns the wire name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Dir {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Dir::Asc),
            "desc" => Ok(Dir::Desc),
            other => Err(QueryError::InvalidDirection(other.to_string())),
        }
    }
}

impl Serialize for Dir {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single sort clause, serialized as `{field: direction}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    pub dir: Dir,
}

impl Sort {
    /// Creates an ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Sort::new(field, Dir::Asc)
    }

    /// Creates a descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Sort::new(field, Dir::Desc)
    }

    /// Creates a sort with the given direction.
    pub fn new(field: impl Into<String>, dir: Dir) -> Self {
        Sort {
            field: field.into(),
            dir,
        }
    }
}

impl Serialize for Sort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.dir)?;
        map.end()
    }
}

/// Ordering of the buckets returned by a terms aggregation.
///
/// Serialized as `{"key": <key>, "asc": <bool>}`, where the key is `_count`,
/// `_key` or a path into a sub-aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketOrder {
    key: String,
    asc: bool,
}

impl BucketOrder {
    /// Orders buckets by document count.
    pub fn count(dir: Dir) -> Self {
        Self::path("_count", dir)
    }

    /// Orders buckets by their key.
    pub fn key(dir: Dir) -> Self {
        Self::path("_key", dir)
    }

    /// Orders buckets by a sub-aggregation path, e.g. `"avg_price"`.
    pub fn path(path: impl Into<String>, dir: Dir) -> Self {
        BucketOrder {
            key: path.into(),
            asc: dir.is_asc(),
        }
    }

    /// Returns the ordering key.
    pub fn order_key(&self) -> &str {
        &self.key
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({"key": self.key, "asc": self.asc})
    }

    /// Returns the direction of this ordering.
    pub fn dir(&self) -> Dir {
        if self.asc {
            Dir::Asc
        } else {
            Dir::Desc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_display() {
        assert_eq!(Dir::Asc.to_string(), "asc");
        assert_eq!(Dir::Desc.to_string(), "desc");
    }

    #[test]
    fn dir_parse() {
        assert_eq!("asc".parse::<Dir>().unwrap(), Dir::Asc);
        assert_eq!("desc".parse::<Dir>().unwrap(), Dir::Desc);
        assert!(matches!(
            "up".parse::<Dir>(),
            Err(QueryError::InvalidDirection(s)) if s == "up"
        ));
    }

    #[test]
    fn sort_constructors() {
        let asc = Sort::asc("name");
        assert_eq!(asc.field, "name");
        assert_eq!(asc.dir, Dir::Asc);

        let desc = Sort::desc("priority");
        assert_eq!(desc.dir, Dir::Desc);
    }

    #[test]
    fn sort_serializes_as_single_entry() {
        assert_eq!(
            serde_json::to_value(Sort::desc("year")).unwrap(),
            json!({"year": "desc"})
        );
    }

    #[test]
    fn bucket_orders() {
        assert_eq!(
            serde_json::to_value(BucketOrder::count(Dir::Desc)).unwrap(),
            json!({"key": "_count", "asc": false})
        );
        assert_eq!(
            serde_json::to_value(BucketOrder::key(Dir::Asc)).unwrap(),
            json!({"key": "_key", "asc": true})
        );

        let by_path = BucketOrder::path("avg_price", Dir::Desc);
        assert_eq!(by_path.to_json(), serde_json::to_value(&by_path).unwrap());
        assert_eq!(by_path.order_key(), "avg_price");
        assert_eq!(by_path.dir(), Dir::Desc);
    }
}
