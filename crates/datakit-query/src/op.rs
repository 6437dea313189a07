//! Filter operators.
//!
//! The [`Op`] enum names every operator the data service understands. Any
//! other operator string is carried through untouched as [`Op::Custom`], so
//! callers are never blocked on a server-side operator this crate does not
//! know about yet.

use serde::{Serialize, Serializer};

/// Operator of a filter condition.
///
/// Operators are grouped by what they compare:
/// - **Comparison**: `Eq`, `Ne`, `Gt`, `Gte`, `Lt`, `Lte`, `Regex`
/// - **Membership**: `Any`, `None`, `Exists`, `Missing`
/// - **Text search**: `Match`, `Phrase`, `Prefix`, `Fuzzy`, `Similar`
/// - **Structured**: `Range`, `GeoDistance`, `GeoPolygon`, `GeoShape`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Op {
    /// Equal (`=`). The default operator.
    #[default]
    Eq,
    /// Not equal (`!=`).
    Ne,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Gte,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Lte,
    /// Regular expression match (`~`).
    Regex,

    /// Value is one of the given set.
    Any,
    /// Value is none of the given set.
    None,
    /// Field is present.
    Exists,
    /// Field is absent.
    Missing,

    /// Full-text match.
    Match,
    /// Exact phrase match.
    Phrase,
    /// Prefix match.
    Prefix,
    /// Fuzzy match with an optional fuzziness.
    Fuzzy,
    /// "More like this" similarity.
    Similar,

    /// Bounded range.
    Range,
    /// Geographic distance from a location (`gd`).
    GeoDistance,
    /// Inside a geographic polygon (`gp`).
    GeoPolygon,
    /// Intersects geographic shapes (`gs`).
    GeoShape,

    /// Operator passed through verbatim.
    Custom(String),
}

impl Op {
    /// Parses an operator string.
    ///
    /// Known symbols map to their variant, `==` and `<>` are normalized to
    /// `=` and `!=`, and everything else becomes [`Op::Custom`].
    pub fn parse(op: &str) -> Op {
        match op {
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            "~" => Op::Regex,
            "any" => Op::Any,
            "none" => Op::None,
            "exists" => Op::Exists,
            "missing" => Op::Missing,
            "match" => Op::Match,
            "phrase" => Op::Phrase,
            "prefix" => Op::Prefix,
            "fuzzy" => Op::Fuzzy,
            "similar" => Op::Similar,
            "range" => Op::Range,
            "gd" => Op::GeoDistance,
            "gp" => Op::GeoPolygon,
            "gs" => Op::GeoShape,
            other => Op::Custom(other.to_string()),
        }
    }

    /// Returns `true` if this operator compares against a text query.
    pub fn is_text_op(&self) -> bool {
        matches!(
            self,
            Op::Match | Op::Phrase | Op::Prefix | Op::Fuzzy | Op::Similar
        )
    }

    /// Returns `true` if this operator takes a geographic value.
    pub fn is_geo_op(&self) -> bool {
        matches!(self, Op::GeoDistance | Op::GeoPolygon | Op::GeoShape)
    }

    /// Returns the wire name of this operator.
    pub fn as_str(&self) -> &str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Regex => "~",
            Op::Any => "any",
            Op::None => "none",
            Op::Exists => "exists",
            Op::Missing => "missing",
            Op::Match => "match",
            Op::Phrase => "phrase",
            Op::Prefix => "prefix",
            Op::Fuzzy => "fuzzy",
            Op::Similar => "similar",
            Op::Range => "range",
            Op::GeoDistance => "gd",
            Op::GeoPolygon => "gp",
            Op::GeoShape => "gs",
            Op::Custom(op) => op,
        }
    }
}

impl From<&str> for Op {
    fn from(op: &str) -> Self {
        Op::parse(op)
    }
}

impl From<String> for Op {
    fn from(op: String) -> Self {
        Op::parse(&op)
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_parse_known_symbols() {
        assert_eq!(Op::parse("="), Op::Eq);
        assert_eq!(Op::parse(">="), Op::Gte);
        assert_eq!(Op::parse("~"), Op::Regex);
        assert_eq!(Op::parse("gd"), Op::GeoDistance);
        assert_eq!(Op::parse("match"), Op::Match);
    }

    #[test]
    fn op_normalization() {
        assert_eq!(Op::parse("=="), Op::Eq);
        assert_eq!(Op::parse("<>"), Op::Ne);
        assert_eq!(Op::parse("==").as_str(), "=");
    }

    #[test]
    fn op_unknown_passes_through() {
        // Wordy operators are not rewritten to their symbols
        assert_eq!(Op::parse("regex"), Op::Custom("regex".to_string()));
        assert_eq!(Op::parse("pre").as_str(), "pre");
    }

    #[test]
    fn op_groups() {
        assert!(Op::Match.is_text_op());
        assert!(Op::Similar.is_text_op());
        assert!(!Op::Eq.is_text_op());

        assert!(Op::GeoShape.is_geo_op());
        assert!(!Op::Range.is_geo_op());
    }

    #[test]
    fn op_default_is_eq() {
        assert_eq!(Op::default(), Op::Eq);
    }

    #[test]
    fn op_display_and_serialize() {
        assert_eq!(Op::Lte.to_string(), "<=");
        assert_eq!(serde_json::to_string(&Op::Ne).unwrap(), "\"!=\"");
        assert_eq!(
            serde_json::to_string(&Op::Custom("near".into())).unwrap(),
            "\"near\""
        );
    }
}
