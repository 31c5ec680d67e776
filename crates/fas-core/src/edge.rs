//! Directed edge value type.

use std::fmt;
use std::str::FromStr;

use crate::error::EdgeParseError;

/// A directed edge `start -> end` between two integer-labelled vertices.
///
/// Edges are plain values: they are copied into ring slots and compared
/// by value on both sides of the process boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    /// Source vertex.
    pub start: i32,
    /// Target vertex.
    pub end: i32,
}

impl Edge {
    /// Create an edge from `start` to `end`.
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Whether this edge starts and ends at the same vertex.
    pub const fn is_self_loop(&self) -> bool {
        self.start == self.end
    }
}

impl From<(i32, i32)> for Edge {
    fn from((start, end): (i32, i32)) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Edge {
    type Err = EdgeParseError;

    /// Parse the `u-v` form used on the generator command line.
    ///
    /// A leading `-` belongs to the first vertex, so `-1-2` is `(-1, 2)`
    /// and `1--2` is `(1, -2)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EdgeParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty edge"));
        }

        // Skip a sign on the first vertex before looking for the separator.
        let search_from = usize::from(trimmed.starts_with(['-', '+']));
        let sep = trimmed[search_from..]
            .find('-')
            .map(|i| i + search_from)
            .ok_or_else(|| invalid("expected <start>-<end>"))?;

        let (lhs, rhs) = (&trimmed[..sep], &trimmed[sep + 1..]);
        let start = lhs
            .parse::<i32>()
            .map_err(|_| invalid("start vertex is not an integer"))?;
        let end = rhs
            .parse::<i32>()
            .map_err(|_| invalid("end vertex is not an integer"))?;

        Ok(Self { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_edge() {
        assert_eq!("0-1".parse::<Edge>().unwrap(), Edge::new(0, 1));
        assert_eq!(" 12-7 ".parse::<Edge>().unwrap(), Edge::new(12, 7));
    }

    #[test]
    fn parses_negative_vertices() {
        assert_eq!("-1-2".parse::<Edge>().unwrap(), Edge::new(-1, 2));
        assert_eq!("1--2".parse::<Edge>().unwrap(), Edge::new(1, -2));
        assert_eq!("-3--4".parse::<Edge>().unwrap(), Edge::new(-3, -4));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "1", "1-", "-1", "a-b", "1-2-3", "1_2"] {
            let err = bad.parse::<Edge>().unwrap_err();
            assert_eq!(err.input, bad);
        }
    }

    #[test]
    fn display_matches_parse_form() {
        let e = Edge::new(4, -5);
        assert_eq!(e.to_string(), "4--5");
        assert_eq!(e.to_string().parse::<Edge>().unwrap(), e);
    }

    #[test]
    fn self_loop_detection() {
        assert!(Edge::new(3, 3).is_self_loop());
        assert!(!Edge::new(3, 4).is_self_loop());
    }
}
