//! Fixed-size feedback arc set slot carried through the ring.

use std::fmt;

use crate::edge::Edge;
use crate::error::SlotError;

/// Maximum number of edges a ring slot can carry.
///
/// Part of the shared-memory layout: changing it changes the slot size
/// and therefore the layout version.
pub const MAX_FAS_LEN: usize = 8;

/// A candidate feedback arc set of at most [`MAX_FAS_LEN`] edges.
///
/// `size == 0` is reserved for "the graph is acyclic": an ordering was
/// found in which no edge points backwards, which proves no cycle exists.
///
/// Unused trailing entries are always `Edge::default()`, so a slot can be
/// copied byte-for-byte into shared memory without leaking stale edges.
#[derive(Clone, Copy, Debug)]
pub struct FasSlot {
    size: u32,
    edges: [Edge; MAX_FAS_LEN],
}

impl FasSlot {
    /// The acyclicity proof: an empty feedback arc set.
    pub const ACYCLIC: FasSlot = FasSlot {
        size: 0,
        edges: [Edge::new(0, 0); MAX_FAS_LEN],
    };

    /// Build a slot from a candidate edge list.
    ///
    /// Fails with [`SlotError::TooLarge`] if the candidate does not fit.
    pub fn from_edges(edges: &[Edge]) -> Result<Self, SlotError> {
        if edges.len() > MAX_FAS_LEN {
            return Err(SlotError::TooLarge {
                len: edges.len(),
                max: MAX_FAS_LEN,
            });
        }
        let mut slot = Self::ACYCLIC;
        slot.edges[..edges.len()].copy_from_slice(edges);
        slot.size = edges.len() as u32;
        Ok(slot)
    }

    /// Rebuild a slot from its stored parts, validating `size`.
    ///
    /// Entries past `size` are cleared.
    pub fn from_raw_parts(size: u32, edges: [Edge; MAX_FAS_LEN]) -> Result<Self, SlotError> {
        let len = size as usize;
        if len > MAX_FAS_LEN {
            return Err(SlotError::SizeOutOfRange { size });
        }
        let mut slot = Self::ACYCLIC;
        slot.edges[..len].copy_from_slice(&edges[..len]);
        slot.size = size;
        Ok(slot)
    }

    /// Number of edges in the set.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of edges in the set, as `usize`.
    pub fn len(&self) -> usize {
        self.size as usize
    }

    /// Whether this slot is the acyclicity proof.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Alias of [`is_empty`](Self::is_empty) that reads better at call sites
    /// deciding termination.
    pub fn is_acyclic_proof(&self) -> bool {
        self.is_empty()
    }

    /// The edges of the set.
    pub fn edges(&self) -> &[Edge] {
        &self.edges[..self.len()]
    }

    /// All entries including the zeroed tail, for raw layout encoding.
    pub fn raw_edges(&self) -> &[Edge; MAX_FAS_LEN] {
        &self.edges
    }
}

impl Default for FasSlot {
    fn default() -> Self {
        Self::ACYCLIC
    }
}

impl PartialEq for FasSlot {
    fn eq(&self, other: &Self) -> bool {
        self.edges() == other.edges()
    }
}

impl Eq for FasSlot {}

impl fmt::Display for FasSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(acyclic)");
        }
        for (i, e) in self.edges().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn triangle() -> Vec<Edge> {
        vec![Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 0)]
    }

    #[test]
    fn from_edges_keeps_order_and_size() {
        let slot = FasSlot::from_edges(&triangle()).unwrap();
        assert_eq!(slot.size(), 3);
        assert_eq!(slot.edges(), triangle().as_slice());
        assert!(!slot.is_acyclic_proof());
    }

    #[test]
    fn empty_candidate_is_acyclic_proof() {
        let slot = FasSlot::from_edges(&[]).unwrap();
        assert!(slot.is_acyclic_proof());
        assert_eq!(slot, FasSlot::ACYCLIC);
        assert_eq!(slot.to_string(), "(acyclic)");
    }

    #[test]
    fn oversize_candidate_rejected() {
        let edges: Vec<Edge> = (0..=MAX_FAS_LEN as i32).map(|i| Edge::new(i, i + 1)).collect();
        let err = FasSlot::from_edges(&edges).unwrap_err();
        assert_eq!(
            err,
            SlotError::TooLarge {
                len: MAX_FAS_LEN + 1,
                max: MAX_FAS_LEN
            }
        );
    }

    #[test]
    fn raw_parts_validate_size() {
        let edges = [Edge::new(7, 7); MAX_FAS_LEN];
        let err = FasSlot::from_raw_parts(MAX_FAS_LEN as u32 + 1, edges).unwrap_err();
        assert_eq!(
            err,
            SlotError::SizeOutOfRange {
                size: MAX_FAS_LEN as u32 + 1
            }
        );

        // Tail beyond `size` is cleared.
        let slot = FasSlot::from_raw_parts(2, edges).unwrap();
        assert_eq!(slot.edges(), &[Edge::new(7, 7), Edge::new(7, 7)]);
        assert_eq!(slot.raw_edges()[2], Edge::default());
    }

    #[test]
    fn display_lists_edges() {
        let slot = FasSlot::from_edges(&triangle()).unwrap();
        assert_eq!(slot.to_string(), "0-1 1-2 2-0");
    }

    proptest! {
        #[test]
        fn accepts_exactly_up_to_capacity(
            edges in proptest::collection::vec((any::<i32>(), any::<i32>()), 0..=2 * MAX_FAS_LEN)
        ) {
            let edges: Vec<Edge> = edges.into_iter().map(Edge::from).collect();
            match FasSlot::from_edges(&edges) {
                Ok(slot) => {
                    prop_assert!(edges.len() <= MAX_FAS_LEN);
                    prop_assert_eq!(slot.edges(), edges.as_slice());
                    prop_assert!(slot.raw_edges()[edges.len()..].iter().all(|e| *e == Edge::default()));
                }
                Err(SlotError::TooLarge { len, .. }) => {
                    prop_assert!(edges.len() > MAX_FAS_LEN);
                    prop_assert_eq!(len, edges.len());
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
