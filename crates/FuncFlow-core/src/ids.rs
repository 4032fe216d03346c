use crate::error::IdSpaceExhausted;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a function node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Name of the synthesized function for the node carrying this id.
    pub fn function_name(self) -> String {
        format!("function_{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out monotonically increasing node ids.
///
/// One allocator is shared by every node of an editor session. It is an
/// explicit object so tests get deterministic ids without hidden globals.
#[derive(Debug, Default)]
pub struct NodeIdAllocator {
    next: AtomicU64,
}

impl NodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting at `first` instead of zero.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns a fresh id. Ids are never reused.
    pub fn allocate(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Makes sure later allocations come after `id`.
    ///
    /// Used when nodes are restored from a document written by an earlier session.
    /// Fails for `u64::MAX`, after which no fresh id would exist.
    pub fn reserve_through(&self, id: NodeId) -> Result<(), IdSpaceExhausted> {
        let next = id.0.checked_add(1).ok_or(IdSpaceExhausted(id))?;
        self.next.fetch_max(next, Ordering::Relaxed);
        Ok(())
    }

    /// The id the next call to `allocate` will return.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_monotonic() {
        let ids = NodeIdAllocator::new();
        assert_eq!(ids.allocate(), NodeId(0));
        assert_eq!(ids.allocate(), NodeId(1));
        assert_eq!(ids.peek(), NodeId(2));
    }

    #[test]
    fn reserve_skips_restored_ids() {
        let ids = NodeIdAllocator::starting_at(3);
        ids.reserve_through(NodeId(10)).unwrap();
        assert_eq!(ids.allocate(), NodeId(11));

        // Reserving something already passed is a no-op
        ids.reserve_through(NodeId(4)).unwrap();
        assert_eq!(ids.allocate(), NodeId(12));
    }

    #[test]
    fn reserving_the_last_id_is_an_error() {
        let ids = NodeIdAllocator::starting_at(5);
        assert_eq!(
            ids.reserve_through(NodeId(u64::MAX)),
            Err(IdSpaceExhausted(NodeId(u64::MAX)))
        );
        assert_eq!(ids.peek(), NodeId(5));

        ids.reserve_through(NodeId(u64::MAX - 1)).unwrap();
        assert_eq!(ids.peek(), NodeId(u64::MAX));
    }

    #[test]
    fn function_name_is_derived_from_id() {
        assert_eq!(NodeId(7).function_name(), "function_7");
    }
}
