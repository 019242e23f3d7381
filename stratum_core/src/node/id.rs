// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node and page identity types.

use core::fmt;

/// Sentinel value indicating "no node" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`NodeTree`](super::NodeTree).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a node is destroyed and the slot is reused. A stale
/// handle never resolves; every tree operation treats it as absent.
///
/// Handles order by slot index first, which is creation order for a fresh
/// tree. Schedulers that need parent-first order sort by depth explicitly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    /// Slot index into the tree's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the tree's generation for this slot.
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// Identifies the page (navigation destination) that hosts a subtree.
///
/// Dirty layout and render work is grouped per page and drained in ascending
/// page order.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub u32);

impl PageId {
    /// The page every root starts on.
    pub const ROOT: Self = Self(0);
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn debug_output_names_slot_and_generation() {
        let id = NodeId {
            idx: 3,
            generation: 1,
        };
        assert_eq!(format!("{id:?}"), "NodeId(3@gen1)");
        assert_eq!(format!("{:?}", PageId(7)), "PageId(7)");
    }

    #[test]
    fn ids_order_by_slot_then_generation() {
        let a = NodeId {
            idx: 1,
            generation: 5,
        };
        let b = NodeId {
            idx: 2,
            generation: 0,
        };
        assert!(a < b, "slot index dominates ordering");
        assert!(PageId::ROOT < PageId(1), "root page sorts first");
    }
}
