// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-change categories.
//!
//! Callers describe *what* changed on a node; the
//! [`TaskScheduler`](crate::scheduler::TaskScheduler) decides which dirty
//! set that invalidates:
//!
//! - [`MEASURE`](PropertyChange::MEASURE) and
//!   [`LAYOUT`](PropertyChange::LAYOUT) queue the node for layout. A layout
//!   that moves or resizes the node queues it for render in turn.
//! - [`RENDER`](PropertyChange::RENDER) queues the node for render only.
//!
//! Structural changes (children added or removed) are reported by the
//! [`NodeTree`](crate::node::NodeTree) itself and forwarded by the frame
//! driver as layout work on the parent.

use core::ops::{BitOr, BitOrAssign};

/// A set of property-change categories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertyChange(u8);

impl PropertyChange {
    /// Nothing changed.
    pub const NONE: Self = Self(0);
    /// Intrinsic size changed; requires measuring again.
    pub const MEASURE: Self = Self(1 << 0);
    /// Position within the parent changed.
    pub const LAYOUT: Self = Self(1 << 1);
    /// Paint-only properties changed.
    pub const RENDER: Self = Self(1 << 2);

    /// Returns whether every category in `other` is in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns whether the change invalidates layout.
    #[inline]
    #[must_use]
    pub const fn needs_layout(self) -> bool {
        self.0 & (Self::MEASURE.0 | Self::LAYOUT.0) != 0
    }

    /// Returns whether no category is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropertyChange {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyChange {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
