// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree data model.
//!
//! A *node* is an element of the UI tree. Each node has:
//!
//! - An identity ([`NodeId`]): a generational handle that becomes stale when
//!   the node is destroyed. Every query on a stale handle returns early.
//! - A [`NodeKind`]: a plain frame, a syntax placeholder, or a rebuildable
//!   [component](crate::component).
//! - Topology: an ordered child list plus the *disappearing* children kept
//!   around for exit transitions.
//! - Lifecycle flags: on the main tree, being destroyed, removed silently.
//! - Optional capability objects: a [`NodeBehavior`] (layout, paint, focus,
//!   recycle hooks) and a [`GeometryTransition`].
//!
//! Nodes live in struct-of-arrays storage inside [`NodeTree`]; parent links
//! are slot indices, never references.
//!
//! # Holds
//!
//! A node detached from its parent is queued for destruction unless
//! something [retains](NodeTree::retain) it. Components retain the children
//! they track by identifier, so a tracked child survives being unmounted.
//! [`NodeTree::clear_pending_removals`] destroys whatever is still unheld.

mod behavior;
mod id;
mod traverse;
mod tree;

pub use behavior::{GeometryTransition, NodeBehavior, NodeKind};
pub use id::{INVALID, NodeId, PageId};
pub use traverse::{Children, Descendants};
pub use tree::NodeTree;
