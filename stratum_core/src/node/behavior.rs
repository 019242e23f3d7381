// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node behavior capabilities.
//!
//! The tree owns structure; everything a node *does* (measure itself, produce
//! paint work, react to lifecycle transitions, take focus) is reached through
//! a [`NodeBehavior`] trait object attached to the node. Every method has a
//! default, so a behavior only overrides what it participates in.

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

use kurbo::Rect;

use super::id::NodeId;
use crate::component::ComponentNode;
use crate::focus::FocusKind;
use crate::scheduler::RenderTask;

/// What kind of node a slot holds.
///
/// Frame nodes are renderable; syntax nodes (conditionals, repeaters) only
/// group children; component nodes carry rebuild state and are transparent
/// to rendering like syntax nodes.
pub enum NodeKind {
    /// A renderable node with geometry.
    Frame,
    /// A structural grouping node with no visual presence.
    Syntax,
    /// A rebuildable component.
    Component(Box<ComponentNode>),
}

impl NodeKind {
    /// Returns whether this is a [`NodeKind::Frame`].
    #[inline]
    #[must_use]
    pub const fn is_frame(&self) -> bool {
        matches!(self, Self::Frame)
    }

    /// Returns whether this is a [`NodeKind::Component`].
    #[inline]
    #[must_use]
    pub const fn is_component(&self) -> bool {
        matches!(self, Self::Component(_))
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame => f.write_str("Frame"),
            Self::Syntax => f.write_str("Syntax"),
            Self::Component(state) => f.debug_tuple("Component").field(state).finish(),
        }
    }
}

/// Behavior object attached to a node.
///
/// The trait is object-safe and `Any`-based so that
/// [`NodeTree::behavior`](super::NodeTree::behavior) can recover the concrete
/// type; that lookup is the only downcast in the crate.
pub trait NodeBehavior: Any {
    /// Whether this node stands in for its whole subtree when flattening
    /// renderable children.
    fn is_atomic(&self) -> bool {
        false
    }

    /// Lays the node out and returns its new geometry, or `None` to keep
    /// `current`.
    ///
    /// `force_main_thread` is set when the caller needs the result before
    /// returning (for example an extra pass for a geometry transition).
    fn layout(&mut self, node: NodeId, current: Rect, force_main_thread: bool) -> Option<Rect> {
        _ = (node, current, force_main_thread);
        None
    }

    /// Produces the paint work for this node, if any.
    fn create_render_task(&mut self, node: NodeId) -> Option<RenderTask> {
        _ = node;
        None
    }

    /// Called when the node transitions onto the main tree.
    fn on_attach_to_main_tree(&mut self, node: NodeId) {
        _ = node;
    }

    /// Called when the node transitions off the main tree.
    fn on_detach_from_main_tree(&mut self, node: NodeId) {
        _ = node;
    }

    /// Whether removing this node should wait for an exit transition.
    fn has_exit_transition(&self) -> bool {
        false
    }

    /// Called when the owning component is parked in a recycle pool.
    fn on_recycle(&mut self, node: NodeId) {
        _ = node;
    }

    /// Called when a recycled component is brought back into use.
    fn on_reuse(&mut self, node: NodeId) {
        _ = node;
    }

    /// How this node participates in focus.
    fn focus_kind(&self) -> FocusKind {
        FocusKind::Disabled
    }

    /// Called when a focus request for this node is serviced.
    fn on_focus(&mut self, node: NodeId) {
        _ = node;
    }
}

/// Geometry transition attached to a node.
///
/// After a layout pass the scheduler asks every transition whether the
/// candidate geometry requires an additional pass (for example a shared
/// element that must re-measure against its counterpart).
pub trait GeometryTransition {
    /// Returns `true` if `node` must be laid out once more this frame.
    fn needs_additional_layout(&mut self, node: NodeId, candidate: Rect) -> bool;
}
