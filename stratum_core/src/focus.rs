// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred focus requests.
//!
//! Focus changes requested during a frame are parked in three slots and
//! serviced once, after layout, by the frame driver. At most one request wins
//! per frame, in priority order: default focus, then node, then scope.

use log::debug;

use crate::node::{NodeId, NodeTree};

/// How a node participates in focus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FocusKind {
    /// Never takes focus.
    #[default]
    Disabled,
    /// Takes focus itself.
    Node,
    /// Takes focus and routes it among its descendants.
    Scope,
}

/// Which slot a request was parked in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FocusSlot {
    /// The page's default-focus node.
    DefaultFocus,
    /// A specific node.
    Node,
    /// A focus scope.
    Scope,
}

/// Pending focus requests, one per slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct FocusRequests {
    default_focus: Option<NodeId>,
    node: Option<NodeId>,
    scope: Option<NodeId>,
}

impl FocusRequests {
    /// Creates an empty request set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_focus: None,
            node: None,
            scope: None,
        }
    }

    /// Parks a request, replacing any earlier request in the same slot.
    pub fn request(&mut self, slot: FocusSlot, id: NodeId) {
        *self.slot_mut(slot) = Some(id);
    }

    /// Returns the request parked in `slot`.
    #[must_use]
    pub const fn pending(&self, slot: FocusSlot) -> Option<NodeId> {
        match slot {
            FocusSlot::DefaultFocus => self.default_focus,
            FocusSlot::Node => self.node,
            FocusSlot::Scope => self.scope,
        }
    }

    /// Returns whether no request is parked.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.default_focus.is_none() && self.node.is_none() && self.scope.is_none()
    }

    /// Services at most one request.
    ///
    /// Slots are tried in priority order. A slot whose node is stale, off the
    /// main tree, being destroyed, or of the wrong focus kind is cleared and
    /// the next slot is tried. Servicing a request clears all three slots.
    pub fn flush(&mut self, tree: &mut NodeTree) -> Option<(FocusSlot, NodeId)> {
        for slot in [FocusSlot::DefaultFocus, FocusSlot::Node, FocusSlot::Scope] {
            let Some(id) = self.slot_mut(slot).take() else {
                continue;
            };
            if !eligible(tree, slot, id) {
                debug!("focus: dropping {slot:?} request for {id:?}");
                continue;
            }
            if let Some(i) = tree.resolve(id)
                && let Some(b) = tree.behavior[i].as_mut()
            {
                b.on_focus(id);
            }
            *self = Self::new();
            return Some((slot, id));
        }
        None
    }

    fn slot_mut(&mut self, slot: FocusSlot) -> &mut Option<NodeId> {
        match slot {
            FocusSlot::DefaultFocus => &mut self.default_focus,
            FocusSlot::Node => &mut self.node,
            FocusSlot::Scope => &mut self.scope,
        }
    }
}

fn eligible(tree: &NodeTree, slot: FocusSlot, id: NodeId) -> bool {
    let Some(i) = tree.resolve(id) else {
        return false;
    };
    if !tree.flags[i].on_main_tree || tree.flags[i].in_destroying {
        return false;
    }
    let kind = tree.behavior[i]
        .as_ref()
        .map_or(FocusKind::Disabled, |b| b.focus_kind());
    match slot {
        FocusSlot::DefaultFocus | FocusSlot::Node => kind != FocusKind::Disabled,
        FocusSlot::Scope => kind == FocusKind::Scope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeBehavior, NodeKind};
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    struct Focusable {
        kind: FocusKind,
        focused: Rc<RefCell<Vec<NodeId>>>,
    }

    impl NodeBehavior for Focusable {
        fn focus_kind(&self) -> FocusKind {
            self.kind
        }

        fn on_focus(&mut self, node: NodeId) {
            self.focused.borrow_mut().push(node);
        }
    }

    fn focusable(
        tree: &mut NodeTree,
        root: NodeId,
        kind: FocusKind,
        focused: &Rc<RefCell<Vec<NodeId>>>,
    ) -> NodeId {
        let id = tree.create_node("Button", NodeKind::Frame);
        tree.set_behavior(
            id,
            Focusable {
                kind,
                focused: focused.clone(),
            },
        );
        tree.add_child(root, id, None, false);
        id
    }

    #[test]
    fn default_focus_wins_and_clears_all_slots() {
        let focused = Rc::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = focusable(&mut tree, root, FocusKind::Node, &focused);
        let b = focusable(&mut tree, root, FocusKind::Node, &focused);
        let s = focusable(&mut tree, root, FocusKind::Scope, &focused);

        let mut requests = FocusRequests::new();
        requests.request(FocusSlot::Node, b);
        requests.request(FocusSlot::Scope, s);
        requests.request(FocusSlot::DefaultFocus, a);

        assert_eq!(requests.flush(&mut tree), Some((FocusSlot::DefaultFocus, a)));
        assert!(requests.is_empty());
        assert_eq!(focused.borrow().as_slice(), &[a]);
        assert_eq!(requests.flush(&mut tree), None);
    }

    #[test]
    fn stale_and_ineligible_slots_fall_through() {
        let focused = Rc::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let gone = focusable(&mut tree, root, FocusKind::Node, &focused);
        let plain = focusable(&mut tree, root, FocusKind::Node, &focused);
        let scope = focusable(&mut tree, root, FocusKind::Scope, &focused);
        tree.destroy_node(gone);

        let mut requests = FocusRequests::new();
        requests.request(FocusSlot::DefaultFocus, gone);
        // A plain node cannot service a scope request, but scope is last.
        requests.request(FocusSlot::Node, scope);
        requests.request(FocusSlot::Scope, plain);

        assert_eq!(requests.flush(&mut tree), Some((FocusSlot::Node, scope)));
        assert_eq!(requests.pending(FocusSlot::Scope), None);
    }

    #[test]
    fn disabled_and_off_tree_nodes_are_skipped() {
        let focused = Rc::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let disabled = focusable(&mut tree, root, FocusKind::Disabled, &focused);
        let detached = tree.create_node("Button", NodeKind::Frame);
        tree.set_behavior(
            detached,
            Focusable {
                kind: FocusKind::Node,
                focused: focused.clone(),
            },
        );

        let mut requests = FocusRequests::new();
        requests.request(FocusSlot::DefaultFocus, disabled);
        requests.request(FocusSlot::Node, detached);
        assert_eq!(requests.flush(&mut tree), None);
        assert!(requests.is_empty());
        assert!(focused.borrow().is_empty());
    }
}
