// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rebuildable component nodes.
//!
//! A component is a node whose children are produced by a rebuild closure.
//! Its lifecycle is a small state machine:
//!
//! ```text
//!   Constructed ──mark_need_update──► PendingRebuild ──update──► Rebuilt
//!        ▲                                                         │
//!        └─────────────────────mark_need_update────────────────────┘
//! ```
//!
//! Children the closure wants to keep across rebuilds are tracked by a
//! stable string identifier. Every rebuild starts with an empty *accessed*
//! set; looking a child up or registering it marks its identifier accessed,
//! and after the closure returns every tracked child that was not accessed is
//! torn down. Lazily realized children (from data-driven repeaters) are filed
//! under a group instead and reclaimed a group at a time.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, warn};

use crate::node::{NodeBehavior, NodeId, NodeKind, NodeTree};

/// A rebuild closure.
pub type RebuildFn = Box<dyn FnMut(&mut BuildContext<'_>)>;

/// Rebuild state carried by [`NodeKind::Component`].
pub struct ComponentNode {
    rebuild: Option<RebuildFn>,
    appear: Option<Box<dyn FnOnce()>>,
    destroy: Option<Box<dyn FnOnce()>>,
    recycle: Option<Box<dyn FnMut(NodeId)>>,
    recycle_render: Option<RebuildFn>,
    active_change: Option<Box<dyn FnMut(bool)>>,
    children_by_id: BTreeMap<String, NodeId>,
    accessed: BTreeSet<String>,
    lazy_children: BTreeMap<String, NodeId>,
    lazy_groups: BTreeMap<String, Vec<String>>,
    recycled: Vec<NodeId>,
    needs_rebuild: bool,
    appear_fired: bool,
    active: bool,
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("children_by_id", &self.children_by_id)
            .field("lazy_groups", &self.lazy_groups)
            .field("needs_rebuild", &self.needs_rebuild)
            .field("appear_fired", &self.appear_fired)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Default for ComponentNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentNode {
    /// Creates a component with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rebuild: None,
            appear: None,
            destroy: None,
            recycle: None,
            recycle_render: None,
            active_change: None,
            children_by_id: BTreeMap::new(),
            accessed: BTreeSet::new(),
            lazy_children: BTreeMap::new(),
            lazy_groups: BTreeMap::new(),
            recycled: Vec::new(),
            needs_rebuild: false,
            appear_fired: false,
            active: true,
        }
    }

    /// Sets the rebuild closure.
    #[must_use]
    pub fn with_rebuild(mut self, rebuild: impl FnMut(&mut BuildContext<'_>) + 'static) -> Self {
        self.rebuild = Some(Box::new(rebuild));
        self
    }

    /// Sets the closure fired before the first rebuild.
    #[must_use]
    pub fn with_appear(mut self, appear: impl FnOnce() + 'static) -> Self {
        self.appear = Some(Box::new(appear));
        self
    }

    /// Sets the closure fired on destruction.
    #[must_use]
    pub fn with_destroy(mut self, destroy: impl FnOnce() + 'static) -> Self {
        self.destroy = Some(Box::new(destroy));
        self
    }

    /// Sets the callback that parks the component in a recycle pool.
    #[must_use]
    pub fn with_recycle(mut self, recycle: impl FnMut(NodeId) + 'static) -> Self {
        self.recycle = Some(Box::new(recycle));
        self
    }

    /// Sets the closure notified when the component is (de)activated.
    #[must_use]
    pub fn with_active_change(mut self, change: impl FnMut(bool) + 'static) -> Self {
        self.active_change = Some(Box::new(change));
        self
    }

    /// Whether the component is waiting for a rebuild.
    #[must_use]
    pub const fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Whether the appear closure has fired.
    #[must_use]
    pub const fn appear_fired(&self) -> bool {
        self.appear_fired
    }

    /// Whether the component is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the tracked child registered under `key`.
    #[must_use]
    pub fn tracked_child(&self, key: &str) -> Option<NodeId> {
        self.children_by_id.get(key).copied()
    }

    /// Returns the tracked identifiers in sorted order.
    pub fn tracked_ids(&self) -> impl Iterator<Item = &str> {
        self.children_by_id.keys().map(String::as_str)
    }

    /// Returns the identifiers realized under a lazy group.
    #[must_use]
    pub fn lazy_group(&self, group: &str) -> Option<&[String]> {
        self.lazy_groups.get(group).map(Vec::as_slice)
    }
}

/// Components waiting for a rebuild.
///
/// Insertion is idempotent. Entries are plain handles, so a component
/// destroyed while queued simply fails to resolve when drained.
#[derive(Clone, Debug, Default)]
pub struct DirtyComponents {
    set: BTreeSet<NodeId>,
}

impl DirtyComponents {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set: BTreeSet::new(),
        }
    }

    /// Queues `id`. Returns `false` if it was already queued.
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.set.insert(id)
    }

    /// Returns whether `id` is queued.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.set.contains(&id)
    }

    /// Returns whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Number of queued components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Moves every live entry out, parents first (ascending depth, then
    /// handle).
    pub fn take_parent_first(&mut self, tree: &NodeTree) -> Vec<NodeId> {
        let mut ordered: Vec<(u32, NodeId)> = core::mem::take(&mut self.set)
            .into_iter()
            .filter_map(|id| Some((tree.depth(id)?, id)))
            .collect();
        ordered.sort_unstable();
        ordered.into_iter().map(|(_, id)| id).collect()
    }
}

/// What a rebuild closure works with.
#[derive(Debug)]
pub struct BuildContext<'a> {
    tree: &'a mut NodeTree,
    dirty: &'a mut DirtyComponents,
    node: NodeId,
}

impl<'a> BuildContext<'a> {
    /// Creates a context for rebuilding `node`.
    pub fn new(tree: &'a mut NodeTree, dirty: &'a mut DirtyComponents, node: NodeId) -> Self {
        Self { tree, dirty, node }
    }

    /// The component being rebuilt.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The node tree.
    #[must_use]
    pub fn tree(&self) -> &NodeTree {
        self.tree
    }

    /// The node tree, mutably.
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        self.tree
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, tag: &'static str, kind: NodeKind) -> NodeId {
        self.tree.create_node(tag, kind)
    }

    /// Creates a detached node with a behavior attached.
    pub fn create_with_behavior<B: NodeBehavior>(&mut self, tag: &'static str, behavior: B) -> NodeId {
        let id = self.tree.create_node(tag, NodeKind::Frame);
        self.tree.set_behavior(id, behavior);
        id
    }

    /// Creates a detached child component and queues its first rebuild.
    pub fn create_component(&mut self, tag: &'static str, state: ComponentNode) -> NodeId {
        let id = self.tree.create_component(tag, state);
        self.tree.mark_need_update(self.dirty, id);
        id
    }

    /// Appends `child` under the component unless it is already there.
    pub fn mount(&mut self, child: NodeId) {
        if self.tree.parent(child) != Some(self.node) {
            self.tree.add_child(self.node, child, None, false);
        }
    }

    /// Inserts `child` under the component at `slot`.
    pub fn mount_at(&mut self, child: NodeId, slot: usize) {
        self.tree.add_child(self.node, child, Some(slot), false);
    }

    /// Looks up a tracked child and marks it accessed; falls back to the
    /// lazy children without marking.
    pub fn get_child_by_id(&mut self, key: &str) -> Option<NodeId> {
        let state = self.tree.component_mut(self.node)?;
        if let Some(&id) = state.children_by_id.get(key) {
            state.accessed.insert(String::from(key));
            return Some(id);
        }
        state.lazy_children.get(key).copied()
    }

    /// Starts tracking `child` under `key` and marks it accessed.
    ///
    /// A different node already tracked under `key` is destroyed.
    pub fn add_child_by_id(&mut self, key: impl Into<String>, child: NodeId) {
        let key = key.into();
        let Some(state) = self.tree.component_mut(self.node) else {
            return;
        };
        state.accessed.insert(key.clone());
        let previous = state.children_by_id.insert(key, child);
        match previous {
            Some(old) if old == child => return,
            Some(old) => {
                debug!("add_child_by_id: replacing {old:?} with {child:?}");
                self.tree.destroy_node(old);
            }
            None => {}
        }
        self.tree.retain(child);
    }

    /// Returns the tracked child under `key`, creating and tracking it with
    /// `create` if absent.
    pub fn child_by_id_or_create(
        &mut self,
        key: &str,
        create: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        if let Some(id) = self.get_child_by_id(key) {
            return id;
        }
        let id = create(self);
        self.add_child_by_id(key, id);
        id
    }

    /// Files a lazily realized child under `group`.
    ///
    /// Each key is filed once per group. A different node already filed
    /// under `key` is destroyed.
    pub fn add_lazy_child(&mut self, group: &str, key: impl Into<String>, child: NodeId) {
        let key = key.into();
        let Some(state) = self.tree.component_mut(self.node) else {
            return;
        };
        let keys = state.lazy_groups.entry(String::from(group)).or_default();
        if !keys.contains(&key) {
            keys.push(key.clone());
        }
        match state.lazy_children.insert(key, child) {
            Some(old) if old == child => return,
            Some(old) => {
                debug!("add_lazy_child: replacing {old:?} with {child:?}");
                self.tree.destroy_node(old);
            }
            None => {}
        }
        self.tree.retain(child);
    }

    /// Tears down every lazy child of `group`.
    pub fn remove_child_group_by_id(&mut self, group: &str) -> bool {
        self.tree.remove_child_group_by_id(self.node, group)
    }

    /// Queues `id` for a rebuild.
    pub fn mark_need_update(&mut self, id: NodeId) -> bool {
        self.tree.mark_need_update(self.dirty, id)
    }
}

impl NodeTree {
    /// Creates a detached component node.
    pub fn create_component(&mut self, tag: &'static str, state: ComponentNode) -> NodeId {
        self.create_node(tag, NodeKind::Component(Box::new(state)))
    }

    /// Returns the component state of `id`.
    #[must_use]
    pub fn component(&self, id: NodeId) -> Option<&ComponentNode> {
        match &self.kind[self.resolve(id)?] {
            NodeKind::Component(state) => Some(state),
            _ => None,
        }
    }

    /// Returns the component state of `id` mutably.
    pub fn component_mut(&mut self, id: NodeId) -> Option<&mut ComponentNode> {
        let i = self.resolve(id)?;
        match &mut self.kind[i] {
            NodeKind::Component(state) => Some(state),
            _ => None,
        }
    }

    /// Flags a component dirty and queues it. Marking an already dirty
    /// component is a logged no-op.
    pub fn mark_need_update(&mut self, dirty: &mut DirtyComponents, id: NodeId) -> bool {
        let Some(state) = self.component_mut(id) else {
            return false;
        };
        if state.needs_rebuild {
            warn!("mark_need_update: {id:?} is already marked");
            return false;
        }
        state.needs_rebuild = true;
        dirty.insert(id);
        true
    }

    /// Rebuilds a component.
    ///
    /// Clears the dirty flag, fires appear if it never fired, resets the
    /// accessed set, runs the rebuild closure, then destroys abandoned
    /// children.
    pub fn update_component(&mut self, dirty: &mut DirtyComponents, id: NodeId) {
        let Some(state) = self.component_mut(id) else {
            return;
        };
        state.needs_rebuild = false;
        let appear = if state.appear_fired {
            None
        } else {
            state.appear_fired = true;
            state.appear.take()
        };
        state.accessed.clear();
        let rebuild = state.rebuild.take();

        if let Some(appear) = appear {
            appear();
        }
        if let Some(mut rebuild) = rebuild {
            rebuild(&mut BuildContext::new(self, dirty, id));
            if let Some(state) = self.component_mut(id) {
                state.rebuild.get_or_insert(rebuild);
            }
        }
        self.clean_up_abandoned_children(id);
    }

    /// Destroys every tracked child not accessed since the last rebuild
    /// started. Returns how many were destroyed.
    ///
    /// The accessed set is left alone, so calling this twice in a row
    /// destroys nothing the second time.
    pub fn clean_up_abandoned_children(&mut self, id: NodeId) -> usize {
        let Some(state) = self.component_mut(id) else {
            return 0;
        };
        let abandoned: Vec<String> = state
            .children_by_id
            .keys()
            .filter(|key| !state.accessed.contains(*key))
            .cloned()
            .collect();
        let doomed: Vec<NodeId> = abandoned
            .iter()
            .filter_map(|key| state.children_by_id.remove(key))
            .collect();
        for &child in &doomed {
            self.destroy_node(child);
        }
        doomed.len()
    }

    /// Destroys every lazy child filed under `group`. An unknown group is
    /// logged and ignored.
    pub fn remove_child_group_by_id(&mut self, id: NodeId, group: &str) -> bool {
        let Some(state) = self.component_mut(id) else {
            return false;
        };
        let Some(keys) = state.lazy_groups.remove(group) else {
            warn!("remove_child_group_by_id: {id:?} has no group {group:?}");
            return false;
        };
        let doomed: Vec<NodeId> = keys
            .iter()
            .filter_map(|key| state.lazy_children.remove(key))
            .collect();
        for child in doomed {
            self.destroy_node(child);
        }
        true
    }

    /// Parks a component: notifies every descendant behavior, remembers
    /// them for reuse, then invokes the recycle callback.
    pub fn fire_recycle_self(&mut self, id: NodeId) {
        if self.component(id).is_none() {
            return;
        }
        let mut recycled = Vec::new();
        let descendants: Vec<NodeId> = self.descendants(id).skip(1).collect();
        for node in descendants {
            let i = node.idx as usize;
            if let Some(b) = self.behavior[i].as_mut() {
                b.on_recycle(node);
                recycled.push(node);
            }
        }
        if let Some(state) = self.component_mut(id) {
            state.recycled = recycled;
            if let Some(recycle) = state.recycle.as_mut() {
                recycle(id);
            }
        }
    }

    /// Captures the closure that refreshes a recycled component on reuse.
    pub fn set_recycle_render_func(
        &mut self,
        id: NodeId,
        render: impl FnMut(&mut BuildContext<'_>) + 'static,
    ) {
        if let Some(state) = self.component_mut(id) {
            state.recycle_render = Some(Box::new(render));
        }
    }

    /// Runs and discards the recycle-render closure, then notifies every
    /// behavior recorded by [`fire_recycle_self`](Self::fire_recycle_self).
    ///
    /// A second call without a new closure does nothing.
    pub fn fire_recycle_render_func(&mut self, dirty: &mut DirtyComponents, id: NodeId) {
        let Some(mut render) = self.component_mut(id).and_then(|s| s.recycle_render.take()) else {
            return;
        };
        render(&mut BuildContext::new(self, dirty, id));
        let recycled = self
            .component_mut(id)
            .map(|s| core::mem::take(&mut s.recycled))
            .unwrap_or_default();
        for node in recycled {
            if let Some(i) = self.resolve(node)
                && let Some(b) = self.behavior[i].as_mut()
            {
                b.on_reuse(node);
            }
        }
    }

    /// Activates or deactivates a component, notifying its active-change
    /// closure on an actual change.
    pub fn set_active(&mut self, id: NodeId, active: bool) {
        let Some(state) = self.component_mut(id) else {
            return;
        };
        if state.active == active {
            return;
        }
        state.active = active;
        if let Some(change) = state.active_change.as_mut() {
            change(active);
        }
    }

    /// Tears down component state ahead of node destruction: tracked and
    /// lazy children first, then appear (if it never fired) and destroy.
    pub(crate) fn teardown_component(&mut self, id: NodeId) {
        let Some(state) = self.component_mut(id) else {
            return;
        };
        let mut tracked: Vec<NodeId> = core::mem::take(&mut state.children_by_id)
            .into_values()
            .collect();
        tracked.extend(core::mem::take(&mut state.lazy_children).into_values());
        state.lazy_groups.clear();
        state.accessed.clear();
        state.recycle_render = None;
        let appear = if state.appear_fired {
            None
        } else {
            state.appear_fired = true;
            state.appear.take()
        };
        let destroy = state.destroy.take();

        for child in tracked {
            self.destroy_node(child);
        }
        if let Some(appear) = appear {
            appear();
        }
        if let Some(destroy) = destroy {
            destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    type Events = Rc<RefCell<Vec<&'static str>>>;

    fn text(cx: &mut BuildContext<'_>) -> NodeId {
        cx.create_node("Text", NodeKind::Frame)
    }

    fn mounted(tree: &mut NodeTree, state: ComponentNode) -> (NodeId, NodeId) {
        let root = tree.create_root("root");
        let id = tree.create_component("View", state);
        tree.add_child(root, id, None, false);
        (root, id)
    }

    #[test]
    fn marking_twice_is_a_no_op() {
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let (_, view) = mounted(&mut tree, ComponentNode::new());
        assert!(tree.mark_need_update(&mut dirty, view));
        assert!(!tree.mark_need_update(&mut dirty, view));
        assert_eq!(dirty.len(), 1);
        assert!(tree.component(view).is_some_and(ComponentNode::needs_rebuild));

        let plain = tree.create_node("Box", NodeKind::Frame);
        assert!(!tree.mark_need_update(&mut dirty, plain));
    }

    #[test]
    fn update_fires_appear_once_and_rebuilds() {
        let events = Events::default();
        let (e1, e2) = (events.clone(), events.clone());
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new()
            .with_appear(move || e1.borrow_mut().push("appear"))
            .with_rebuild(move |_| e2.borrow_mut().push("rebuild"));
        let (_, view) = mounted(&mut tree, state);

        tree.mark_need_update(&mut dirty, view);
        tree.update_component(&mut dirty, view);
        tree.mark_need_update(&mut dirty, view);
        tree.update_component(&mut dirty, view);
        assert_eq!(events.borrow().as_slice(), &["appear", "rebuild", "rebuild"]);
        assert!(tree.component(view).is_some_and(|s| !s.needs_rebuild()));
    }

    #[test]
    fn missing_rebuild_yields_no_children() {
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let (_, view) = mounted(&mut tree, ComponentNode::new());
        tree.update_component(&mut dirty, view);
        assert_eq!(tree.child_count(view), 0);
    }

    #[test]
    fn children_not_accessed_are_destroyed() {
        let pass = Rc::new(Cell::new(0));
        let p = pass.clone();
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new().with_rebuild(move |cx| {
            p.set(p.get() + 1);
            let x = cx.child_by_id_or_create("X", text);
            cx.mount(x);
            if p.get() == 1 {
                let y = cx.child_by_id_or_create("Y", text);
                cx.mount(y);
            }
        });
        let (_, view) = mounted(&mut tree, state);

        tree.update_component(&mut dirty, view);
        let x = tree.component(view).and_then(|s| s.tracked_child("X"));
        let y = tree.component(view).and_then(|s| s.tracked_child("Y"));
        let (Some(x), Some(y)) = (x, y) else {
            panic!("first pass tracks X and Y");
        };
        assert_eq!(tree.children(view).collect::<Vec<_>>(), vec![x, y]);

        tree.update_component(&mut dirty, view);
        assert!(tree.is_alive(x));
        assert!(!tree.is_alive(y));
        let ids: Vec<&str> = tree.component(view).map_or(vec![], |s| s.tracked_ids().collect());
        assert_eq!(ids, vec!["X"]);
        assert_eq!(tree.children(view).collect::<Vec<_>>(), vec![x]);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new().with_rebuild(|cx| {
            let a = cx.child_by_id_or_create("a", text);
            cx.mount(a);
        });
        let (_, view) = mounted(&mut tree, state);
        tree.update_component(&mut dirty, view);
        let before = tree.node_count();
        assert_eq!(tree.clean_up_abandoned_children(view), 0);
        assert_eq!(tree.clean_up_abandoned_children(view), 0);
        assert_eq!(tree.node_count(), before);
    }

    #[test]
    fn lazy_groups_are_reclaimed_together() {
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new().with_rebuild(|cx| {
            for key in ["row-0", "row-1"] {
                if cx.get_child_by_id(key).is_none() {
                    let row = text(cx);
                    cx.add_lazy_child("page-0", key, row);
                    cx.mount(row);
                }
            }
        });
        let (_, view) = mounted(&mut tree, state);
        tree.update_component(&mut dirty, view);
        tree.update_component(&mut dirty, view);
        assert_eq!(tree.child_count(view), 2, "lazy children survive cleanup");
        assert_eq!(
            tree.component(view).and_then(|s| s.lazy_group("page-0")).map(<[String]>::len),
            Some(2)
        );

        assert!(tree.remove_child_group_by_id(view, "page-0"));
        assert_eq!(tree.child_count(view), 0);
        assert!(!tree.remove_child_group_by_id(view, "page-0"));
    }

    #[test]
    fn refiling_a_lazy_key_replaces_the_old_node() {
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let (_, view) = mounted(&mut tree, ComponentNode::new());
        let a = tree.create_node("Text", NodeKind::Frame);
        let b = tree.create_node("Text", NodeKind::Frame);
        {
            let mut cx = BuildContext::new(&mut tree, &mut dirty, view);
            cx.add_lazy_child("page-0", "row-0", a);
            cx.add_lazy_child("page-0", "row-0", a);
            assert_eq!(cx.get_child_by_id("row-0"), Some(a));
            cx.add_lazy_child("page-0", "row-0", b);
            assert_eq!(cx.get_child_by_id("row-0"), Some(b));
        }
        assert!(!tree.is_alive(a), "replaced node is destroyed");
        assert_eq!(
            tree.component(view).and_then(|s| s.lazy_group("page-0")).map(<[String]>::len),
            Some(1)
        );

        assert!(tree.remove_child_group_by_id(view, "page-0"));
        assert!(!tree.is_alive(b));
    }

    #[test]
    fn destroy_pairs_appear_and_tears_down_children_first() {
        let events = Events::default();
        let (e1, e2) = (events.clone(), events.clone());
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new()
            .with_appear(move || e1.borrow_mut().push("appear"))
            .with_destroy(move || e2.borrow_mut().push("destroy"));
        let (_, view) = mounted(&mut tree, state);

        let unmounted = tree.create_node("Text", NodeKind::Frame);
        BuildContext::new(&mut tree, &mut dirty, view).add_child_by_id("t", unmounted);

        tree.destroy_node(view);
        assert_eq!(events.borrow().as_slice(), &["appear", "destroy"]);
        assert!(!tree.is_alive(unmounted));
        assert!(!tree.is_alive(view));
    }

    #[test]
    fn destroy_after_appear_fires_destroy_only() {
        let events = Events::default();
        let (e1, e2) = (events.clone(), events.clone());
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new()
            .with_appear(move || e1.borrow_mut().push("appear"))
            .with_destroy(move || e2.borrow_mut().push("destroy"));
        let (root, view) = mounted(&mut tree, state);
        tree.update_component(&mut dirty, view);
        tree.remove_child(root, view, false);
        tree.clear_pending_removals();
        assert_eq!(events.borrow().as_slice(), &["appear", "destroy"]);
    }

    struct Reusable(Events);

    impl NodeBehavior for Reusable {
        fn on_recycle(&mut self, _node: NodeId) {
            self.0.borrow_mut().push("recycle");
        }

        fn on_reuse(&mut self, _node: NodeId) {
            self.0.borrow_mut().push("reuse");
        }
    }

    #[test]
    fn recycle_then_reuse() {
        let events = Events::default();
        let (e1, e2, e3) = (events.clone(), events.clone(), events.clone());
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let state = ComponentNode::new()
            .with_rebuild(move |cx| {
                let leaf = cx.child_by_id_or_create("leaf", |cx| {
                    cx.create_with_behavior("Image", Reusable(e1.clone()))
                });
                cx.mount(leaf);
            })
            .with_recycle(move |_| e2.borrow_mut().push("pooled"));
        let (_, view) = mounted(&mut tree, state);
        tree.update_component(&mut dirty, view);

        tree.fire_recycle_self(view);
        assert_eq!(events.borrow().as_slice(), &["recycle", "pooled"]);

        tree.set_recycle_render_func(view, move |_| e3.borrow_mut().push("render"));
        tree.fire_recycle_render_func(&mut dirty, view);
        tree.fire_recycle_render_func(&mut dirty, view);
        assert_eq!(
            events.borrow().as_slice(),
            &["recycle", "pooled", "render", "reuse"]
        );
    }

    #[test]
    fn active_change_fires_on_transitions_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let mut tree = NodeTree::new();
        let state = ComponentNode::new().with_active_change(move |a| s.borrow_mut().push(a));
        let (_, view) = mounted(&mut tree, state);
        tree.set_active(view, true);
        tree.set_active(view, false);
        tree.set_active(view, false);
        tree.set_active(view, true);
        assert_eq!(seen.borrow().as_slice(), &[false, true]);
    }

    #[test]
    fn drain_orders_parents_first_and_drops_stale() {
        let mut tree = NodeTree::new();
        let mut dirty = DirtyComponents::new();
        let (_, outer) = mounted(&mut tree, ComponentNode::new());
        let inner = tree.create_component("Inner", ComponentNode::new());
        let gone = tree.create_component("Gone", ComponentNode::new());
        tree.add_child(outer, inner, None, false);
        dirty.insert(inner);
        dirty.insert(outer);
        dirty.insert(gone);
        tree.destroy_node(gone);
        assert_eq!(dirty.take_parent_first(&tree), vec![outer, inner]);
        assert!(dirty.is_empty());
    }
}
