// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and lifecycle.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use kurbo::Rect;
use log::warn;

use super::behavior::{GeometryTransition, NodeBehavior, NodeKind};
use super::id::{INVALID, NodeId, PageId};
use super::traverse::{Children, Descendants};

/// Per-node lifecycle flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct NodeFlags {
    pub(crate) is_root: bool,
    pub(crate) on_main_tree: bool,
    pub(crate) in_destroying: bool,
    pub(crate) disappearing: bool,
    pub(crate) remove_silently: bool,
}

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Destroyed nodes are recycled via
/// a free list, and generation counters make stale handles inert: every
/// operation that receives one returns early instead of panicking.
///
/// A parent exclusively owns its ordered children. Children removed while an
/// exit transition runs move to the parent's *disappearing* list, remembered
/// with their original index, until the transition acknowledges with
/// [`remove_disappearing_child`](Self::remove_disappearing_child).
///
/// Structural removal does not free a node immediately. Unheld nodes are
/// marked `in_destroying` and queued; [`clear_pending_removals`] frees them
/// once the current layout pass is done with them.
///
/// [`clear_pending_removals`]: Self::clear_pending_removals
pub struct NodeTree {
    // -- Payload --
    pub(crate) tag: Vec<&'static str>,
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) behavior: Vec<Option<Box<dyn NodeBehavior>>>,
    pub(crate) transition: Vec<Option<Box<dyn GeometryTransition>>>,
    pub(crate) key: Vec<Option<String>>,

    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<u32>>,
    pub(crate) disappearing: Vec<Vec<(u32, usize)>>,

    // -- Propagated --
    pub(crate) depth: Vec<u32>,
    pub(crate) host_page: Vec<PageId>,

    // -- Lifecycle --
    pub(crate) flags: Vec<NodeFlags>,
    pub(crate) children_updated_from: Vec<Option<usize>>,
    pub(crate) holds: Vec<u32>,
    pub(crate) geometry: Vec<Rect>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Reporting --
    pub(crate) pending_removal: Vec<NodeId>,
    pub(crate) structure_changes: BTreeSet<NodeId>,
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("pending_removal", &self.pending_removal.len())
            .field("structure_changes", &self.structure_changes.len())
            .finish_non_exhaustive()
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tag: Vec::new(),
            kind: Vec::new(),
            behavior: Vec::new(),
            transition: Vec::new(),
            key: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
            disappearing: Vec::new(),
            depth: Vec::new(),
            host_page: Vec::new(),
            flags: Vec::new(),
            children_updated_from: Vec::new(),
            holds: Vec::new(),
            geometry: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            pending_removal: Vec::new(),
            structure_changes: BTreeSet::new(),
        }
    }

    // -- Allocation API --

    /// Creates a detached node and returns its handle.
    ///
    /// The node starts off the main tree at depth 0 on [`PageId::ROOT`], with
    /// no behavior and empty geometry.
    pub fn create_node(&mut self, tag: &'static str, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Slots are scrubbed on destroy; only the payload is new.
            let i = idx as usize;
            self.tag[i] = tag;
            self.kind[i] = kind;
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.tag.push(tag);
            self.kind.push(kind);
            self.behavior.push(None);
            self.transition.push(None);
            self.key.push(None);
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.disappearing.push(Vec::new());
            self.depth.push(0);
            self.host_page.push(PageId::ROOT);
            self.flags.push(NodeFlags::default());
            self.children_updated_from.push(None);
            self.holds.push(0);
            self.geometry.push(Rect::ZERO);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.id_at(idx)
    }

    /// Creates a root node: a frame node that is on the main tree from birth.
    pub fn create_root(&mut self, tag: &'static str) -> NodeId {
        let id = self.create_node(tag, NodeKind::Frame);
        let flags = &mut self.flags[id.idx as usize];
        flags.is_root = true;
        flags.on_main_tree = true;
        id
    }

    /// Destroys a node and its whole subtree immediately.
    ///
    /// Component state is torn down first (tracked children, then appear and
    /// destroy callbacks), then children are destroyed, then the node leaves
    /// the main tree and its parent. Stale handles are ignored.
    pub fn destroy_node(&mut self, id: NodeId) {
        let Some(i) = self.resolve(id) else {
            return;
        };
        self.teardown_component(id);
        if !self.is_alive(id) {
            return;
        }

        let mut doomed = core::mem::take(&mut self.children[i]);
        doomed.extend(self.disappearing[i].drain(..).map(|(d, _)| d));
        for child in doomed {
            // Children still point at us; clear that so they skip unlinking.
            self.parent[child as usize] = INVALID;
            self.destroy_node(self.id_at(child));
        }

        self.detach_from_main_tree(id, false);
        self.unlink_from_parent(id.idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.alive[i] = false;
        self.tag[i] = "";
        self.kind[i] = NodeKind::Syntax;
        self.behavior[i] = None;
        self.transition[i] = None;
        self.key[i] = None;
        self.depth[i] = 0;
        self.host_page[i] = PageId::ROOT;
        self.flags[i] = NodeFlags::default();
        self.children_updated_from[i] = None;
        self.holds[i] = 0;
        self.geometry[i] = Rect::ZERO;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        let i = id.idx as usize;
        id.idx < self.len && self.alive[i] && self.generation[i] == id.generation
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Payload API --

    /// Attaches a behavior object, replacing any previous one.
    pub fn set_behavior<B: NodeBehavior>(&mut self, id: NodeId, behavior: B) {
        if let Some(i) = self.resolve(id) {
            self.behavior[i] = Some(Box::new(behavior));
        }
    }

    /// Attaches a geometry transition, replacing any previous one.
    pub fn set_geometry_transition<T: GeometryTransition + 'static>(
        &mut self,
        id: NodeId,
        transition: T,
    ) {
        if let Some(i) = self.resolve(id) {
            self.transition[i] = Some(Box::new(transition));
        }
    }

    /// Sets the inspector key used by lookups such as
    /// [`disappearing_child_by_id`](Self::disappearing_child_by_id).
    pub fn set_key(&mut self, id: NodeId, key: impl Into<String>) {
        if let Some(i) = self.resolve(id) {
            self.key[i] = Some(key.into());
        }
    }

    /// Returns the inspector key, if one was set.
    #[must_use]
    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.key[self.resolve(id)?].as_deref()
    }

    /// Returns the node's type name.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&'static str> {
        Some(self.tag[self.resolve(id)?])
    }

    /// Returns the node's kind.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        Some(&self.kind[self.resolve(id)?])
    }

    /// Returns the behavior attached to `id` if it is a `T`.
    #[must_use]
    pub fn behavior<T: NodeBehavior>(&self, id: NodeId) -> Option<&T> {
        let behavior: &dyn NodeBehavior = self.behavior[self.resolve(id)?].as_deref()?;
        let any: &dyn Any = behavior;
        any.downcast_ref::<T>()
    }

    /// Returns the behavior attached to `id` mutably if it is a `T`.
    pub fn behavior_mut<T: NodeBehavior>(&mut self, id: NodeId) -> Option<&mut T> {
        let i = self.resolve(id)?;
        let behavior: &mut dyn NodeBehavior = self.behavior[i].as_deref_mut()?;
        let any: &mut dyn Any = behavior;
        any.downcast_mut::<T>()
    }

    // -- Topology API --

    /// Inserts `child` under `parent` at `slot` (clamped; `None` appends).
    ///
    /// A child that is already present is left where it is. A child that is
    /// disappearing under `parent` is revived. A child attached elsewhere is
    /// moved. Depth and host page propagate through the child's subtree, and
    /// the child joins the main tree unless `silently` is set or the parent is
    /// itself off-tree.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, slot: Option<usize>, silently: bool) {
        let (Some(p), Some(c)) = (self.resolve(parent), self.resolve(child)) else {
            return;
        };
        if self.is_ancestor_or_self(child, parent) {
            warn!("add_child: {child:?} is an ancestor of {parent:?}, ignoring");
            return;
        }
        if self.children[p].contains(&child.idx) {
            warn!("add_child: {child:?} is already a child of {parent:?}");
            return;
        }

        if let Some(pos) = self.disappearing[p].iter().position(|&(d, _)| d == child.idx) {
            self.disappearing[p].remove(pos);
            self.flags[c].disappearing = false;
        } else if self.parent[c] != INVALID {
            self.unlink_from_parent(child.idx);
        }
        if self.flags[c].in_destroying {
            self.set_subtree_in_destroying(c, false);
            self.pending_removal.retain(|&pending| pending != child);
        }

        let len = self.children[p].len();
        let pos = slot.map_or(len, |s| s.min(len));
        self.children[p].insert(pos, child.idx);
        self.parent[c] = parent.idx;
        self.note_children_updated(p, pos);

        self.set_depth(child, self.depth[p] + 1);
        self.set_host_page_id(child, self.host_page[p]);
        if self.flags[p].on_main_tree && !silently {
            self.attach_to_main_tree(child, true);
        }
        self.structure_changes.insert(parent);
    }

    /// Removes `child` from `parent`'s active children.
    ///
    /// With `allow_transition`, a child whose behavior reports an exit
    /// transition moves to the disappearing list at its original index and
    /// stays on the main tree. Otherwise it leaves the main tree and, unless
    /// something still holds it, is queued for destruction.
    ///
    /// Returns `false` if `child` was not an active child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, allow_transition: bool) -> bool {
        let (Some(p), Some(c)) = (self.resolve(parent), self.resolve(child)) else {
            return false;
        };
        let Some(pos) = self.children[p].iter().position(|&x| x == child.idx) else {
            return false;
        };

        let transitions = allow_transition
            && self.behavior[c]
                .as_ref()
                .is_some_and(|b| b.has_exit_transition());
        if transitions {
            self.children[p].remove(pos);
            self.note_children_updated(p, pos);
            self.disappearing[p].push((child.idx, pos));
            self.flags[c].disappearing = true;
            if !self.flags[c].remove_silently {
                self.structure_changes.insert(parent);
            }
            return true;
        }

        self.unlink_from_parent(child.idx);
        self.detach_from_main_tree(child, true);
        self.queue_removal_if_unheld(c);
        true
    }

    /// Acknowledges that `child`'s exit transition finished.
    ///
    /// Returns `false` if `child` was not disappearing under `parent`.
    pub fn remove_disappearing_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let (Some(p), Some(c)) = (self.resolve(parent), self.resolve(child)) else {
            return false;
        };
        let Some(pos) = self.disappearing[p].iter().position(|&(d, _)| d == child.idx) else {
            return false;
        };
        self.disappearing[p].remove(pos);
        self.flags[c].disappearing = false;
        self.parent[c] = INVALID;
        self.detach_from_main_tree(child, true);
        self.queue_removal_if_unheld(c);
        true
    }

    /// Returns whether `id` is currently waiting on an exit transition.
    #[must_use]
    pub fn is_disappearing(&self, id: NodeId) -> bool {
        self.resolve(id).is_some_and(|i| self.flags[i].disappearing)
    }

    /// Finds a disappearing child of `parent` by inspector key.
    #[must_use]
    pub fn disappearing_child_by_id(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        let p = self.resolve(parent)?;
        self.disappearing[p]
            .iter()
            .find(|&&(d, _)| self.key[d as usize].as_deref() == Some(key))
            .map(|&(d, _)| self.id_at(d))
    }

    /// Returns the disappearing children of `parent` with their original
    /// indices.
    #[must_use]
    pub fn disappearing_children(&self, parent: NodeId) -> Vec<(NodeId, usize)> {
        let Some(p) = self.resolve(parent) else {
            return Vec::new();
        };
        self.disappearing[p]
            .iter()
            .map(|&(d, pos)| (self.id_at(d), pos))
            .collect()
    }

    /// Marks `id` as joining the main tree.
    ///
    /// Returns early if it is already on the main tree. With `recursive`,
    /// descendants are attached first, so hooks fire bottom-up.
    pub fn attach_to_main_tree(&mut self, id: NodeId, recursive: bool) {
        let Some(i) = self.resolve(id) else {
            return;
        };
        if self.flags[i].on_main_tree {
            return;
        }
        if recursive {
            for child in self.subtree_children(i) {
                self.attach_to_main_tree(self.id_at(child), true);
            }
        }
        self.flags[i].on_main_tree = true;
        if let Some(b) = self.behavior[i].as_mut() {
            b.on_attach_to_main_tree(id);
        }
    }

    /// Marks `id` as leaving the main tree.
    ///
    /// Returns early if it is already off the main tree. With `recursive`,
    /// descendants are detached first.
    pub fn detach_from_main_tree(&mut self, id: NodeId, recursive: bool) {
        let Some(i) = self.resolve(id) else {
            return;
        };
        if !self.flags[i].on_main_tree {
            return;
        }
        if recursive {
            for child in self.subtree_children(i) {
                self.detach_from_main_tree(self.id_at(child), true);
            }
        }
        self.flags[i].on_main_tree = false;
        if let Some(b) = self.behavior[i].as_mut() {
            b.on_detach_from_main_tree(id);
        }
    }

    /// Sets the depth of `id` and propagates `depth + n` to its subtree.
    pub fn set_depth(&mut self, id: NodeId, depth: u32) {
        let Some(i) = self.resolve(id) else {
            return;
        };
        let mut stack = alloc::vec![(i, depth)];
        while let Some((i, depth)) = stack.pop() {
            self.depth[i] = depth;
            stack.extend(
                self.subtree_children(i)
                    .into_iter()
                    .map(|c| (c as usize, depth + 1)),
            );
        }
    }

    /// Sets the host page of `id` and its whole subtree.
    pub fn set_host_page_id(&mut self, id: NodeId, page: PageId) {
        let Some(i) = self.resolve(id) else {
            return;
        };
        let mut stack = alloc::vec![i];
        while let Some(i) = stack.pop() {
            self.host_page[i] = page;
            stack.extend(self.subtree_children(i).into_iter().map(|c| c as usize));
        }
    }

    /// Controls whether removing `id` reports a structure change on its
    /// parent.
    pub fn set_remove_silently(&mut self, id: NodeId, silently: bool) {
        if let Some(i) = self.resolve(id) {
            self.flags[i].remove_silently = silently;
        }
    }

    // -- Hold counts --

    /// Records an owning reference outside the tree (a tracked-child map, a
    /// recycle pool). Held nodes survive structural removal.
    pub fn retain(&mut self, id: NodeId) {
        if let Some(i) = self.resolve(id) {
            self.holds[i] += 1;
        }
    }

    /// Drops an owning reference. A detached node whose last hold goes away
    /// is queued for destruction.
    pub fn release(&mut self, id: NodeId) {
        let Some(i) = self.resolve(id) else {
            return;
        };
        self.holds[i] = self.holds[i].saturating_sub(1);
        if self.holds[i] == 0 && self.parent[i] == INVALID && !self.flags[i].is_root {
            self.queue_removal_if_unheld(i);
        }
    }

    /// Destroys every node queued by structural removal that was not revived
    /// in the meantime. Returns how many subtrees were destroyed.
    pub fn clear_pending_removals(&mut self) -> usize {
        let pending = core::mem::take(&mut self.pending_removal);
        let mut destroyed = 0;
        for id in pending {
            let Some(i) = self.resolve(id) else {
                continue;
            };
            if self.flags[i].in_destroying && self.parent[i] == INVALID {
                self.destroy_node(id);
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Returns whether structural removals are waiting to be destroyed.
    #[must_use]
    pub fn has_pending_removals(&self) -> bool {
        !self.pending_removal.is_empty()
    }

    /// Drains the set of nodes whose child list changed since the last call.
    pub fn take_structure_changes(&mut self) -> Vec<NodeId> {
        let changes = core::mem::take(&mut self.structure_changes);
        changes.into_iter().filter(|&id| self.is_alive(id)).collect()
    }

    // -- Queries --

    /// Returns an iterator over the active children of `id`.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        match self.resolve(id) {
            Some(i) => Children::new(self, &self.children[i]),
            None => Children::new(self, &[]),
        }
    }

    /// Returns a pre-order walk over `id` and its descendants.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants::new(self, self.resolve(id).map(|_| id.idx))
    }

    /// Returns the first active child.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children[self.resolve(id)?]
            .first()
            .map(|&c| self.id_at(c))
    }

    /// Returns the last active child.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children[self.resolve(id)?]
            .last()
            .map(|&c| self.id_at(c))
    }

    /// Returns the number of active children.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.resolve(id).map_or(0, |i| self.children[i].len())
    }

    /// Returns the parent, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let p = self.parent[self.resolve(id)?];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns the depth of `id`.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> Option<u32> {
        Some(self.depth[self.resolve(id)?])
    }

    /// Returns the page hosting `id`.
    #[must_use]
    pub fn host_page_id(&self, id: NodeId) -> Option<PageId> {
        Some(self.host_page[self.resolve(id)?])
    }

    /// Returns whether `id` is on the main tree.
    #[must_use]
    pub fn is_on_main_tree(&self, id: NodeId) -> bool {
        self.resolve(id).is_some_and(|i| self.flags[i].on_main_tree)
    }

    /// Returns whether `id` is queued for destruction.
    #[must_use]
    pub fn is_in_destroying(&self, id: NodeId) -> bool {
        self.resolve(id).is_some_and(|i| self.flags[i].in_destroying)
    }

    /// Returns whether `id` was created with [`create_root`](Self::create_root).
    #[must_use]
    pub fn is_root(&self, id: NodeId) -> bool {
        self.resolve(id).is_some_and(|i| self.flags[i].is_root)
    }

    /// Returns the lowest child index changed since the last reset.
    #[must_use]
    pub fn children_updated_from(&self, id: NodeId) -> Option<usize> {
        self.children_updated_from[self.resolve(id)?]
    }

    /// Clears the changed-children marker.
    pub fn reset_children_updated_from(&mut self, id: NodeId) {
        if let Some(i) = self.resolve(id) {
            self.children_updated_from[i] = None;
        }
    }

    /// Returns the renderable descendants one level down: frame and atomic
    /// nodes are yielded, structural and component nodes are looked through.
    #[must_use]
    pub fn flatten_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(i) = self.resolve(id) {
            self.flatten_into(i, false, &mut out);
        }
        out
    }

    /// Like [`flatten_children`](Self::flatten_children), with disappearing
    /// children included at their original index.
    #[must_use]
    pub fn flatten_children_with_transition(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(i) = self.resolve(id) {
            self.flatten_into(i, true, &mut out);
        }
        out
    }

    // -- Geometry --

    /// Returns the node's rectangle relative to its parent.
    #[must_use]
    pub fn geometry(&self, id: NodeId) -> Option<Rect> {
        Some(self.geometry[self.resolve(id)?])
    }

    /// Sets the node's rectangle relative to its parent. Returns whether it
    /// changed.
    pub fn set_geometry(&mut self, id: NodeId, rect: Rect) -> bool {
        let Some(i) = self.resolve(id) else {
            return false;
        };
        let changed = self.geometry[i] != rect;
        self.geometry[i] = rect;
        changed
    }

    /// Returns the node's rectangle in root coordinates.
    #[must_use]
    pub fn global_rect(&self, id: NodeId) -> Option<Rect> {
        let i = self.resolve(id)?;
        let mut rect = self.geometry[i];
        let mut p = self.parent[i];
        while p != INVALID {
            rect = rect + self.geometry[p as usize].origin().to_vec2();
            p = self.parent[p as usize];
        }
        Some(rect)
    }

    // -- Internal helpers --

    /// Returns the slot index if `id` is live.
    #[inline]
    pub(crate) fn resolve(&self, id: NodeId) -> Option<usize> {
        self.is_alive(id).then_some(id.idx as usize)
    }

    /// Builds the current handle for a live slot.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Active and disappearing children of a slot.
    fn subtree_children(&self, i: usize) -> Vec<u32> {
        self.children[i]
            .iter()
            .copied()
            .chain(self.disappearing[i].iter().map(|&(d, _)| d))
            .collect()
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = node.idx;
        while cur != INVALID {
            if cur == ancestor.idx {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    fn note_children_updated(&mut self, p: usize, pos: usize) {
        let from = &mut self.children_updated_from[p];
        *from = Some(from.map_or(pos, |cur| cur.min(pos)));
    }

    fn unlink_from_parent(&mut self, c: u32) {
        let ci = c as usize;
        let p = self.parent[ci];
        if p == INVALID {
            return;
        }
        let pi = p as usize;
        if let Some(pos) = self.children[pi].iter().position(|&x| x == c) {
            self.children[pi].remove(pos);
            self.note_children_updated(pi, pos);
        }
        self.disappearing[pi].retain(|&(d, _)| d != c);
        self.flags[ci].disappearing = false;
        self.parent[ci] = INVALID;
        if !self.flags[ci].remove_silently {
            self.structure_changes.insert(self.id_at(p));
        }
    }

    fn queue_removal_if_unheld(&mut self, i: usize) {
        if self.holds[i] > 0 || self.flags[i].in_destroying {
            return;
        }
        self.set_subtree_in_destroying(i, true);
        let id = self.id_at(i as u32);
        self.pending_removal.push(id);
    }

    fn set_subtree_in_destroying(&mut self, i: usize, value: bool) {
        let mut stack = alloc::vec![i];
        while let Some(i) = stack.pop() {
            self.flags[i].in_destroying = value;
            stack.extend(self.subtree_children(i).into_iter().map(|c| c as usize));
        }
    }

    fn is_renderable(&self, i: usize) -> bool {
        self.kind[i].is_frame() || self.behavior[i].as_ref().is_some_and(|b| b.is_atomic())
    }

    fn flatten_into(&self, i: usize, with_transition: bool, out: &mut Vec<NodeId>) {
        let mut order = self.children[i].clone();
        if with_transition {
            let mut gone = self.disappearing[i].clone();
            gone.sort_by_key(|&(_, pos)| pos);
            for (d, pos) in gone {
                order.insert(pos.min(order.len()), d);
            }
        }
        for c in order {
            let ci = c as usize;
            if self.is_renderable(ci) {
                out.push(self.id_at(c));
            } else {
                self.flatten_into(ci, with_transition, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<(&'static str, NodeId)>>>;

    struct Recording {
        log: Log,
        exit_transition: bool,
    }

    impl NodeBehavior for Recording {
        fn on_attach_to_main_tree(&mut self, node: NodeId) {
            self.log.borrow_mut().push(("attach", node));
        }

        fn on_detach_from_main_tree(&mut self, node: NodeId) {
            self.log.borrow_mut().push(("detach", node));
        }

        fn has_exit_transition(&self) -> bool {
            self.exit_transition
        }
    }

    struct Atomic;

    impl NodeBehavior for Atomic {
        fn is_atomic(&self) -> bool {
            true
        }
    }

    fn recording(tree: &mut NodeTree, log: &Log, exit_transition: bool) -> NodeId {
        let id = tree.create_node("Box", NodeKind::Frame);
        tree.set_behavior(
            id,
            Recording {
                log: log.clone(),
                exit_transition,
            },
        );
        id
    }

    #[test]
    fn add_and_remove_children_keep_count_consistent() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let kids: Vec<NodeId> = (0..5)
            .map(|_| tree.create_node("Box", NodeKind::Frame))
            .collect();
        for &k in &kids {
            tree.add_child(root, k, None, false);
        }
        assert!(tree.remove_child(root, kids[1], false));
        assert!(tree.remove_child(root, kids[3], false));
        assert!(!tree.remove_child(root, kids[3], false), "second removal is a no-op");

        let remaining: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(remaining, vec![kids[0], kids[2], kids[4]]);
        assert_eq!(tree.child_count(root), 3);
        assert_eq!(tree.first_child(root), Some(kids[0]));
        assert_eq!(tree.last_child(root), Some(kids[4]));
    }

    #[test]
    fn slot_insertion_is_clamped() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        let c = tree.create_node("C", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(root, b, Some(0), false);
        tree.add_child(root, c, Some(99), false);
        let order: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(order, vec![b, a, c]);
        assert_eq!(tree.children_updated_from(root), Some(0));
        tree.reset_children_updated_from(root);
        assert_eq!(tree.children_updated_from(root), None);
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(root, a, Some(0), false);
        assert_eq!(tree.child_count(root), 1);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(a, b, None, false);
        tree.add_child(b, a, None, false);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.child_count(b), 0);
    }

    #[test]
    fn depth_and_page_propagate_through_subtree() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let page = tree.create_node("Page", NodeKind::Frame);
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        tree.add_child(a, b, None, false);
        tree.set_host_page_id(page, PageId(4));
        tree.add_child(page, a, None, false);
        tree.add_child(root, page, None, false);

        assert_eq!(tree.depth(root), Some(0));
        assert_eq!(tree.depth(page), Some(1));
        assert_eq!(tree.depth(b), Some(3));
        // Page id flows down from the parent at insertion time.
        assert_eq!(tree.host_page_id(b), Some(PageId::ROOT));
        tree.set_host_page_id(page, PageId(4));
        assert_eq!(tree.host_page_id(b), Some(PageId(4)));
    }

    #[test]
    fn reparenting_moves_the_child() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let left = tree.create_node("L", NodeKind::Frame);
        let right = tree.create_node("R", NodeKind::Frame);
        let x = tree.create_node("X", NodeKind::Frame);
        tree.add_child(root, left, None, false);
        tree.add_child(root, right, None, false);
        tree.add_child(left, x, None, false);
        tree.add_child(right, x, None, false);
        assert_eq!(tree.child_count(left), 0);
        assert_eq!(tree.parent(x), Some(right));
    }

    #[test]
    fn transition_removal_parks_child_as_disappearing() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let fading = recording(&mut tree, &log, true);
        let c = tree.create_node("C", NodeKind::Frame);
        tree.set_key(fading, "fading");
        for k in [a, fading, c] {
            tree.add_child(root, k, None, false);
        }

        assert!(tree.remove_child(root, fading, true));
        assert!(tree.is_disappearing(fading));
        assert!(tree.is_on_main_tree(fading), "stays visible while it animates out");
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.disappearing_child_by_id(root, "fading"), Some(fading));
        assert_eq!(
            tree.flatten_children_with_transition(root),
            vec![a, fading, c]
        );
        assert_eq!(tree.flatten_children(root), vec![a, c]);

        assert!(tree.remove_disappearing_child(root, fading));
        assert!(!tree.is_disappearing(fading));
        assert!(!tree.is_on_main_tree(fading));
        assert_eq!(tree.parent(fading), None);
        assert!(!tree.remove_disappearing_child(root, fading));
    }

    #[test]
    fn transition_is_ignored_without_permission() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let fading = recording(&mut tree, &log, true);
        tree.add_child(root, fading, None, false);
        assert!(tree.remove_child(root, fading, false));
        assert!(!tree.is_disappearing(fading));
        assert!(tree.is_in_destroying(fading));
    }

    #[test]
    fn re_adding_a_disappearing_child_revives_it() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let fading = recording(&mut tree, &log, true);
        tree.add_child(root, fading, None, false);
        tree.remove_child(root, fading, true);
        tree.add_child(root, fading, None, false);
        assert!(!tree.is_disappearing(fading));
        assert!(tree.disappearing_children(root).is_empty());
        assert_eq!(tree.child_count(root), 1);
    }

    #[test]
    fn attach_hooks_fire_only_on_transition_bottom_up() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let parent = recording(&mut tree, &log, false);
        let child = recording(&mut tree, &log, false);
        tree.add_child(parent, child, None, false);
        assert!(log.borrow().is_empty(), "off-tree parent does not attach");

        tree.add_child(root, parent, None, false);
        assert_eq!(
            log.borrow().as_slice(),
            &[("attach", child), ("attach", parent)]
        );

        tree.attach_to_main_tree(parent, true);
        assert_eq!(log.borrow().len(), 2, "already attached is a no-op");

        tree.detach_from_main_tree(parent, true);
        tree.detach_from_main_tree(parent, true);
        assert_eq!(
            log.borrow()[2..],
            [("detach", child), ("detach", parent)]
        );
    }

    #[test]
    fn silent_add_stays_off_tree() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        tree.add_child(root, a, None, true);
        assert!(!tree.is_on_main_tree(a));
    }

    #[test]
    fn held_nodes_survive_removal() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.retain(a);
        tree.remove_child(root, a, false);
        assert!(!tree.is_in_destroying(a));
        assert_eq!(tree.clear_pending_removals(), 0);
        assert!(tree.is_alive(a));

        tree.release(a);
        assert!(tree.is_in_destroying(a));
        assert_eq!(tree.clear_pending_removals(), 1);
        assert!(!tree.is_alive(a));
    }

    #[test]
    fn pending_removal_is_cancelled_by_reattach() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(a, b, None, false);
        tree.remove_child(root, a, false);
        assert!(tree.is_in_destroying(b), "whole subtree is marked");
        tree.add_child(root, a, None, false);
        assert!(!tree.is_in_destroying(b));
        assert_eq!(tree.clear_pending_removals(), 0);
        assert!(tree.is_alive(b));
    }

    #[test]
    fn destroyed_slots_are_reused_with_new_generation() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(a, b, None, false);
        tree.destroy_node(a);
        assert!(!tree.is_alive(a));
        assert!(!tree.is_alive(b));
        assert_eq!(tree.child_count(root), 0);
        assert_eq!(tree.node_count(), 1);

        let c = tree.create_node("C", NodeKind::Frame);
        assert!(c.index() == a.index() || c.index() == b.index());
        assert_ne!(c, a);
        assert_ne!(c, b);
    }

    #[test]
    fn stale_ids_are_inert() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        tree.destroy_node(a);
        tree.add_child(root, a, None, false);
        assert!(!tree.remove_child(root, a, false));
        tree.set_depth(a, 9);
        tree.attach_to_main_tree(a, true);
        assert_eq!(tree.child_count(root), 0);
        assert_eq!(tree.depth(a), None);
        assert_eq!(tree.tag(a), None);
        assert_eq!(tree.children(a).count(), 0);
    }

    #[test]
    fn flatten_looks_through_structural_nodes() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let group = tree.create_node("If", NodeKind::Syntax);
        let inner = tree.create_node("A", NodeKind::Frame);
        let atomic = tree.create_node("Span", NodeKind::Syntax);
        let hidden = tree.create_node("B", NodeKind::Frame);
        tree.set_behavior(atomic, Atomic);
        tree.add_child(group, inner, None, false);
        tree.add_child(atomic, hidden, None, false);
        tree.add_child(root, group, None, false);
        tree.add_child(root, atomic, None, false);
        assert_eq!(tree.flatten_children(root), vec![inner, atomic]);
    }

    #[test]
    fn structure_changes_drain_once() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        assert_eq!(tree.take_structure_changes(), vec![root]);
        assert!(tree.take_structure_changes().is_empty());

        tree.set_remove_silently(a, true);
        tree.remove_child(root, a, false);
        assert!(tree.take_structure_changes().is_empty());
    }

    #[test]
    fn global_rect_accumulates_ancestor_origins() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(a, b, None, false);
        tree.set_geometry(root, Rect::new(0.0, 0.0, 400.0, 800.0));
        tree.set_geometry(a, Rect::new(10.0, 20.0, 110.0, 120.0));
        assert!(tree.set_geometry(b, Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!tree.set_geometry(b, Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert_eq!(
            tree.global_rect(b),
            Some(Rect::new(15.0, 25.0, 25.0, 35.0))
        );
    }

    #[test]
    fn typed_behavior_lookup() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let a = recording(&mut tree, &log, true);
        assert!(tree.behavior::<Recording>(a).is_some());
        assert!(tree.behavior::<Atomic>(a).is_none());
        if let Some(r) = tree.behavior_mut::<Recording>(a) {
            r.exit_transition = false;
        }
        assert!(tree.behavior::<Recording>(a).is_some_and(|r| !r.exit_transition));
    }

    #[test]
    fn descendants_walk_pre_order() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let a = tree.create_node("A", NodeKind::Frame);
        let b = tree.create_node("B", NodeKind::Frame);
        let c = tree.create_node("C", NodeKind::Frame);
        tree.add_child(root, a, None, false);
        tree.add_child(a, b, None, false);
        tree.add_child(root, c, None, false);
        assert_eq!(tree.descendants(root).collect::<Vec<_>>(), vec![root, a, b, c]);
    }
}
