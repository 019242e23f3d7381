// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-phase layout and render task draining.
//!
//! The [`TaskScheduler`] collects nodes whose layout or paint output is stale,
//! grouped per [`PageId`], and drains them once per frame:
//!
//! ```text
//!   dirty layout ──► flush_layout_task ──► [extra pass if a geometry
//!                                           transition asks for one]
//!                                               │
//!        after-layout hooks ◄───────────────────┘
//!        persist-after-layout hooks
//!        clear pending removals
//!                                               │
//!   dirty render ──► flush_render_task ◄────────┘
//! ```
//!
//! Every drain moves its queue out before iterating. Work enqueued while a
//! drain runs (a render task marking a node layout-dirty, a hook adding a
//! hook) lands in the next drain, never the current one.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use log::warn;

use crate::backend::{TaskExecutor, TaskThread};
use crate::dirty::PropertyChange;
use crate::node::{NodeId, NodeTree, PageId};
use crate::time::HostTime;

/// Mutable access handed to hooks and UI-thread render tasks.
#[derive(Debug)]
pub struct TaskContext<'a> {
    /// The node tree.
    pub tree: &'a mut NodeTree,
    /// The scheduler, for enqueueing follow-up work.
    pub scheduler: &'a mut TaskScheduler,
}

/// A one-shot hook run with a [`TaskContext`].
pub type TaskFn = Box<dyn FnOnce(&mut TaskContext<'_>)>;

/// A hook kept across frames, run after every layout drain.
pub type PersistTaskFn = Box<dyn FnMut(&mut TaskContext<'_>)>;

/// An idle-time hook; receives the idle deadline and whether long tasks are
/// allowed before it.
pub type PredictTaskFn = Box<dyn FnOnce(&mut TaskContext<'_>, HostTime, bool)>;

/// Paint work produced by a node's behavior.
pub enum RenderTask {
    /// Must run on the UI thread with access to the tree.
    Ui(TaskFn),
    /// May run on the background context.
    Background(Box<dyn FnOnce()>),
}

impl fmt::Debug for RenderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ui(_) => f.write_str("RenderTask::Ui"),
            Self::Background(_) => f.write_str("RenderTask::Background"),
        }
    }
}

type DirtyMap = BTreeMap<PageId, BTreeSet<NodeId>>;

/// Collects and drains per-page layout and render work plus frame hooks.
#[derive(Default)]
pub struct TaskScheduler {
    dirty_layout: DirtyMap,
    dirty_render: DirtyMap,
    after_layout: Vec<TaskFn>,
    persist_after_layout: Vec<PersistTaskFn>,
    after_render: Vec<TaskFn>,
    predict: Vec<PredictTaskFn>,
    executor: Option<Rc<dyn TaskExecutor>>,
    last_laid_out: Vec<NodeId>,
    last_layout_count: usize,
    last_render_count: usize,
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("dirty_layout", &self.dirty_layout)
            .field("dirty_render", &self.dirty_render)
            .field("after_layout", &self.after_layout.len())
            .field("persist_after_layout", &self.persist_after_layout.len())
            .field("after_render", &self.after_render.len())
            .field("predict", &self.predict.len())
            .finish_non_exhaustive()
    }
}

impl TaskScheduler {
    /// Creates an empty scheduler with no executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the executor background render tasks are posted to.
    pub fn set_executor(&mut self, executor: Rc<dyn TaskExecutor>) {
        self.executor = Some(executor);
    }

    // -- Dirty sets --

    /// Queues `id` for layout on its host page. Returns `false` if it was
    /// already queued or the handle is stale.
    pub fn add_dirty_layout_node(&mut self, tree: &NodeTree, id: NodeId) -> bool {
        let Some(page) = tree.host_page_id(id) else {
            return false;
        };
        self.dirty_layout.entry(page).or_default().insert(id)
    }

    /// Queues `id` for render on its host page. A duplicate insert is logged
    /// and returns `false`.
    pub fn add_dirty_render_node(&mut self, tree: &NodeTree, id: NodeId) -> bool {
        let Some(page) = tree.host_page_id(id) else {
            return false;
        };
        let inserted = self.dirty_render.entry(page).or_default().insert(id);
        if !inserted {
            warn!("add_dirty_render_node: {id:?} is already queued on {page:?}");
        }
        inserted
    }

    /// Routes a property change to the dirty sets it invalidates.
    pub fn mark_node_dirty(&mut self, tree: &NodeTree, id: NodeId, change: PropertyChange) {
        if change.needs_layout() {
            self.add_dirty_layout_node(tree, id);
        }
        if change.contains(PropertyChange::RENDER) {
            self.insert_render_quietly(tree, id);
        }
    }

    // -- Drains --

    /// Lays out every queued node, page by page, parents first.
    ///
    /// The whole queue is moved out first. Stale and `in_destroying` nodes are
    /// skipped. A node whose geometry changes is queued for render. Returns
    /// the number of nodes laid out.
    pub fn flush_layout_task(&mut self, tree: &mut NodeTree, force_main_thread: bool) -> usize {
        self.last_laid_out.clear();
        let dirty = core::mem::take(&mut self.dirty_layout);
        for (_, nodes) in dirty {
            for id in parent_first(tree, nodes) {
                let Some(i) = tree.resolve(id) else {
                    continue;
                };
                if tree.flags[i].in_destroying {
                    continue;
                }
                let current = tree.geometry[i];
                let next = tree.behavior[i]
                    .as_mut()
                    .and_then(|b| b.layout(id, current, force_main_thread));
                self.last_laid_out.push(id);
                if let Some(rect) = next
                    && rect != current
                {
                    tree.geometry[i] = rect;
                    self.insert_render_quietly(tree, id);
                }
            }
        }
        self.last_layout_count = self.last_laid_out.len();
        self.last_layout_count
    }

    /// Asks geometry transitions whether another layout pass is needed.
    ///
    /// Candidates are the nodes laid out by the preceding pass plus anything
    /// queued since, regrouped per page. Every node whose transition answers
    /// yes is queued again; the result is the OR over all answers.
    pub fn need_additional_layout(&mut self, tree: &mut NodeTree) -> bool {
        let mut candidates: DirtyMap = BTreeMap::new();
        for &id in &self.last_laid_out {
            if let Some(page) = tree.host_page_id(id) {
                candidates.entry(page).or_default().insert(id);
            }
        }
        for (page, nodes) in &self.dirty_layout {
            candidates.entry(*page).or_default().extend(nodes.iter().copied());
        }

        let mut needed = false;
        for (page, nodes) in candidates {
            for id in nodes {
                let Some(i) = tree.resolve(id) else {
                    continue;
                };
                let candidate = tree.geometry[i];
                if let Some(t) = tree.transition[i].as_mut()
                    && t.needs_additional_layout(id, candidate)
                {
                    needed = true;
                    self.dirty_layout.entry(page).or_default().insert(id);
                }
            }
        }
        needed
    }

    /// Produces and dispatches render work for every queued node.
    ///
    /// UI tasks run immediately. Background tasks are posted to the
    /// executor, or run inline when `force_main_thread` is set or no executor
    /// is installed. Returns the number of nodes visited.
    pub fn flush_render_task(&mut self, tree: &mut NodeTree, force_main_thread: bool) -> usize {
        let dirty = core::mem::take(&mut self.dirty_render);
        let mut visited = 0;
        for (_, nodes) in dirty {
            for id in parent_first(tree, nodes) {
                let Some(i) = tree.resolve(id) else {
                    continue;
                };
                if tree.flags[i].in_destroying {
                    continue;
                }
                visited += 1;
                let Some(task) = tree.behavior[i]
                    .as_mut()
                    .and_then(|b| b.create_render_task(id))
                else {
                    continue;
                };
                match task {
                    RenderTask::Ui(run) => run(&mut TaskContext {
                        tree: &mut *tree,
                        scheduler: &mut *self,
                    }),
                    RenderTask::Background(run) => match self.executor.clone() {
                        Some(executor) if !force_main_thread => {
                            executor.post_task(TaskThread::Background, run);
                        }
                        _ => run(),
                    },
                }
            }
        }
        self.last_render_count = visited;
        visited
    }

    /// Runs one full layout-then-render cycle.
    ///
    /// Layout, an extra forced layout pass if any geometry transition asks
    /// for one, after-layout hooks, persist-after-layout hooks, pending
    /// removals, then render.
    pub fn flush_task(&mut self, tree: &mut NodeTree) {
        let mut laid_out = self.flush_layout_task(tree, false);
        if self.need_additional_layout(tree) {
            laid_out += self.flush_layout_task(tree, true);
        }
        self.last_layout_count = laid_out;
        self.flush_after_layout_task(tree);
        self.flush_persist_after_layout_task(tree);
        tree.clear_pending_removals();
        self.flush_render_task(tree, false);
    }

    // -- Hooks --

    /// Queues a hook for after the next layout drain.
    pub fn add_after_layout_task(&mut self, task: impl FnOnce(&mut TaskContext<'_>) + 'static) {
        self.after_layout.push(Box::new(task));
    }

    /// Registers a hook that runs after every layout drain.
    pub fn add_persist_after_layout_task(
        &mut self,
        task: impl FnMut(&mut TaskContext<'_>) + 'static,
    ) {
        self.persist_after_layout.push(Box::new(task));
    }

    /// Queues a hook for after the next render drain.
    pub fn add_after_render_task(&mut self, task: impl FnOnce(&mut TaskContext<'_>) + 'static) {
        self.after_render.push(Box::new(task));
    }

    /// Queues an idle-time hook.
    pub fn add_predict_task(
        &mut self,
        task: impl FnOnce(&mut TaskContext<'_>, HostTime, bool) + 'static,
    ) {
        self.predict.push(Box::new(task));
    }

    /// Runs and drops the queued after-layout hooks.
    pub fn flush_after_layout_task(&mut self, tree: &mut NodeTree) {
        for task in core::mem::take(&mut self.after_layout) {
            task(&mut TaskContext {
                tree: &mut *tree,
                scheduler: &mut *self,
            });
        }
    }

    /// Runs the persistent after-layout hooks over a snapshot; hooks
    /// registered meanwhile run from the next drain on.
    pub fn flush_persist_after_layout_task(&mut self, tree: &mut NodeTree) {
        let mut tasks = core::mem::take(&mut self.persist_after_layout);
        for task in &mut tasks {
            task(&mut TaskContext {
                tree: &mut *tree,
                scheduler: &mut *self,
            });
        }
        tasks.append(&mut self.persist_after_layout);
        self.persist_after_layout = tasks;
    }

    /// Runs and drops the queued after-render hooks.
    pub fn flush_after_render_task(&mut self, tree: &mut NodeTree) {
        for task in core::mem::take(&mut self.after_render) {
            task(&mut TaskContext {
                tree: &mut *tree,
                scheduler: &mut *self,
            });
        }
    }

    /// Runs and drops the queued idle-time hooks.
    pub fn flush_predict_task(
        &mut self,
        tree: &mut NodeTree,
        deadline: HostTime,
        can_use_long_predict_task: bool,
    ) {
        for task in core::mem::take(&mut self.predict) {
            task(
                &mut TaskContext {
                    tree: &mut *tree,
                    scheduler: &mut *self,
                },
                deadline,
                can_use_long_predict_task,
            );
        }
    }

    // -- State --

    /// Returns whether no layout or render work is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirty_layout.is_empty() && self.dirty_render.is_empty()
    }

    /// Returns whether one-shot frame hooks are waiting. Idle-time hooks
    /// are not counted; they wait for the host's idle callback.
    #[must_use]
    pub fn has_pending_hooks(&self) -> bool {
        !self.after_layout.is_empty() || !self.after_render.is_empty()
    }

    /// Returns whether idle-time hooks are waiting.
    #[must_use]
    pub fn has_pending_predict_tasks(&self) -> bool {
        !self.predict.is_empty()
    }

    /// Drops all queued layout and render work.
    pub fn clean_up(&mut self) {
        self.dirty_layout.clear();
        self.dirty_render.clear();
    }

    /// Number of nodes laid out by the last [`flush_task`](Self::flush_task)
    /// (both passes) or [`flush_layout_task`](Self::flush_layout_task).
    #[must_use]
    pub const fn last_layout_count(&self) -> usize {
        self.last_layout_count
    }

    /// Number of nodes visited by the last render drain.
    #[must_use]
    pub const fn last_render_count(&self) -> usize {
        self.last_render_count
    }

    /// Nodes laid out by the last layout drain, in processing order.
    #[must_use]
    pub fn last_laid_out(&self) -> &[NodeId] {
        &self.last_laid_out
    }

    /// Returns whether `id` is queued for layout.
    #[must_use]
    pub fn is_layout_dirty(&self, id: NodeId) -> bool {
        self.dirty_layout.values().any(|nodes| nodes.contains(&id))
    }

    /// Returns whether `id` is queued for render.
    #[must_use]
    pub fn is_render_dirty(&self, id: NodeId) -> bool {
        self.dirty_render.values().any(|nodes| nodes.contains(&id))
    }

    fn insert_render_quietly(&mut self, tree: &NodeTree, id: NodeId) {
        if let Some(page) = tree.host_page_id(id) {
            self.dirty_render.entry(page).or_default().insert(id);
        }
    }
}

/// Orders live nodes by ascending depth, then handle.
fn parent_first(tree: &NodeTree, nodes: BTreeSet<NodeId>) -> Vec<NodeId> {
    let mut ordered: Vec<(u32, NodeId)> = nodes
        .into_iter()
        .filter_map(|id| Some((tree.depth(id)?, id)))
        .collect();
    ordered.sort_unstable();
    ordered.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ManualExecutor;
    use crate::node::{GeometryTransition, NodeBehavior, NodeKind};
    use core::cell::{Cell, RefCell};
    use kurbo::Rect;

    type Log = Rc<RefCell<Vec<(&'static str, NodeId)>>>;

    /// Grows to a fixed rect on layout and paints into the log.
    struct Boxy {
        log: Log,
        size: Rect,
        background: bool,
    }

    impl NodeBehavior for Boxy {
        fn layout(&mut self, node: NodeId, _current: Rect, _force: bool) -> Option<Rect> {
            self.log.borrow_mut().push(("layout", node));
            Some(self.size)
        }

        fn create_render_task(&mut self, node: NodeId) -> Option<RenderTask> {
            let log = self.log.clone();
            if self.background {
                Some(RenderTask::Background(Box::new(move || {
                    log.borrow_mut().push(("paint-bg", node));
                })))
            } else {
                Some(RenderTask::Ui(Box::new(move |_cx| {
                    log.borrow_mut().push(("paint", node));
                })))
            }
        }
    }

    fn boxy(tree: &mut NodeTree, parent: NodeId, log: &Log, size: Rect) -> NodeId {
        let id = tree.create_node("Box", NodeKind::Frame);
        tree.set_behavior(
            id,
            Boxy {
                log: log.clone(),
                size,
                background: false,
            },
        );
        tree.add_child(parent, id, None, false);
        id
    }

    fn unit(n: f64) -> Rect {
        Rect::new(0.0, 0.0, n, n)
    }

    #[test]
    fn dirty_sets_deduplicate() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let mut scheduler = TaskScheduler::new();
        assert!(scheduler.add_dirty_layout_node(&tree, root));
        assert!(!scheduler.add_dirty_layout_node(&tree, root));
        assert!(scheduler.add_dirty_render_node(&tree, root));
        assert!(!scheduler.add_dirty_render_node(&tree, root));
        assert!(scheduler.is_layout_dirty(root));
        scheduler.clean_up();
        assert!(scheduler.is_empty());
    }

    #[test]
    fn layout_runs_parents_first_and_skips_destroying_nodes() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let parent = boxy(&mut tree, root, &log, unit(10.0));
        let child = boxy(&mut tree, parent, &log, unit(5.0));
        let doomed = boxy(&mut tree, root, &log, unit(1.0));
        let mut scheduler = TaskScheduler::new();
        scheduler.add_dirty_layout_node(&tree, child);
        scheduler.add_dirty_layout_node(&tree, parent);
        scheduler.add_dirty_layout_node(&tree, doomed);
        tree.remove_child(root, doomed, false);

        assert_eq!(scheduler.flush_layout_task(&mut tree, false), 2);
        assert_eq!(
            log.borrow().as_slice(),
            &[("layout", parent), ("layout", child)]
        );
        assert!(!scheduler.is_layout_dirty(parent));
        assert!(!scheduler.is_layout_dirty(child));
        assert_eq!(tree.geometry(child), Some(unit(5.0)));
        assert!(scheduler.is_render_dirty(child), "geometry change schedules paint");
    }

    #[test]
    fn pages_drain_in_ascending_order() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let late = boxy(&mut tree, root, &log, unit(1.0));
        let early = boxy(&mut tree, root, &log, unit(1.0));
        tree.set_host_page_id(late, PageId(2));
        tree.set_host_page_id(early, PageId(1));
        let mut scheduler = TaskScheduler::new();
        scheduler.add_dirty_layout_node(&tree, late);
        scheduler.add_dirty_layout_node(&tree, early);
        scheduler.flush_layout_task(&mut tree, false);
        assert_eq!(scheduler.last_laid_out(), &[early, late]);
    }

    #[test]
    fn layout_dirtied_from_render_waits_for_next_flush() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let mut scheduler = TaskScheduler::new();

        struct Relayout;
        impl NodeBehavior for Relayout {
            fn create_render_task(&mut self, node: NodeId) -> Option<RenderTask> {
                Some(RenderTask::Ui(Box::new(move |cx| {
                    cx.scheduler.add_dirty_layout_node(cx.tree, node);
                })))
            }
        }
        let node = tree.create_node("Box", NodeKind::Frame);
        tree.set_behavior(node, Relayout);
        tree.add_child(root, node, None, false);

        scheduler.add_dirty_render_node(&tree, node);
        scheduler.flush_task(&mut tree);
        assert_eq!(scheduler.last_layout_count(), 0);
        assert!(scheduler.is_layout_dirty(node));
        scheduler.flush_layout_task(&mut tree, false);
        assert!(!scheduler.is_layout_dirty(node));
    }

    #[test]
    fn geometry_transition_forces_extra_pass() {
        struct Once(Rc<Cell<u32>>);
        impl GeometryTransition for Once {
            fn needs_additional_layout(&mut self, _node: NodeId, candidate: Rect) -> bool {
                self.0.set(self.0.get() + 1);
                self.0.get() == 1 && candidate.width() > 0.0
            }
        }

        let log = Log::default();
        let asked = Rc::new(Cell::new(0));
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let node = boxy(&mut tree, root, &log, unit(4.0));
        tree.set_geometry_transition(node, Once(asked.clone()));

        let mut scheduler = TaskScheduler::new();
        scheduler.add_dirty_layout_node(&tree, node);
        scheduler.flush_task(&mut tree);
        assert_eq!(scheduler.last_layout_count(), 2);
        assert_eq!(asked.get(), 1);
        assert_eq!(
            log.borrow().as_slice(),
            &[("layout", node), ("layout", node), ("paint", node)]
        );
    }

    #[test]
    fn after_layout_hooks_see_layout_before_render() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let node = boxy(&mut tree, root, &log, unit(8.0));
        let mut scheduler = TaskScheduler::new();
        scheduler.add_dirty_layout_node(&tree, node);

        let seen = Rc::new(Cell::new(None));
        let seen_in_hook = seen.clone();
        let hook_log = log.clone();
        scheduler.add_after_layout_task(move |cx| {
            seen_in_hook.set(cx.tree.geometry(node));
            hook_log.borrow_mut().push(("after-layout", node));
        });
        let persist_log = log.clone();
        scheduler.add_persist_after_layout_task(move |_cx| {
            persist_log.borrow_mut().push(("persist", node));
        });
        scheduler.flush_task(&mut tree);

        assert_eq!(seen.get(), Some(unit(8.0)));
        assert_eq!(
            log.borrow().as_slice(),
            &[
                ("layout", node),
                ("after-layout", node),
                ("persist", node),
                ("paint", node),
            ]
        );

        scheduler.flush_task(&mut tree);
        assert_eq!(log.borrow().last(), Some(&("persist", node)));
    }

    #[test]
    fn hooks_added_while_draining_run_next_time() {
        let mut tree = NodeTree::new();
        let mut scheduler = TaskScheduler::new();
        let runs = Rc::new(Cell::new(0));
        let outer = runs.clone();
        scheduler.add_after_render_task(move |cx| {
            outer.set(outer.get() + 1);
            let inner = outer.clone();
            cx.scheduler
                .add_after_render_task(move |_| inner.set(inner.get() + 10));
        });
        scheduler.flush_after_render_task(&mut tree);
        assert_eq!(runs.get(), 1);
        assert!(scheduler.has_pending_hooks());
        scheduler.flush_after_render_task(&mut tree);
        assert_eq!(runs.get(), 11);
        assert!(!scheduler.has_pending_hooks());
    }

    #[test]
    fn background_tasks_post_to_executor_unless_forced() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let node = tree.create_node("Image", NodeKind::Frame);
        tree.set_behavior(
            node,
            Boxy {
                log: log.clone(),
                size: unit(1.0),
                background: true,
            },
        );
        tree.add_child(root, node, None, false);

        let executor = Rc::new(ManualExecutor::new());
        let mut scheduler = TaskScheduler::new();
        scheduler.set_executor(executor.clone());

        scheduler.add_dirty_render_node(&tree, node);
        scheduler.flush_render_task(&mut tree, false);
        assert!(log.borrow().is_empty());
        assert_eq!(executor.pending(TaskThread::Background), 1);
        assert_eq!(executor.run_pending(TaskThread::Background), 1);
        assert_eq!(log.borrow().as_slice(), &[("paint-bg", node)]);

        scheduler.add_dirty_render_node(&tree, node);
        scheduler.flush_render_task(&mut tree, true);
        assert_eq!(log.borrow().len(), 2, "forced tasks run inline");
        assert_eq!(executor.pending(TaskThread::Background), 0);
    }

    #[test]
    fn background_tasks_run_inline_without_executor() {
        let log = Log::default();
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let node = tree.create_node("Image", NodeKind::Frame);
        tree.set_behavior(
            node,
            Boxy {
                log: log.clone(),
                size: unit(1.0),
                background: true,
            },
        );
        tree.add_child(root, node, None, false);
        let mut scheduler = TaskScheduler::new();
        scheduler.add_dirty_render_node(&tree, node);
        assert_eq!(scheduler.flush_render_task(&mut tree, false), 1);
        assert_eq!(log.borrow().as_slice(), &[("paint-bg", node)]);
    }

    #[test]
    fn predict_tasks_receive_deadline() {
        let mut tree = NodeTree::new();
        let mut scheduler = TaskScheduler::new();
        let got = Rc::new(Cell::new(None));
        let got_in_task = got.clone();
        scheduler.add_predict_task(move |_cx, deadline, long| {
            got_in_task.set(Some((deadline, long)));
        });
        assert!(scheduler.has_pending_predict_tasks());
        assert!(!scheduler.has_pending_hooks());
        scheduler.flush_predict_task(&mut tree, HostTime(42), true);
        assert_eq!(got.get(), Some((HostTime(42), true)));
        assert!(!scheduler.has_pending_predict_tasks());
    }

    #[test]
    fn property_changes_route_to_dirty_sets() {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        let mut scheduler = TaskScheduler::new();
        scheduler.mark_node_dirty(&tree, root, PropertyChange::RENDER);
        assert!(scheduler.is_render_dirty(root));
        assert!(!scheduler.is_layout_dirty(root));
        scheduler.mark_node_dirty(&tree, root, PropertyChange::MEASURE);
        assert!(scheduler.is_layout_dirty(root));
    }
}
