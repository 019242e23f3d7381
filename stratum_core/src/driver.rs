// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-vsync frame driver.
//!
//! [`FrameDriver`] owns the node tree, the dirty component set, and the task
//! scheduler, and runs one frame of work per vsync in a fixed order:
//!
//! | # | Phase | Work |
//! |---|-------|------|
//! | 1 | timing | record frame time, compute the resample target |
//! | 2 | [`Delayed`](PhaseKind::Delayed) | deferred tasks whose deadline elapsed |
//! | 3 | [`Animation`](PhaseKind::Animation) | scheduled per-frame callbacks |
//! | 4 | [`Touch`](PhaseKind::Touch) | batched, resampled touch moves |
//! | 5 | [`Build`](PhaseKind::Build) | dirty components, at most [`MAX_REBUILD_PASSES`] passes |
//! | 6 | [`Tasks`](PhaseKind::Tasks) | structure changes, layout, hooks, render |
//! | 7 | [`Activation`](PhaseKind::Activation) | deferred active toggles |
//! | 8 | [`Focus`](PhaseKind::Focus) | at most one focus request |
//! | 9 | [`Observers`](PhaseKind::Observers) | area and visible-area callbacks |
//! | 10 | [`Mouse`](PhaseKind::Mouse) | one synthetic mouse move |
//! | 11 | [`AfterRender`](PhaseKind::AfterRender) | after-render hooks |
//! | 12 | end | frame observer, request the next frame if work remains |
//!
//! Everything runs on the UI thread. Every phase drains a snapshot, so work
//! enqueued while a phase runs is picked up by a later pass or frame.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;
use log::debug;

use crate::backend::{EventDispatcher, FrameObserver, ScheduleTask, TaskExecutor, WindowHost};
use crate::component::DirtyComponents;
use crate::config::{DriverConfig, MAX_REBUILD_PASSES};
use crate::dirty::PropertyChange;
use crate::focus::{FocusRequests, FocusSlot};
use crate::input::{AxisEvent, KeyEvent, MouseAction, MouseEvent, TouchEvent, TouchType};
use crate::node::{NodeId, NodeTree};
use crate::resample::resample_touch_event;
use crate::scheduler::{TaskContext, TaskScheduler};
use crate::time::{Duration, HostTime};
use crate::trace::{
    BuildPassEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    TouchFlushEvent, Tracer, VsyncEvent,
};


/// Counters describing one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame counter supplied by the host.
    pub frame_count: u64,
    /// Vsync timestamp.
    pub timestamp: HostTime,
    /// Rebuild passes run.
    pub rebuild_passes: u32,
    /// Components rebuilt.
    pub rebuilt: u32,
    /// Nodes laid out (both layout passes).
    pub laid_out: u32,
    /// Nodes visited by the render drain.
    pub rendered: u32,
    /// Whether dirty components were left for the next frame.
    pub carried_over: bool,
}

/// A task deferred until the vsync clock passes its deadline.
pub type DelayedTask = Box<dyn FnOnce(&mut FrameDriver)>;

/// Called with the old and new global rectangle of an observed node.
pub type AreaChangeFn = Box<dyn FnMut(Rect, Rect)>;

/// Called with whether the visible ratio grew and the new ratio.
pub type VisibleAreaFn = Box<dyn FnMut(bool, f64)>;

struct AreaObserver {
    node: NodeId,
    last: Option<Rect>,
    callback: AreaChangeFn,
}

struct VisibleAreaObserver {
    node: NodeId,
    thresholds: Vec<f64>,
    last_ratio: f64,
    callback: VisibleAreaFn,
}

/// Drives one frame of UI work per vsync.
pub struct FrameDriver {
    tree: NodeTree,
    root: NodeId,
    scheduler: TaskScheduler,
    dirty: DirtyComponents,
    config: DriverConfig,
    window: Option<Box<dyn WindowHost>>,
    dispatcher: Option<Box<dyn EventDispatcher>>,
    observer: Option<Box<dyn FrameObserver>>,
    delayed: BTreeMap<(HostTime, u64), DelayedTask>,
    next_delayed: u64,
    schedule_tasks: BTreeMap<u32, Weak<dyn ScheduleTask>>,
    next_schedule_id: u32,
    touch_events: Vec<TouchEvent>,
    touch_history: BTreeMap<i32, Vec<TouchEvent>>,
    focus: FocusRequests,
    activation: Vec<(NodeId, bool)>,
    area_observers: Vec<AreaObserver>,
    visible_observers: Vec<VisibleAreaObserver>,
    last_mouse: Option<MouseEvent>,
    mouse_replay: bool,
    frame_requested: bool,
    last_vsync: HostTime,
}

impl fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDriver")
            .field("root", &self.root)
            .field("nodes", &self.tree.node_count())
            .field("dirty_components", &self.dirty.len())
            .field("scheduler", &self.scheduler)
            .field("config", &self.config)
            .field("delayed", &self.delayed.len())
            .field("schedule_tasks", &self.schedule_tasks.len())
            .field("touch_events", &self.touch_events.len())
            .field("frame_requested", &self.frame_requested)
            .field("last_vsync", &self.last_vsync)
            .finish_non_exhaustive()
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl FrameDriver {
    /// Creates a driver with an empty tree holding just the root.
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        let mut tree = NodeTree::new();
        let root = tree.create_root("root");
        Self {
            tree,
            root,
            scheduler: TaskScheduler::new(),
            dirty: DirtyComponents::new(),
            config,
            window: None,
            dispatcher: None,
            observer: None,
            delayed: BTreeMap::new(),
            next_delayed: 0,
            schedule_tasks: BTreeMap::new(),
            next_schedule_id: 0,
            touch_events: Vec::new(),
            touch_history: BTreeMap::new(),
            focus: FocusRequests::new(),
            activation: Vec::new(),
            area_observers: Vec::new(),
            visible_observers: Vec::new(),
            last_mouse: None,
            mouse_replay: false,
            frame_requested: false,
            last_vsync: HostTime(0),
        }
    }

    // -- Collaborators --

    /// Installs the window host.
    pub fn set_window(&mut self, window: Box<dyn WindowHost>) {
        self.window = Some(window);
    }

    /// Installs the event dispatcher.
    pub fn set_dispatcher(&mut self, dispatcher: Box<dyn EventDispatcher>) {
        self.dispatcher = Some(dispatcher);
    }

    /// Installs the executor background render tasks are posted to.
    pub fn set_executor(&mut self, executor: Rc<dyn TaskExecutor>) {
        self.scheduler.set_executor(executor);
    }

    /// Installs the frame observer, returning the one it replaces.
    pub fn install_observer(
        &mut self,
        observer: Box<dyn FrameObserver>,
    ) -> Option<Box<dyn FrameObserver>> {
        self.observer.replace(observer)
    }

    /// Removes and returns the frame observer.
    pub fn uninstall_observer(&mut self) -> Option<Box<dyn FrameObserver>> {
        self.observer.take()
    }

    // -- Accessors --

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node tree.
    #[must_use]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// The node tree, mutably.
    ///
    /// Mutations made through this handle do not request a frame. Use
    /// [`add_child`](Self::add_child) and [`remove_child`](Self::remove_child)
    /// or call [`request_frame`](Self::request_frame) afterwards.
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// Attaches `child` under `parent` and requests a frame so the parent is
    /// laid out again.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, slot: Option<usize>) {
        self.tree.add_child(parent, child, slot, false);
        if self.has_pending_work() {
            self.request_frame();
        }
    }

    /// Detaches `child` from `parent` and requests a frame so the removal is
    /// flushed. Returns whether `child` was attached.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, allow_transition: bool) -> bool {
        let removed = self.tree.remove_child(parent, child, allow_transition);
        if removed {
            self.request_frame();
        }
        removed
    }

    /// The task scheduler, mutably.
    pub fn scheduler_mut(&mut self) -> &mut TaskScheduler {
        &mut self.scheduler
    }

    /// The dirty component set.
    #[must_use]
    pub fn dirty_components(&self) -> &DirtyComponents {
        &self.dirty
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Whether a frame was requested since the last vsync.
    #[must_use]
    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Timestamp of the last flushed vsync.
    #[must_use]
    pub fn last_vsync(&self) -> HostTime {
        self.last_vsync
    }

    /// Resizes the root and queues it for layout.
    pub fn resize(&mut self, rect: Rect) {
        if self.tree.set_geometry(self.root, rect) {
            self.scheduler.add_dirty_layout_node(&self.tree, self.root);
            self.request_frame();
        }
    }

    // -- Frame requests --

    /// Asks the window host for a vsync. Repeated calls before the next
    /// vsync do nothing.
    pub fn request_frame(&mut self) {
        if self.frame_requested {
            return;
        }
        self.frame_requested = true;
        if let Some(window) = self.window.as_mut() {
            window.request_vsync();
        }
    }

    // -- Work registration --

    /// Queues a component for rebuild.
    pub fn add_dirty_component(&mut self, id: NodeId) -> bool {
        let queued = self.tree.mark_need_update(&mut self.dirty, id);
        if queued {
            self.request_frame();
        }
        queued
    }

    /// Queues a node for layout.
    pub fn add_dirty_layout_node(&mut self, id: NodeId) -> bool {
        let queued = self.scheduler.add_dirty_layout_node(&self.tree, id);
        if queued {
            self.request_frame();
        }
        queued
    }

    /// Queues a node for render.
    pub fn add_dirty_render_node(&mut self, id: NodeId) -> bool {
        let queued = self.scheduler.add_dirty_render_node(&self.tree, id);
        if queued {
            self.request_frame();
        }
        queued
    }

    /// Queues a node according to what changed about it.
    pub fn mark_node_dirty(&mut self, id: NodeId, change: PropertyChange) {
        if change.is_empty() {
            return;
        }
        self.scheduler.mark_node_dirty(&self.tree, id, change);
        self.request_frame();
    }

    /// Queues a hook for after the next layout.
    pub fn add_after_layout_task(&mut self, task: impl FnOnce(&mut TaskContext<'_>) + 'static) {
        self.scheduler.add_after_layout_task(task);
        self.request_frame();
    }

    /// Registers a hook run after every layout.
    pub fn add_persist_after_layout_task(
        &mut self,
        task: impl FnMut(&mut TaskContext<'_>) + 'static,
    ) {
        self.scheduler.add_persist_after_layout_task(task);
    }

    /// Queues a hook for after the next render.
    pub fn add_after_render_task(&mut self, task: impl FnOnce(&mut TaskContext<'_>) + 'static) {
        self.scheduler.add_after_render_task(task);
        self.request_frame();
    }

    /// Defers `task` until a vsync at least `delay` after now.
    ///
    /// "Now" is the window clock, or the last vsync without a window.
    /// Tasks with equal deadlines run in posting order.
    pub fn post_delayed(&mut self, delay: Duration, task: impl FnOnce(&mut Self) + 'static) {
        let deadline = self.now().saturating_add(delay);
        let seq = self.next_delayed;
        self.next_delayed += 1;
        self.delayed.insert((deadline, seq), Box::new(task));
        self.request_frame();
    }

    /// Registers a per-frame callback. The driver only holds it weakly.
    pub fn add_schedule_task(&mut self, task: Weak<dyn ScheduleTask>) -> u32 {
        let id = self.next_schedule_id;
        self.next_schedule_id = self.next_schedule_id.wrapping_add(1);
        self.schedule_tasks.insert(id, task);
        self.request_frame();
        id
    }

    /// Unregisters a per-frame callback. Returns whether it was registered.
    pub fn remove_schedule_task(&mut self, id: u32) -> bool {
        self.schedule_tasks.remove(&id).is_some()
    }

    /// Files a focus request, serviced during the next frame.
    pub fn request_focus(&mut self, slot: FocusSlot, id: NodeId) {
        self.focus.request(slot, id);
        self.request_frame();
    }

    /// Defers a component activation toggle to the next frame.
    pub fn set_component_active(&mut self, id: NodeId, active: bool) {
        self.activation.push((id, active));
        self.request_frame();
    }

    /// Observes changes of `node`'s global rectangle.
    ///
    /// The first frame after registration reports `Rect::ZERO` as the old
    /// rectangle.
    pub fn on_area_change(&mut self, node: NodeId, callback: impl FnMut(Rect, Rect) + 'static) {
        self.area_observers.push(AreaObserver {
            node,
            last: None,
            callback: Box::new(callback),
        });
        self.request_frame();
    }

    /// Observes how much of `node` is inside the viewport.
    ///
    /// The callback fires when the visible ratio crosses any of `thresholds`
    /// (each clamped to `0.0..=1.0`). A threshold of `0.0` is crossed when
    /// the node becomes partly visible or fully hidden.
    pub fn on_visible_area_change(
        &mut self,
        node: NodeId,
        thresholds: &[f64],
        callback: impl FnMut(bool, f64) + 'static,
    ) {
        self.visible_observers.push(VisibleAreaObserver {
            node,
            thresholds: thresholds.iter().map(|t| t.clamp(0.0, 1.0)).collect(),
            last_ratio: 0.0,
            callback: Box::new(callback),
        });
        self.request_frame();
    }

    /// Replays the last mouse position as a synthetic move after the next
    /// layout.
    pub fn request_mouse_replay(&mut self) {
        self.mouse_replay = true;
        self.request_frame();
    }

    // -- Input --

    /// Ingests one touch sample.
    ///
    /// Moves are batched until the next vsync. Down is dispatched at once.
    /// Up and cancel first dispatch the newest batched move of the same
    /// pointer (discarding the others), then themselves, and forget the
    /// pointer's resampling history.
    pub fn on_touch_event(&mut self, event: TouchEvent) {
        match event.kind {
            TouchType::Move => {
                self.touch_events.push(event);
                self.request_frame();
            }
            TouchType::Down => {
                self.touch_history.remove(&event.id);
                if let Some(dispatcher) = self.dispatcher.as_mut() {
                    dispatcher.dispatch_touch(&event);
                }
            }
            TouchType::Up | TouchType::Cancel => {
                let (mine, others): (Vec<TouchEvent>, Vec<TouchEvent>) =
                    core::mem::take(&mut self.touch_events)
                        .into_iter()
                        .partition(|e| e.id == event.id);
                self.touch_events = others;
                self.touch_history.remove(&event.id);
                if let Some(dispatcher) = self.dispatcher.as_mut() {
                    if let Some(last) = mine.last() {
                        dispatcher.dispatch_touch(last);
                    }
                    dispatcher.dispatch_touch(&event);
                }
            }
        }
    }

    /// Dispatches a mouse event. Returns whether it was consumed.
    pub fn on_mouse_event(&mut self, event: MouseEvent) -> bool {
        if !event.synthetic {
            self.last_mouse = Some(event);
        }
        self.dispatcher
            .as_mut()
            .is_some_and(|d| d.dispatch_mouse(&event))
    }

    /// Dispatches a key event. Returns whether it was consumed.
    pub fn on_key_event(&mut self, event: KeyEvent) -> bool {
        self.dispatcher
            .as_mut()
            .is_some_and(|d| d.dispatch_key(&event))
    }

    /// Dispatches an axis event. Returns whether it was consumed.
    pub fn on_axis_event(&mut self, event: AxisEvent) -> bool {
        self.dispatcher
            .as_mut()
            .is_some_and(|d| d.dispatch_axis(&event))
    }

    /// Forwards the system back action. Returns whether it was consumed.
    pub fn on_back_pressed(&mut self) -> bool {
        self.dispatcher
            .as_mut()
            .is_some_and(|d| d.on_back_pressed())
    }

    /// Runs queued idle-time hooks.
    pub fn on_idle(&mut self, deadline: HostTime, can_use_long_predict_task: bool) {
        self.scheduler
            .flush_predict_task(&mut self.tree, deadline, can_use_long_predict_task);
    }

    // -- The frame --

    /// Runs one frame.
    pub fn flush_vsync(&mut self, timestamp: HostTime, frame_count: u64) -> FrameStats {
        self.flush_vsync_traced(timestamp, frame_count, &mut Tracer::none())
    }

    /// Runs one frame, reporting to `tracer`.
    pub fn flush_vsync_traced(
        &mut self,
        timestamp: HostTime,
        frame_count: u64,
        tracer: &mut Tracer<'_>,
    ) -> FrameStats {
        self.frame_requested = false;
        self.last_vsync = timestamp;
        let mut stats = FrameStats {
            frame_count,
            timestamp,
            ..FrameStats::default()
        };
        if let Some(observer) = self.observer.as_mut() {
            observer.on_frame_begin(frame_count, timestamp);
        }

        let vsync_period = match self.window.as_mut() {
            Some(window) => {
                window.record_frame_time(timestamp, frame_count);
                window.vsync_period()
            }
            None => self.config.fallback_vsync_period,
        };
        let resample_timestamp = timestamp
            .saturating_sub(vsync_period)
            .saturating_add(self.config.resample_guard);
        let vsync = VsyncEvent {
            frame_count,
            timestamp,
            resample_timestamp,
            vsync_period,
        };
        tracer.vsync(&vsync);
        let mut summary = FrameSummaryBuilder::new(&vsync);

        self.begin(PhaseKind::Delayed, frame_count, tracer, &mut summary);
        self.flush_delayed_tasks(timestamp);
        self.end(PhaseKind::Delayed, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Animation, frame_count, tracer, &mut summary);
        self.flush_animations(timestamp);
        self.end(PhaseKind::Animation, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Touch, frame_count, tracer, &mut summary);
        let touch = self.flush_touch_events(resample_timestamp);
        if touch.pointers > 0 {
            tracer.touch_flush(&TouchFlushEvent {
                frame_count,
                ..touch
            });
        }
        self.end(PhaseKind::Touch, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Build, frame_count, tracer, &mut summary);
        self.flush_dirty_components(frame_count, tracer, &mut stats);
        self.end(PhaseKind::Build, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Tasks, frame_count, tracer, &mut summary);
        for id in self.tree.take_structure_changes() {
            self.scheduler.add_dirty_layout_node(&self.tree, id);
        }
        self.scheduler.flush_task(&mut self.tree);
        stats.laid_out = saturating_u32(self.scheduler.last_layout_count());
        stats.rendered = saturating_u32(self.scheduler.last_render_count());
        #[cfg(feature = "trace-rich")]
        tracer.laid_out_nodes(frame_count, self.scheduler.last_laid_out());
        self.end(PhaseKind::Tasks, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Activation, frame_count, tracer, &mut summary);
        for (id, active) in core::mem::take(&mut self.activation) {
            self.tree.set_active(id, active);
        }
        self.end(PhaseKind::Activation, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Focus, frame_count, tracer, &mut summary);
        if let Some((slot, id)) = self.focus.flush(&mut self.tree) {
            debug!("focus: {slot:?} request moved focus to {id:?}");
        }
        self.end(PhaseKind::Focus, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Observers, frame_count, tracer, &mut summary);
        self.flush_area_observers();
        self.end(PhaseKind::Observers, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::Mouse, frame_count, tracer, &mut summary);
        if stats.laid_out > 0 {
            self.mouse_replay = true;
        }
        self.flush_mouse_replay(timestamp);
        self.end(PhaseKind::Mouse, frame_count, tracer, &mut summary);

        self.begin(PhaseKind::AfterRender, frame_count, tracer, &mut summary);
        self.scheduler.flush_after_render_task(&mut self.tree);
        self.end(PhaseKind::AfterRender, frame_count, tracer, &mut summary);

        tracer.frame_summary(&summary.finish(&stats));
        if let Some(observer) = self.observer.as_mut() {
            observer.on_frame_end(&stats);
        }
        if self.has_pending_work() {
            self.request_frame();
        }
        stats
    }

    /// Whether anything is waiting for a future frame.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.dirty.is_empty()
            || !self.scheduler.is_empty()
            || self.scheduler.has_pending_hooks()
            || !self.schedule_tasks.is_empty()
            || !self.delayed.is_empty()
            || !self.touch_events.is_empty()
            || !self.activation.is_empty()
            || !self.focus.is_empty()
            || !self.tree.structure_changes.is_empty()
            || self.tree.has_pending_removals()
    }

    // -- Phases --

    fn flush_delayed_tasks(&mut self, timestamp: HostTime) {
        let due = match timestamp.checked_add(Duration(1)) {
            Some(bound) => {
                let later = self.delayed.split_off(&(bound, 0));
                core::mem::replace(&mut self.delayed, later)
            }
            None => core::mem::take(&mut self.delayed),
        };
        for task in due.into_values() {
            task(self);
        }
    }

    fn flush_animations(&mut self, timestamp: HostTime) {
        self.schedule_tasks.retain(|_, task| task.strong_count() > 0);
        let live: Vec<Rc<dyn ScheduleTask>> = self
            .schedule_tasks
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        for task in live {
            task.on_frame(timestamp);
        }
    }

    /// Dispatches one sample per pointer with batched moves, in ascending
    /// pointer order.
    fn flush_touch_events(&mut self, target: HostTime) -> TouchFlushEvent {
        let mut result = TouchFlushEvent {
            frame_count: 0,
            pointers: 0,
            resampled: 0,
        };
        if self.touch_events.is_empty() {
            return result;
        }
        let mut by_pointer: BTreeMap<i32, Vec<TouchEvent>> = BTreeMap::new();
        for event in core::mem::take(&mut self.touch_events) {
            by_pointer.entry(event.id).or_default().push(event);
        }

        let mut outgoing = Vec::with_capacity(by_pointer.len());
        for (id, mut current) in by_pointer {
            let Some(latest) = current.last() else {
                continue;
            };
            result.pointers += 1;
            let resampled = if self.config.touch_resampling {
                let history = self.touch_history.get(&id).map_or(&[][..], Vec::as_slice);
                resample_touch_event(
                    history,
                    &current,
                    target,
                    self.config.interpolation_threshold,
                )
            } else {
                None
            };
            let event = match resampled {
                Some(event) => {
                    if !current.contains(&event) {
                        result.resampled += 1;
                    }
                    event
                }
                None => {
                    let mut latest = latest.clone();
                    latest.history = current[..current.len() - 1].to_vec();
                    latest
                }
            };
            outgoing.push(event);
            for sample in &mut current {
                sample.history.clear();
            }
            self.touch_history.insert(id, current);
        }

        if let Some(dispatcher) = self.dispatcher.as_mut() {
            for event in &outgoing {
                dispatcher.dispatch_touch(event);
            }
            dispatcher.touch_batch_end();
        } else {
            debug!("touch: no dispatcher, dropping {} samples", outgoing.len());
        }
        result
    }

    /// Rebuilds dirty components in counted passes, parents first.
    fn flush_dirty_components(
        &mut self,
        frame_count: u64,
        tracer: &mut Tracer<'_>,
        stats: &mut FrameStats,
    ) {
        let mut rebuilt_nodes = Vec::new();
        let mut pass = 0;
        while !self.dirty.is_empty() && pass < MAX_REBUILD_PASSES {
            pass += 1;
            let batch = self.dirty.take_parent_first(&self.tree);
            let mut rebuilt = 0;
            for id in batch {
                if self.tree.component(id).is_some_and(|c| c.needs_rebuild()) {
                    self.tree.update_component(&mut self.dirty, id);
                    rebuilt_nodes.push(id);
                    rebuilt += 1;
                }
            }
            tracer.build_pass(&BuildPassEvent {
                frame_count,
                pass,
                rebuilt,
                remaining: saturating_u32(self.dirty.len()),
            });
        }
        stats.rebuild_passes = pass;
        stats.rebuilt = saturating_u32(rebuilt_nodes.len());
        stats.carried_over = !self.dirty.is_empty();
        if stats.carried_over {
            debug!(
                "build: {} components still dirty after {MAX_REBUILD_PASSES} passes, carrying over",
                self.dirty.len()
            );
        }
        #[cfg(feature = "trace-rich")]
        tracer.rebuilt_components(frame_count, &rebuilt_nodes);
    }

    fn flush_area_observers(&mut self) {
        let tree = &self.tree;
        self.area_observers.retain(|o| tree.is_alive(o.node));
        self.visible_observers.retain(|o| tree.is_alive(o.node));

        for observer in &mut self.area_observers {
            let Some(rect) = tree.global_rect(observer.node) else {
                continue;
            };
            if observer.last != Some(rect) {
                let old = observer.last.unwrap_or(Rect::ZERO);
                observer.last = Some(rect);
                (observer.callback)(old, rect);
            }
        }

        let viewport = self
            .config
            .visible_area_viewport
            .or_else(|| tree.geometry(self.root));
        let Some(viewport) = viewport else {
            return;
        };
        for observer in &mut self.visible_observers {
            let Some(rect) = tree.global_rect(observer.node) else {
                continue;
            };
            let ratio = if tree.is_on_main_tree(observer.node) {
                visible_ratio(rect, viewport)
            } else {
                0.0
            };
            let last = observer.last_ratio;
            let crossed = observer
                .thresholds
                .iter()
                .any(|&t| reaches(last, t) != reaches(ratio, t));
            observer.last_ratio = ratio;
            if crossed {
                (observer.callback)(ratio > last, ratio);
            }
        }
    }

    fn flush_mouse_replay(&mut self, timestamp: HostTime) {
        if !core::mem::take(&mut self.mouse_replay) {
            return;
        }
        let Some(last) = self.last_mouse else {
            return;
        };
        let replay = MouseEvent {
            position: last.position,
            action: MouseAction::Move,
            time: timestamp,
            synthetic: true,
        };
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.dispatch_mouse(&replay);
        }
    }

    // -- Helpers --

    fn now(&self) -> HostTime {
        self.window.as_ref().map_or(self.last_vsync, |w| w.now())
    }

    fn begin(
        &self,
        phase: PhaseKind,
        frame_count: u64,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) {
        let timestamp = self.now();
        summary.phase_begin(phase, timestamp);
        tracer.phase_begin(&PhaseBeginEvent {
            frame_count,
            phase,
            timestamp,
        });
    }

    fn end(
        &self,
        phase: PhaseKind,
        frame_count: u64,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) {
        let timestamp = self.now();
        summary.phase_end(phase, timestamp);
        tracer.phase_end(&PhaseEndEvent {
            frame_count,
            phase,
            timestamp,
        });
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Fraction of `rect`'s area inside `viewport`.
fn visible_ratio(rect: Rect, viewport: Rect) -> f64 {
    let area = rect.area();
    if area <= 0.0 {
        return 0.0;
    }
    let overlap = rect.intersect(viewport);
    if overlap.width() <= 0.0 || overlap.height() <= 0.0 {
        return 0.0;
    }
    (overlap.area() / area).clamp(0.0, 1.0)
}

/// Whether `ratio` counts as having reached `threshold`. Zero is reached by
/// any visibility at all.
fn reaches(ratio: f64, threshold: f64) -> bool {
    if threshold <= 0.0 {
        ratio > 0.0
    } else {
        ratio >= threshold
    }
}
