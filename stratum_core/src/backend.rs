// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator contract for hosts embedding the frame driver.
//!
//! Stratum owns the node tree, the dirty sets, and the per-frame ordering.
//! Everything platform- or framework-specific is reached through the narrow
//! traits below:
//!
//! - **Window**: implement [`WindowHost`]: the vsync period, frame-time
//!   bookkeeping, vsync requests, and the monotonic clock.
//!
//! - **Events**: implement [`EventDispatcher`] to deliver touch, mouse,
//!   key, axis, and back events to gesture recognition and widgets.
//!
//! - **Executor**: implement [`TaskExecutor`] to run work on other
//!   contexts. [`ManualExecutor`] is an in-crate queue for hosts that pump
//!   tasks themselves, and for tests.
//!
//! - **Animation**: implement [`ScheduleTask`] for per-frame callbacks,
//!   registered weakly so that dropping the owner cancels the callback.
//!
//! - **Observation**: implement [`FrameObserver`] to hear about frame
//!   boundaries.
//!
//! # Threading
//!
//! Every trait here is called on the UI thread only. The core types hold
//! `Rc` and are `!Send`; other contexts interact by posting tasks.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_vsync(nanos: u64, frame: u64) {
//!     driver.flush_vsync(HostTime(nanos), frame);
//!     // The driver called `WindowHost::request_vsync` again if work remains.
//! }
//!
//! fn on_platform_touch(sample: TouchEvent) {
//!     driver.on_touch_event(sample);
//! }
//! ```

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::cell::RefCell;
use core::fmt;

use crate::driver::FrameStats;
use crate::input::{AxisEvent, KeyEvent, MouseEvent, TouchEvent};
use crate::time::{Duration, HostTime};

/// Execution contexts a task can be posted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskThread {
    /// The UI thread (where the driver runs).
    Ui,
    /// The script engine context.
    Script,
    /// The platform's main thread.
    Platform,
    /// Any worker.
    Background,
}

/// Posts work to execution contexts.
pub trait TaskExecutor {
    /// Runs `task` on `thread` as soon as possible.
    fn post_task(&self, thread: TaskThread, task: Box<dyn FnOnce()>);

    /// Runs `task` on `thread` after `delay`.
    fn post_delayed_task(&self, thread: TaskThread, task: Box<dyn FnOnce()>, delay: Duration);
}

/// The window the driver renders into.
pub trait WindowHost {
    /// Current display refresh period.
    fn vsync_period(&self) -> Duration;

    /// Records the vsync timestamp that started a frame.
    fn record_frame_time(&mut self, timestamp: HostTime, frame_count: u64) {
        _ = (timestamp, frame_count);
    }

    /// Asks the platform for another vsync callback.
    fn request_vsync(&mut self);

    /// Reads the monotonic clock.
    fn now(&self) -> HostTime;
}

/// Delivers input to gesture recognition and widgets.
///
/// All methods default to "not consumed".
pub trait EventDispatcher {
    /// Dispatches one touch sample.
    fn dispatch_touch(&mut self, event: &TouchEvent) {
        _ = event;
    }

    /// Called once after a frame's batch of touch samples was dispatched.
    fn touch_batch_end(&mut self) {}

    /// Dispatches a mouse event. Returns whether it was consumed.
    fn dispatch_mouse(&mut self, event: &MouseEvent) -> bool {
        _ = event;
        false
    }

    /// Dispatches a key event. Returns whether it was consumed.
    fn dispatch_key(&mut self, event: &KeyEvent) -> bool {
        _ = event;
        false
    }

    /// Dispatches an axis event. Returns whether it was consumed.
    fn dispatch_axis(&mut self, event: &AxisEvent) -> bool {
        _ = event;
        false
    }

    /// Handles the system back action. Returns whether it was consumed.
    fn on_back_pressed(&mut self) -> bool {
        false
    }
}

/// A per-frame callback owner (typically an animation).
///
/// The driver holds these weakly; dropping the owner silently ends the
/// callbacks.
pub trait ScheduleTask {
    /// Called once per frame with the vsync timestamp.
    fn on_frame(&self, timestamp: HostTime);
}

/// Hears about frame boundaries.
pub trait FrameObserver {
    /// Called before any phase of a frame runs.
    fn on_frame_begin(&mut self, frame_count: u64, timestamp: HostTime) {
        _ = (frame_count, timestamp);
    }

    /// Called after the last phase of a frame ran.
    fn on_frame_end(&mut self, stats: &FrameStats) {
        _ = stats;
    }
}

struct Posted {
    thread: TaskThread,
    delay: Duration,
    task: Box<dyn FnOnce()>,
}

/// A [`TaskExecutor`] that queues tasks until the owner pumps them.
#[derive(Default)]
pub struct ManualExecutor {
    queue: RefCell<VecDeque<Posted>>,
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("queued", &self.queue.borrow().len())
            .finish()
    }
}

impl ManualExecutor {
    /// Creates an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks queued for `thread`, delayed or not.
    #[must_use]
    pub fn pending(&self, thread: TaskThread) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|p| p.thread == thread)
            .count()
    }

    /// Runs the undelayed tasks queued for `thread`, in posting order.
    ///
    /// Tasks posted while running are left for the next call. Returns how
    /// many ran.
    pub fn run_pending(&self, thread: TaskThread) -> usize {
        self.run_where(|p| p.thread == thread && p.delay == Duration::ZERO)
    }

    /// Runs the tasks queued for `thread` whose delay is at most `elapsed`.
    pub fn run_elapsed(&self, thread: TaskThread, elapsed: Duration) -> usize {
        self.run_where(|p| p.thread == thread && p.delay <= elapsed)
    }

    fn run_where(&self, ready: impl Fn(&Posted) -> bool) -> usize {
        let due: VecDeque<Posted> = {
            let mut queue = self.queue.borrow_mut();
            let (due, keep): (VecDeque<Posted>, VecDeque<Posted>) =
                queue.drain(..).partition(|p| ready(p));
            *queue = keep;
            due
        };
        let ran = due.len();
        for posted in due {
            (posted.task)();
        }
        ran
    }
}

impl TaskExecutor for ManualExecutor {
    fn post_task(&self, thread: TaskThread, task: Box<dyn FnOnce()>) {
        self.post_delayed_task(thread, task, Duration::ZERO);
    }

    fn post_delayed_task(&self, thread: TaskThread, task: Box<dyn FnOnce()>, delay: Duration) {
        self.queue.borrow_mut().push_back(Posted {
            thread,
            delay,
            task,
        });
    }
}
