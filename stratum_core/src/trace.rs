// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame driver.
//!
//! [`TraceSink`] has one method per event the driver emits during
//! [`flush_vsync_traced`](crate::driver::FrameDriver::flush_vsync_traced).
//! Every method defaults to a no-op, so sinks implement only what they need.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. With the `trace` feature
//! **off**, every `Tracer` method compiles to nothing. With it **on**, each
//! method is a single `Option` branch before dispatch.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies.
//! - `trace-rich` (implies `trace`): adds per-frame lists of rebuilt
//!   components and laid-out nodes.

#[cfg(feature = "trace-rich")]
use crate::node::NodeId;

use crate::driver::FrameStats;
use crate::time::{Duration, HostTime};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a frame is being measured, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseKind {
    /// Deferred tasks whose deadline elapsed.
    Delayed,
    /// Scheduled animation callbacks.
    Animation,
    /// Batched touch dispatch.
    Touch,
    /// Dirty component rebuild passes.
    Build,
    /// Layout, after-layout hooks, and render.
    Tasks,
    /// Deferred component activation toggles.
    Activation,
    /// Pending focus request.
    Focus,
    /// Area and visible-area observers.
    Observers,
    /// Synthetic mouse move.
    Mouse,
    /// After-render hooks.
    AfterRender,
}

impl PhaseKind {
    /// Number of phases.
    pub const COUNT: usize = 10;

    /// Every phase, in execution order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Delayed,
        Self::Animation,
        Self::Touch,
        Self::Build,
        Self::Tasks,
        Self::Activation,
        Self::Focus,
        Self::Observers,
        Self::Mouse,
        Self::AfterRender,
    ];

    /// Short lowercase name, used by text and JSON exporters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Delayed => "delayed",
            Self::Animation => "animation",
            Self::Touch => "touch",
            Self::Build => "build",
            Self::Tasks => "tasks",
            Self::Activation => "activation",
            Self::Focus => "focus",
            Self::Observers => "observers",
            Self::Mouse => "mouse",
            Self::AfterRender => "after_render",
        }
    }

    /// Index into per-phase arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Delayed => 0,
            Self::Animation => 1,
            Self::Touch => 2,
            Self::Build => 3,
            Self::Tasks => 4,
            Self::Activation => 5,
            Self::Focus => 6,
            Self::Observers => 7,
            Self::Mouse => 8,
            Self::AfterRender => 9,
        }
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a vsync starts a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VsyncEvent {
    /// Frame counter supplied by the host.
    pub frame_count: u64,
    /// Vsync timestamp.
    pub timestamp: HostTime,
    /// Target time touch samples are resampled onto.
    pub resample_timestamp: HostTime,
    /// Refresh period in effect.
    pub vsync_period: Duration,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_count: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Clock reading at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_count: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Clock reading at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted after each rebuild pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildPassEvent {
    /// Frame counter.
    pub frame_count: u64,
    /// 1-based pass number.
    pub pass: u32,
    /// Components rebuilt in this pass.
    pub rebuilt: u32,
    /// Components dirty after this pass.
    pub remaining: u32,
}

/// Emitted after the batched touch events were dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchFlushEvent {
    /// Frame counter.
    pub frame_count: u64,
    /// Pointers with pending samples.
    pub pointers: u32,
    /// Pointers whose dispatched sample was resampled.
    pub resampled: u32,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_count: u64,
    /// Vsync timestamp.
    pub timestamp: HostTime,
    /// Per-phase durations in nanoseconds, indexed by [`PhaseKind::index`]
    /// (0 if not measured).
    pub phase_nanos: [u64; PhaseKind::COUNT],
    /// Rebuild passes run.
    pub rebuild_passes: u32,
    /// Components rebuilt.
    pub rebuilt: u32,
    /// Nodes laid out.
    pub laid_out: u32,
    /// Nodes rendered.
    pub rendered: u32,
    /// Whether dirty components carried over to the next frame.
    pub carried_over: bool,
}

impl FrameSummary {
    /// Duration of one phase in nanoseconds.
    #[must_use]
    pub const fn phase(&self, phase: PhaseKind) -> u64 {
        self.phase_nanos[phase.index()]
    }

    /// Sum of all measured phases.
    #[must_use]
    pub fn total_nanos(&self) -> u64 {
        self.phase_nanos.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame driver.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a vsync starts a frame.
    fn on_vsync(&mut self, e: &VsyncEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after each rebuild pass.
    fn on_build_pass(&mut self, e: &BuildPassEvent) {
        _ = e;
    }

    /// Called after the touch batch was dispatched.
    fn on_touch_flush(&mut self, e: &TouchFlushEvent) {
        _ = e;
    }

    /// Called with the frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with the components rebuilt this frame (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_rebuilt_components(&mut self, frame_count: u64, nodes: &[NodeId]) {
        _ = (frame_count, nodes);
    }

    /// Called with the nodes laid out this frame (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_laid_out_nodes(&mut self, frame_count: u64, nodes: &[NodeId]) {
        _ = (frame_count, nodes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`VsyncEvent`].
    #[inline]
    pub fn vsync(&mut self, e: &VsyncEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_vsync(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BuildPassEvent`].
    #[inline]
    pub fn build_pass(&mut self, e: &BuildPassEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_build_pass(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TouchFlushEvent`].
    #[inline]
    pub fn touch_flush(&mut self, e: &TouchFlushEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_touch_flush(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits the components rebuilt this frame (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn rebuilt_components(&mut self, frame_count: u64, nodes: &[NodeId]) {
        if let Some(s) = &mut self.sink {
            s.on_rebuilt_components(frame_count, nodes);
        }
    }

    /// Emits the nodes laid out this frame (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn laid_out_nodes(&mut self, frame_count: u64, nodes: &[NodeId]) {
        if let Some(s) = &mut self.sink {
            s.on_laid_out_nodes(frame_count, nodes);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    vsync: VsyncEvent,
    phase_starts: [Option<HostTime>; PhaseKind::COUNT],
    phase_ends: [Option<HostTime>; PhaseKind::COUNT],
}

impl FrameSummaryBuilder {
    /// Starts a summary for the frame `vsync` began.
    #[must_use]
    pub fn new(vsync: &VsyncEvent) -> Self {
        Self {
            vsync: *vsync,
            phase_starts: [None; PhaseKind::COUNT],
            phase_ends: [None; PhaseKind::COUNT],
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase.index()] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase.index()] = Some(t);
    }

    /// Consumes the builder and combines the timings with `stats`.
    #[must_use]
    pub fn finish(self, stats: &FrameStats) -> FrameSummary {
        let mut phase_nanos = [0; PhaseKind::COUNT];
        for (i, slot) in phase_nanos.iter_mut().enumerate() {
            if let (Some(start), Some(end)) = (self.phase_starts[i], self.phase_ends[i]) {
                *slot = end.saturating_duration_since(start).nanos();
            }
        }
        FrameSummary {
            frame_count: self.vsync.frame_count,
            timestamp: self.vsync.timestamp,
            phase_nanos,
            rebuild_passes: stats.rebuild_passes,
            rebuilt: stats.rebuilt,
            laid_out: stats.laid_out,
            rendered: stats.rendered,
            carried_over: stats.carried_over,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
