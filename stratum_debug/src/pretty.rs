// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.

use std::io::Write;

use stratum_core::node::NodeId;
use stratum_core::trace::{
    BuildPassEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, TouchFlushEvent, TraceSink,
    VsyncEvent,
};

/// A [`TraceSink`] that writes one line per event.
///
/// Timestamps are printed in microseconds. Write errors are ignored.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> core::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink over a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink over any writer.
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(nanos: u64) -> f64 {
    nanos as f64 / 1_000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        let _ = writeln!(
            self.writer,
            "[vsync] frame={} at {:.1}µs resample={:.1}µs period={:.1}µs",
            e.frame_count,
            us(e.timestamp.nanos()),
            us(e.resample_timestamp.nanos()),
            us(e.vsync_period.nanos()),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_count,
            e.phase.name(),
            us(e.timestamp.nanos()),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end]   frame={} {} at {:.1}µs",
            e.frame_count,
            e.phase.name(),
            us(e.timestamp.nanos()),
        );
    }

    fn on_build_pass(&mut self, e: &BuildPassEvent) {
        let _ = writeln!(
            self.writer,
            "[build] frame={} pass={} rebuilt={} remaining={}",
            e.frame_count, e.pass, e.rebuilt, e.remaining,
        );
    }

    fn on_touch_flush(&mut self, e: &TouchFlushEvent) {
        let _ = writeln!(
            self.writer,
            "[touch] frame={} pointers={} resampled={}",
            e.frame_count, e.pointers, e.resampled,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} total={:.1}µs passes={} rebuilt={} laid_out={} rendered={}{}",
            s.frame_count,
            us(s.total_nanos()),
            s.rebuild_passes,
            s.rebuilt,
            s.laid_out,
            s.rendered,
            if s.carried_over { " carried_over" } else { "" },
        );
    }

    fn on_rebuilt_components(&mut self, frame_count: u64, nodes: &[NodeId]) {
        let _ = writeln!(self.writer, "[rebuilt] frame={frame_count} {nodes:?}");
    }

    fn on_laid_out_nodes(&mut self, frame_count: u64, nodes: &[NodeId]) {
        let _ = writeln!(self.writer, "[laid_out] frame={frame_count} n={}", nodes.len());
    }
}
