// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary trace recording.
//!
//! [`RecorderSink`] appends every event to an in-memory byte buffer. Each
//! record is a one-byte tag followed by little-endian fields. The buffer can
//! be written to disk and read back with [`decode`], or converted with
//! [`chrome::export`](crate::chrome::export).

use stratum_core::node::NodeId;
use stratum_core::time::{Duration, HostTime};
use stratum_core::trace::{
    BuildPassEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TouchFlushEvent,
    TraceSink, VsyncEvent,
};

const TAG_VSYNC: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_BUILD_PASS: u8 = 4;
const TAG_TOUCH_FLUSH: u8 = 5;
const TAG_FRAME_SUMMARY: u8 = 6;
const TAG_REBUILT: u8 = 7;
const TAG_LAID_OUT: u8 = 8;

/// A [`TraceSink`] that records events into a byte buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "phase indices are below PhaseKind::COUNT"
    )]
    fn write_phase(&mut self, phase: PhaseKind) {
        self.write_u8(phase.index() as u8);
    }

    fn write_count(&mut self, tag: u8, frame_count: u64, nodes: &[NodeId]) {
        self.write_u8(tag);
        self.write_u64(frame_count);
        self.write_u32(u32::try_from(nodes.len()).unwrap_or(u32::MAX));
    }
}

impl TraceSink for RecorderSink {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.write_u8(TAG_VSYNC);
        self.write_u64(e.frame_count);
        self.write_u64(e.timestamp.nanos());
        self.write_u64(e.resample_timestamp.nanos());
        self.write_u64(e.vsync_period.nanos());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_count);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_count);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_build_pass(&mut self, e: &BuildPassEvent) {
        self.write_u8(TAG_BUILD_PASS);
        self.write_u64(e.frame_count);
        self.write_u32(e.pass);
        self.write_u32(e.rebuilt);
        self.write_u32(e.remaining);
    }

    fn on_touch_flush(&mut self, e: &TouchFlushEvent) {
        self.write_u8(TAG_TOUCH_FLUSH);
        self.write_u64(e.frame_count);
        self.write_u32(e.pointers);
        self.write_u32(e.resampled);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_count);
        self.write_u64(s.timestamp.nanos());
        for nanos in s.phase_nanos {
            self.write_u64(nanos);
        }
        self.write_u32(s.rebuild_passes);
        self.write_u32(s.rebuilt);
        self.write_u32(s.laid_out);
        self.write_u32(s.rendered);
        self.write_u8(u8::from(s.carried_over));
    }

    fn on_rebuilt_components(&mut self, frame_count: u64, nodes: &[NodeId]) {
        self.write_count(TAG_REBUILT, frame_count, nodes);
    }

    fn on_laid_out_nodes(&mut self, frame_count: u64, nodes: &[NodeId]) {
        self.write_count(TAG_LAID_OUT, frame_count, nodes);
    }
}

/// A decoded trace record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A vsync tick.
    Vsync(VsyncEvent),
    /// A phase started.
    PhaseBegin(PhaseBeginEvent),
    /// A phase ended.
    PhaseEnd(PhaseEndEvent),
    /// One rebuild pass finished.
    BuildPass(BuildPassEvent),
    /// Batched touches were dispatched.
    TouchFlush(TouchFlushEvent),
    /// End-of-frame summary.
    FrameSummary(FrameSummary),
    /// Number of components rebuilt in a frame.
    Rebuilt {
        /// Frame sequence number.
        frame_count: u64,
        /// Components rebuilt.
        count: u32,
    },
    /// Number of nodes laid out in a frame.
    LaidOut {
        /// Frame sequence number.
        frame_count: u64,
        /// Nodes laid out.
        count: u32,
    },
}

/// Decodes recorded bytes into an iterator of events.
///
/// Iteration stops at the first truncated record or unknown tag.
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter { bytes, pos: 0 }
}

/// Iterator over [`RecordedEvent`]s. See [`decode`].
#[derive(Debug)]
pub struct DecodeIter<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_u8(&mut self) -> Option<u8> {
        let v = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let end = self.pos.checked_add(4)?;
        let arr: [u8; 4] = self.bytes.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(u32::from_le_bytes(arr))
    }

    fn read_u64(&mut self) -> Option<u64> {
        let end = self.pos.checked_add(8)?;
        let arr: [u8; 8] = self.bytes.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(u64::from_le_bytes(arr))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::from_index(usize::from(self.read_u8()?))
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_event(&mut self) -> Option<RecordedEvent> {
        let tag = self.read_u8()?;
        let event = match tag {
            TAG_VSYNC => RecordedEvent::Vsync(VsyncEvent {
                frame_count: self.read_u64()?,
                timestamp: self.read_time()?,
                resample_timestamp: self.read_time()?,
                vsync_period: Duration(self.read_u64()?),
            }),
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin(PhaseBeginEvent {
                frame_count: self.read_u64()?,
                phase: self.read_phase()?,
                timestamp: self.read_time()?,
            }),
            TAG_PHASE_END => RecordedEvent::PhaseEnd(PhaseEndEvent {
                frame_count: self.read_u64()?,
                phase: self.read_phase()?,
                timestamp: self.read_time()?,
            }),
            TAG_BUILD_PASS => RecordedEvent::BuildPass(BuildPassEvent {
                frame_count: self.read_u64()?,
                pass: self.read_u32()?,
                rebuilt: self.read_u32()?,
                remaining: self.read_u32()?,
            }),
            TAG_TOUCH_FLUSH => RecordedEvent::TouchFlush(TouchFlushEvent {
                frame_count: self.read_u64()?,
                pointers: self.read_u32()?,
                resampled: self.read_u32()?,
            }),
            TAG_FRAME_SUMMARY => {
                let frame_count = self.read_u64()?;
                let timestamp = self.read_time()?;
                let mut phase_nanos = [0; PhaseKind::COUNT];
                for slot in &mut phase_nanos {
                    *slot = self.read_u64()?;
                }
                RecordedEvent::FrameSummary(FrameSummary {
                    frame_count,
                    timestamp,
                    phase_nanos,
                    rebuild_passes: self.read_u32()?,
                    rebuilt: self.read_u32()?,
                    laid_out: self.read_u32()?,
                    rendered: self.read_u32()?,
                    carried_over: self.read_u8()? != 0,
                })
            }
            TAG_REBUILT => RecordedEvent::Rebuilt {
                frame_count: self.read_u64()?,
                count: self.read_u32()?,
            },
            TAG_LAID_OUT => RecordedEvent::LaidOut {
                frame_count: self.read_u64()?,
                count: self.read_u32()?,
            },
            _ => return None,
        };
        Some(event)
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.read_event();
        if event.is_none() {
            // Poison the iterator so a truncated record is not re-read.
            self.pos = self.bytes.len();
        }
        event
    }
}
