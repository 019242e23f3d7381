// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traced frame loop over a real [`FrameDriver`].
//!
//! A list component grows one row per 40px of drag distance. Sixty frames
//! run against a wall-clock window while a synthetic finger drags across the
//! screen, two move samples per frame. Every frame is traced to a
//! [`PrettyPrintSink`] on stdout and a [`RecorderSink`], and the recording is
//! exported as `frame_trace.json` in Chrome trace format.

use std::cell::Cell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;
use std::time::Instant;

use kurbo::{Point, Rect};
use stratum_core::backend::{EventDispatcher, WindowHost};
use stratum_core::component::ComponentNode;
use stratum_core::driver::FrameDriver;
use stratum_core::input::{TouchEvent, TouchType};
use stratum_core::node::{NodeBehavior, NodeId};
use stratum_core::scheduler::RenderTask;
use stratum_core::time::{Duration, HostTime};
use stratum_core::trace::{
    BuildPassEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, TouchFlushEvent, TraceSink,
    Tracer, VsyncEvent,
};
use stratum_debug::pretty::PrettyPrintSink;
use stratum_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 60;
const VSYNC_PERIOD: Duration = Duration(16_666_667);
const ROW_HEIGHT: f64 = 20.0;
const MAX_ROWS: usize = 8;

/// Window backed by a monotonic wall clock.
#[derive(Debug)]
struct ClockWindow {
    epoch: Instant,
}

impl ClockWindow {
    fn now_at(epoch: Instant) -> HostTime {
        HostTime(u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX))
    }
}

impl WindowHost for ClockWindow {
    fn vsync_period(&self) -> Duration {
        VSYNC_PERIOD
    }

    // Frames are paced by the loop in `main`.
    fn request_vsync(&mut self) {}

    fn now(&self) -> HostTime {
        Self::now_at(self.epoch)
    }
}

/// Tracks the finger's x position and whether it moved this frame.
#[derive(Debug)]
struct DragDispatcher {
    x: Rc<Cell<f64>>,
    moved: Rc<Cell<bool>>,
}

impl EventDispatcher for DragDispatcher {
    fn dispatch_touch(&mut self, event: &TouchEvent) {
        if event.kind == TouchType::Move {
            self.x.set(event.position.x);
            self.moved.set(true);
        }
    }
}

/// A row whose width follows the drag.
#[derive(Debug)]
struct Bar {
    row: usize,
    width: Rc<Cell<f64>>,
}

impl NodeBehavior for Bar {
    fn layout(&mut self, _node: NodeId, _current: Rect, _force: bool) -> Option<Rect> {
        let y = self.row as f64 * ROW_HEIGHT;
        Some(Rect::new(0.0, y, self.width.get(), y + ROW_HEIGHT - 2.0))
    }

    fn create_render_task(&mut self, _node: NodeId) -> Option<RenderTask> {
        Some(RenderTask::Background(Box::new(|| {})))
    }
}

/// Forwards every event to both sinks.
struct Both<'a> {
    pretty: &'a mut PrettyPrintSink,
    recorder: &'a mut RecorderSink,
}

impl TraceSink for Both<'_> {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.pretty.on_vsync(e);
        self.recorder.on_vsync(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_build_pass(&mut self, e: &BuildPassEvent) {
        self.pretty.on_build_pass(e);
        self.recorder.on_build_pass(e);
    }

    fn on_touch_flush(&mut self, e: &TouchFlushEvent) {
        self.pretty.on_touch_flush(e);
        self.recorder.on_touch_flush(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.pretty.on_frame_summary(s);
        self.recorder.on_frame_summary(s);
    }

    fn on_rebuilt_components(&mut self, frame_count: u64, nodes: &[NodeId]) {
        self.pretty.on_rebuilt_components(frame_count, nodes);
        self.recorder.on_rebuilt_components(frame_count, nodes);
    }

    fn on_laid_out_nodes(&mut self, frame_count: u64, nodes: &[NodeId]) {
        self.pretty.on_laid_out_nodes(frame_count, nodes);
        self.recorder.on_laid_out_nodes(frame_count, nodes);
    }
}

fn row_count(x: f64) -> usize {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "clamped to a small non-negative range first"
    )]
    let rows = (x / 40.0).clamp(0.0, (MAX_ROWS - 1) as f64) as usize;
    rows + 1
}

fn touch(kind: TouchType, x: f64, time: HostTime) -> TouchEvent {
    TouchEvent::new(0, kind, Point::new(x, 100.0), time)
}

fn main() -> std::io::Result<()> {
    let epoch = Instant::now();
    let x = Rc::new(Cell::new(0.0));
    let moved = Rc::new(Cell::new(false));

    // -- driver ------------------------------------------------------------
    let mut driver = FrameDriver::default();
    driver.set_window(Box::new(ClockWindow { epoch }));
    driver.set_dispatcher(Box::new(DragDispatcher {
        x: x.clone(),
        moved: moved.clone(),
    }));
    driver.resize(Rect::new(0.0, 0.0, 400.0, 800.0));

    let drag = x.clone();
    let list = driver.tree_mut().create_component(
        "List",
        ComponentNode::new().with_rebuild(move |cx| {
            for row in 0..row_count(drag.get()) {
                let width = drag.clone();
                let id = cx.child_by_id_or_create(&format!("row-{row}"), move |cx| {
                    cx.create_with_behavior("Bar", Bar { row, width })
                });
                cx.mount(id);
            }
        }),
    );
    let root = driver.root();
    driver.add_child(root, list, None);
    driver.add_dirty_component(list);
    driver.post_delayed(Duration::from_millis(250), |driver| {
        println!("[demo] delayed task ran, {} nodes live", driver.tree().node_count());
    });

    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- frames ------------------------------------------------------------
    let mut finger = 0.0;
    for frame_count in 1..=FRAME_COUNT {
        let deadline = epoch + std::time::Duration::from_nanos(frame_count * VSYNC_PERIOD.nanos());
        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
        let vsync = ClockWindow::now_at(epoch);

        match frame_count {
            5 => driver.on_touch_event(touch(TouchType::Down, finger, vsync)),
            6..=44 => {
                for back in [Duration::from_millis(12), Duration::from_millis(4)] {
                    finger += 4.0;
                    driver.on_touch_event(touch(
                        TouchType::Move,
                        finger,
                        vsync.saturating_sub(back),
                    ));
                }
            }
            45 => driver.on_touch_event(touch(TouchType::Up, finger, vsync)),
            _ => {}
        }

        let mut both = Both {
            pretty: &mut pretty,
            recorder: &mut recorder,
        };
        driver.flush_vsync_traced(vsync, frame_count, &mut Tracer::new(&mut both));

        if moved.replace(false) {
            driver.add_dirty_component(list);
            let rows: Vec<NodeId> = driver.tree().children(list).collect();
            for row in rows {
                driver.add_dirty_layout_node(row);
            }
        }
    }

    // -- export ------------------------------------------------------------
    let path = "frame_trace.json";
    let mut out = BufWriter::new(File::create(path)?);
    stratum_debug::chrome::export(recorder.as_bytes(), &mut out)?;
    println!(
        "[demo] wrote {path} ({} recorded bytes, {} rows)",
        recorder.as_bytes().len(),
        driver.tree().children(list).count(),
    );
    Ok(())
}
