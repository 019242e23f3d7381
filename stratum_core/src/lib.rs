// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame scheduling core for a retained-mode UI engine.
//!
//! `stratum_core` turns vsync callbacks into an ordered frame of UI work:
//! rebuilding dirty components, laying out and painting dirty nodes, and
//! dispatching input resampled onto the frame timebase. It is `no_std`
//! compatible (with `alloc`) and single-threaded; hosts drive it from their
//! UI thread.
//!
//! # Architecture
//!
//! ```text
//!   WindowHost (vsync)       platform input
//!       │                         │
//!       ▼                         ▼
//!   FrameDriver::flush_vsync ◄── on_touch_event / on_mouse_event / ...
//!       │
//!       ├── delayed tasks, animations, resampled touch
//!       ├── DirtyComponents ──► NodeTree::update_component (≤ 3 passes)
//!       ├── TaskScheduler::flush_task (layout ─► hooks ─► render)
//!       └── activation, focus, area observers, mouse replay, after-render
//! ```
//!
//! **[`node`]**: Struct-of-arrays node tree with generational handles,
//! disappearing children, and main-tree attachment.
//!
//! **[`component`]**: Rebuildable component nodes with identifier-tracked
//! children, lazy groups, and recycle hooks.
//!
//! **[`scheduler`]**: Per-page dirty layout and render sets and the frame
//! hook lists.
//!
//! **[`driver`]**: The [`FrameDriver`](driver::FrameDriver) running the
//! fixed per-vsync phase order.
//!
//! **[`resample`]**: Touch resampling by interpolation and extrapolation of
//! windowed means.
//!
//! **[`backend`]**: Traits the host implements (window, events, executor,
//! animations, frame observer).
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame instrumentation, with the zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-frame
//!   lists of rebuilt components and laid-out nodes.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod component;
pub mod config;
pub mod dirty;
pub mod driver;
pub mod focus;
pub mod input;
pub mod node;
pub mod resample;
pub mod scheduler;
pub mod time;
pub mod trace;
