// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch resampling onto the frame timebase.
//!
//! Touch panels sample at their own rate, so the moves batched during one
//! frame rarely line up with the moment the frame represents. Resampling
//! projects each pointer onto a single target time:
//!
//! 1. Average the previous frame's samples (the *history* window) and the
//!    current frame's samples into two mean points `(p0, t0)` and `(p1, t1)`.
//! 2. If the target lies strictly between `t0` and `t1`, interpolate with
//!    `alpha = (target - t0) / (t1 - t0)`.
//! 3. If the target lies after `t1`, extrapolate from `p1` along the same
//!    velocity with `alpha = (target - t1) / (t1 - t0)`. The extrapolation is
//!    not clamped.
//! 4. Otherwise (`t1 <= t0`, the windows are at least the interpolation
//!    threshold apart, the target is at or before `t0`, or it equals `t1`)
//!    give up and use the raw sample nearest to the target.
//!
//! Window and screen coordinates are resampled independently.

use alloc::vec::Vec;

use kurbo::Point;

use crate::input::TouchEvent;
use crate::time::{Duration, HostTime};

/// The mean of a window of samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanSample {
    /// Mean window position.
    pub position: Point,
    /// Mean screen position.
    pub screen_position: Point,
    /// Mean sample time.
    pub time: HostTime,
}

/// Averages a window of samples. Returns `None` for an empty window.
#[must_use]
pub fn average_point(events: &[TouchEvent]) -> Option<MeanSample> {
    if events.is_empty() {
        return None;
    }
    let n = events.len() as f64;
    let mut position = (0.0, 0.0);
    let mut screen = (0.0, 0.0);
    let mut time_sum: u128 = 0;
    for e in events {
        position.0 += e.position.x;
        position.1 += e.position.y;
        screen.0 += e.screen_position.x;
        screen.1 += e.screen_position.y;
        time_sum += u128::from(e.time.nanos());
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the mean of u64 timestamps fits in u64"
    )]
    let time = HostTime((time_sum / events.len() as u128) as u64);
    Some(MeanSample {
        position: Point::new(position.0 / n, position.1 / n),
        screen_position: Point::new(screen.0 / n, screen.1 / n),
        time,
    })
}

/// Projects one coordinate pair onto `target`.
///
/// `history` is `(p0, t0)`, `current` is `(p1, t1)`. Returns `None` when no
/// adjustment should be made (see the module docs for the degenerate cases).
#[must_use]
pub fn linear_interpolation(
    history: (Point, HostTime),
    current: (Point, HostTime),
    target: HostTime,
    threshold: Duration,
) -> Option<Point> {
    let (p0, t0) = history;
    let (p1, t1) = current;
    if t1 <= t0 || target <= t0 || target == t1 {
        return None;
    }
    let span = t1 - t0;
    if span >= threshold {
        return None;
    }
    let span = span.nanos() as f64;
    if target < t1 {
        let alpha = (target - t0).nanos() as f64 / span;
        Some(p0.lerp(p1, alpha))
    } else {
        let alpha = (target - t1).nanos() as f64 / span;
        Some(p1 + (p1 - p0) * alpha)
    }
}

/// Returns the sample whose time is closest to `target`.
///
/// An exact match wins immediately; ties keep the earlier sample.
#[must_use]
pub fn nearest_sample(events: &[TouchEvent], target: HostTime) -> Option<&TouchEvent> {
    let mut best: Option<(&TouchEvent, Duration)> = None;
    for e in events {
        let gap = e.time.abs_diff(target);
        if gap == Duration::ZERO {
            return Some(e);
        }
        if best.is_none_or(|(_, g)| gap < g) {
            best = Some((e, gap));
        }
    }
    best.map(|(e, _)| e)
}

/// Produces the single sample dispatched for one pointer this frame.
///
/// `history` is the pointer's window from the previous frame, `current` its
/// window from this frame (oldest first). When resampling succeeds the result
/// is the latest current sample moved to the projected positions and stamped
/// with `target`, carrying `current` as its history. Otherwise it is the raw
/// sample nearest to `target`. Returns `None` only for an empty `current`.
#[must_use]
pub fn resample_touch_event(
    history: &[TouchEvent],
    current: &[TouchEvent],
    target: HostTime,
    threshold: Duration,
) -> Option<TouchEvent> {
    let latest = current.last()?;
    let projected = average_point(history).zip(average_point(current)).and_then(|(h, c)| {
        let position =
            linear_interpolation((h.position, h.time), (c.position, c.time), target, threshold)?;
        let screen_position = linear_interpolation(
            (h.screen_position, h.time),
            (c.screen_position, c.time),
            target,
            threshold,
        )?;
        Some((position, screen_position))
    });
    match projected {
        Some((position, screen_position)) => Some(TouchEvent {
            position,
            screen_position,
            time: target,
            history: current.iter().cloned().map(strip_history).collect(),
            ..latest.clone()
        }),
        None => nearest_sample(current, target).cloned(),
    }
}

fn strip_history(mut event: TouchEvent) -> TouchEvent {
    event.history = Vec::new();
    event
}
