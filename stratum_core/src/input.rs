// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input event types delivered to the frame driver.
//!
//! Positions are in logical pixels: `position` is relative to the window
//! content, `screen_position` to the display. All timestamps share the vsync
//! clock (see [`HostTime`]).

use alloc::vec::Vec;

use kurbo::Point;

use crate::time::HostTime;

/// Phase of a touch pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TouchType {
    /// The pointer went down.
    Down,
    /// The pointer moved while down.
    Move,
    /// The pointer lifted.
    Up,
    /// The system took the pointer away.
    Cancel,
}

impl TouchType {
    /// Returns whether this phase ends the pointer's gesture.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// One touch sample.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    /// Pointer identifier, stable for the pointer's gesture.
    pub id: i32,
    /// Position in window coordinates.
    pub position: Point,
    /// Position in screen coordinates.
    pub screen_position: Point,
    /// Sample time.
    pub time: HostTime,
    /// Phase of the pointer.
    pub kind: TouchType,
    /// Earlier samples folded into this one, oldest first.
    pub history: Vec<TouchEvent>,
}

impl TouchEvent {
    /// Creates a sample whose screen position equals its window position.
    #[must_use]
    pub fn new(id: i32, kind: TouchType, position: Point, time: HostTime) -> Self {
        Self {
            id,
            position,
            screen_position: position,
            time,
            kind,
            history: Vec::new(),
        }
    }

    /// Sets the screen position.
    #[must_use]
    pub fn with_screen_position(mut self, screen_position: Point) -> Self {
        self.screen_position = screen_position;
        self
    }
}

/// Mouse button action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseAction {
    /// A button went down.
    Press,
    /// A button went up.
    Release,
    /// The cursor moved.
    Move,
}

/// One mouse event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    /// Cursor position in window coordinates.
    pub position: Point,
    /// What happened.
    pub action: MouseAction,
    /// Event time.
    pub time: HostTime,
    /// Set on moves the driver replays after layout so hover state follows
    /// content that moved under a still cursor.
    pub synthetic: bool,
}

/// Key action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// The key went down (or repeated).
    Down,
    /// The key went up.
    Up,
}

/// One key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Platform key code.
    pub code: u32,
    /// What happened.
    pub action: KeyAction,
    /// Event time.
    pub time: HostTime,
}

/// One scroll/axis event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisEvent {
    /// Pointer position in window coordinates.
    pub position: Point,
    /// Horizontal scroll amount.
    pub horizontal: f64,
    /// Vertical scroll amount.
    pub vertical: f64,
    /// Event time.
    pub time: HostTime,
}
