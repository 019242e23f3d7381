// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame driver configuration.

use kurbo::Rect;

use crate::time::Duration;

/// Upper bound on rebuild passes per frame.
///
/// Rebuilds can enqueue further rebuilds; whatever is still dirty after this
/// many passes carries over to the next frame.
pub const MAX_REBUILD_PASSES: u32 = 3;

/// Configuration for the [`FrameDriver`](crate::driver::FrameDriver).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriverConfig {
    /// Added to `vsync - period` to form the touch resampling target.
    pub resample_guard: Duration,
    /// History and current touch windows at least this far apart are not
    /// interpolated.
    pub interpolation_threshold: Duration,
    /// Whether batched touch moves are resampled at all.
    pub touch_resampling: bool,
    /// Refresh period assumed when no window host is installed.
    pub fallback_vsync_period: Duration,
    /// Viewport for visible-area observers; `None` uses the root's geometry.
    pub visible_area_viewport: Option<Rect>,
}

impl DriverConfig {
    /// Defaults for a 60 Hz touch display.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resample_guard: Duration::from_millis(1),
            interpolation_threshold: Duration::from_millis(100),
            touch_resampling: true,
            // ~16.67ms.
            fallback_vsync_period: Duration(16_666_667),
            visible_area_viewport: None,
        }
    }

    /// Defaults with touch resampling turned off (raw latest samples are
    /// dispatched).
    #[must_use]
    pub const fn without_resampling() -> Self {
        Self {
            touch_resampling: false,
            ..Self::new()
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.resample_guard.nanos(), 1_000_000);
        assert_eq!(config.interpolation_threshold.nanos(), 100_000_000);
        assert!(config.touch_resampling);
        assert!(!DriverConfig::without_resampling().touch_resampling);
        assert_eq!(MAX_REBUILD_PASSES, 3);
    }
}
