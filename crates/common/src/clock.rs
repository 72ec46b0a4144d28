//! Timing utilities for playback and export.
//!
//! Media time in Clipline is always expressed as `f64` seconds. This module
//! provides:
//! - Tolerance comparisons for media-time values
//! - A session clock for timing export runs
//! - Boundary drift measurement for recorded trim windows
//! - A frame-rate controller for display-frame pacing

use std::time::{Duration, Instant};

/// Whether two media-time values are within `tolerance` seconds.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Format seconds as `m:ss` (floored), as shown on the playhead.
pub fn format_timecode(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    let minutes = (secs / 60.0).floor() as u64;
    let seconds = (secs % 60.0).floor() as u64;
    format!("{minutes}:{seconds:02}")
}

/// Wall and monotonic anchor for a long-running operation (an export run).
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,
    epoch_wall: String,
}

impl SessionClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Whether more than `limit` has passed since the clock started.
    pub fn exceeded(&self, limit: Duration) -> bool {
        self.epoch.elapsed() > limit
    }

    /// Wall-clock time at start (RFC 3339).
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Difference between where a recording was meant to stop and where it did.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryDrift {
    /// Intended boundary (seconds).
    pub target_secs: f64,
    /// Observed media time when the boundary was detected (seconds).
    pub observed_secs: f64,
}

impl BoundaryDrift {
    /// Drift in seconds (positive = observed past the target).
    pub fn drift_secs(&self) -> f64 {
        self.observed_secs - self.target_secs
    }

    /// Drift expressed in frames at the given rate.
    pub fn drift_frames(&self, fps: u32) -> f64 {
        self.drift_secs() * fps as f64
    }

    /// Whether drift exceeds an acceptable number of frames.
    pub fn exceeds_frames(&self, fps: u32, max_frames: f64) -> bool {
        self.drift_frames(fps).abs() > max_frames
    }
}

/// Frame rate controller for display-frame pacing.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval between ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.target_interval_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(1.96, 2.0, 0.05));
        assert!(!within_tolerance(1.9, 2.0, 0.05));
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "0:00");
        assert_eq!(format_timecode(4.9), "0:04");
        assert_eq!(format_timecode(65.2), "1:05");
        assert_eq!(format_timecode(f64::NAN), "0:00");
    }

    #[test]
    fn test_boundary_drift() {
        let drift = BoundaryDrift {
            target_secs: 3.0,
            observed_secs: 3.05,
        };
        assert!((drift.drift_secs() - 0.05).abs() < 1e-9);
        assert!((drift.drift_frames(30) - 1.5).abs() < 1e-6);
        assert!(!drift.exceeds_frames(30, 2.0));
        assert!(drift.exceeds_frames(30, 1.0));
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(60);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(1_000_000)); // 1ms later, too soon
        assert!(ctrl.should_tick(17_000_000)); // ~17ms later, should fire (60Hz ~ 16.67ms)
    }

    #[test]
    fn test_session_clock_elapsed() {
        let clock = SessionClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(!clock.exceeded(Duration::from_secs(60)));
        assert!(!clock.epoch_wall().is_empty());
    }
}
