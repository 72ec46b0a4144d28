//! Trim model: per-clip trim windows and their clamping rules.
//!
//! Trim values are stored optionally on [`Clip`]; an absent start means `0`
//! and an absent end means "the full duration, whenever it is known". Every
//! operation here takes the duration to use (resolved or fallback) as input,
//! so the model never has to know where durations come from.
//!
//! Out-of-range input is never an error. Proposals are clamped so that
//! `0 <= trim_start < trim_end <= duration` holds after every write.

use clipline_common::config::EditorSettings;

use crate::clip::Clip;
use crate::geometry::VisualGeometry;

/// Limits applied when clamping trim proposals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimLimits {
    /// Shortest window a trim edit may produce.
    pub min_segment: f64,
}

impl Default for TrimLimits {
    fn default() -> Self {
        Self { min_segment: 0.5 }
    }
}

impl From<&EditorSettings> for TrimLimits {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            min_segment: settings.min_segment_secs.max(0.0),
        }
    }
}

/// Which boundary of the trim window an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrimHandle {
    Start,
    End,
}

/// Resolved `[start, end]` window of a clip, in media seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    /// `end - start`.
    pub fn visible_duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Media time at `fraction` (clamped to `[0, 1]`) through the window.
    pub fn time_at_fraction(&self, fraction: f64) -> f64 {
        self.start + fraction.clamp(0.0, 1.0) * self.visible_duration()
    }

    /// Clamp a media time into the window.
    pub fn clamp_time(&self, secs: f64) -> f64 {
        secs.max(self.start).min(self.end)
    }

    /// Offset of `secs` from the window start.
    pub fn offset_of(&self, secs: f64) -> f64 {
        self.clamp_time(secs) - self.start
    }

    /// Whether `secs` has reached the end, allowing `epsilon` slack.
    pub fn reached_end(&self, secs: f64, epsilon: f64) -> bool {
        secs >= self.end - epsilon
    }

    /// Whether `secs` lies before the start by more than `epsilon`.
    pub fn before_start(&self, secs: f64, epsilon: f64) -> bool {
        secs < self.start - epsilon
    }

    /// Whether the window covers the whole `[0, duration]` range.
    pub fn is_full_range(&self, duration: f64, tolerance: f64) -> bool {
        self.start <= tolerance && self.end >= duration - tolerance
    }

    /// Value of the given boundary.
    pub fn boundary(&self, handle: TrimHandle) -> f64 {
        match handle {
            TrimHandle::Start => self.start,
            TrimHandle::End => self.end,
        }
    }
}

impl Clip {
    /// The effective trim window given the clip's duration.
    pub fn trim_window(&self, duration: f64) -> TrimWindow {
        let start = self.trim_start.filter(|s| s.is_finite()).unwrap_or(0.0);
        let end = self.trim_end.filter(|e| e.is_finite()).unwrap_or(duration);
        TrimWindow { start, end }
    }

    /// `trim_end - trim_start`.
    pub fn visible_duration(&self, duration: f64) -> f64 {
        self.trim_window(duration).visible_duration()
    }

    /// Clamp a proposed start to `[0, trim_end - min_segment]` without writing it.
    pub fn clamp_trim_start(&self, proposed: f64, duration: f64, limits: TrimLimits) -> f64 {
        let window = self.trim_window(duration);
        if !proposed.is_finite() {
            return window.start;
        }
        let upper = (window.end - limits.min_segment).max(0.0);
        proposed.max(0.0).min(upper)
    }

    /// Clamp a proposed end to `[trim_start + min_segment, duration]` without writing it.
    ///
    /// The duration bound wins when the two bounds cross.
    pub fn clamp_trim_end(&self, proposed: f64, duration: f64, limits: TrimLimits) -> f64 {
        let window = self.trim_window(duration);
        if !proposed.is_finite() {
            return window.end;
        }
        let upper = duration;
        let lower = (window.start + limits.min_segment).min(upper);
        proposed.min(upper).max(lower)
    }

    /// Clamp a proposal for either boundary.
    pub fn clamp_boundary(
        &self,
        handle: TrimHandle,
        proposed: f64,
        duration: f64,
        limits: TrimLimits,
    ) -> f64 {
        match handle {
            TrimHandle::Start => self.clamp_trim_start(proposed, duration, limits),
            TrimHandle::End => self.clamp_trim_end(proposed, duration, limits),
        }
    }

    /// Set the trim start, clamped. Returns the stored value.
    pub fn set_trim_start(&mut self, new_start: f64, duration: f64, limits: TrimLimits) -> f64 {
        let value = self.clamp_trim_start(new_start, duration, limits);
        self.trim_start = Some(value);
        value
    }

    /// Set the trim end, clamped. Returns the stored value.
    pub fn set_trim_end(&mut self, new_end: f64, duration: f64, limits: TrimLimits) -> f64 {
        let value = self.clamp_trim_end(new_end, duration, limits);
        self.trim_end = Some(value);
        value
    }

    /// Set either boundary, clamped. Returns the stored value.
    pub fn set_boundary(
        &mut self,
        handle: TrimHandle,
        proposed: f64,
        duration: f64,
        limits: TrimLimits,
    ) -> f64 {
        match handle {
            TrimHandle::Start => self.set_trim_start(proposed, duration, limits),
            TrimHandle::End => self.set_trim_end(proposed, duration, limits),
        }
    }

    /// Pull stored trims back inside `[0, duration]` after the real duration
    /// becomes known. Returns `true` if anything changed.
    pub fn reclamp_to_duration(&mut self, duration: f64, limits: TrimLimits) -> bool {
        if !(duration.is_finite() && duration > 0.0) {
            return false;
        }
        let before = (self.trim_start, self.trim_end);
        let window = self.trim_window(duration);

        let end = window.end.min(duration).max(0.0);
        let mut start = window.start.max(0.0);
        if end - start < limits.min_segment {
            start = (end - limits.min_segment).max(0.0);
        }
        let end = if end <= start { duration } else { end };

        if self.trim_end.is_some() {
            self.trim_end = Some(end);
        }
        if self.trim_start.is_some() || start > 0.0 {
            self.trim_start = Some(start);
        }

        before != (self.trim_start, self.trim_end)
    }

    /// Filmstrip geometry: the visible window as a crop of a fixed-width strip.
    pub fn visual_geometry(&self, duration: f64, full_width: f64) -> VisualGeometry {
        if !(duration.is_finite() && duration > 0.0) {
            return VisualGeometry {
                width: full_width,
                shift: 0.0,
            };
        }
        let window = self.trim_window(duration);
        VisualGeometry {
            width: full_width * window.visible_duration() / duration,
            shift: full_width * window.start / duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limits() -> TrimLimits {
        TrimLimits::default()
    }

    #[test]
    fn test_untrimmed_window_is_full_range() {
        let clip = Clip::ready("a", "a.mp4");
        let window = clip.trim_window(5.0);
        assert_eq!(window, TrimWindow { start: 0.0, end: 5.0 });
        assert!(window.is_full_range(5.0, 0.1));
        assert!((clip.visible_duration(5.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_start_clamps_exactly_to_end_minus_min_segment() {
        let mut clip = Clip::ready("a", "a.mp4").with_trim(None, Some(3.0));
        let stored = clip.set_trim_start(10.0, 5.0, limits());
        assert!((stored - 2.5).abs() < 1e-12);
        assert_eq!(clip.trim_start, Some(2.5));
    }

    #[test]
    fn test_end_clamps_exactly_to_start_plus_min_segment() {
        let mut clip = Clip::ready("a", "a.mp4").with_trim(Some(1.0), Some(4.0));
        let stored = clip.set_trim_end(0.2, 5.0, limits());
        assert!((stored - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_end_never_exceeds_duration() {
        let mut clip = Clip::ready("a", "a.mp4");
        assert!((clip.set_trim_end(9.0, 5.0, limits()) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_start_clamps_to_zero() {
        let mut clip = Clip::ready("a", "a.mp4");
        assert_eq!(clip.set_trim_start(-2.0, 5.0, limits()), 0.0);
    }

    #[test]
    fn test_non_finite_proposal_keeps_current_value() {
        let mut clip = Clip::ready("a", "a.mp4").with_trim(Some(1.0), Some(3.0));
        assert_eq!(clip.set_trim_start(f64::NAN, 5.0, limits()), 1.0);
        assert_eq!(clip.set_trim_end(f64::INFINITY, 5.0, limits()), 3.0);
    }

    #[test]
    fn test_clip_shorter_than_min_segment_keeps_full_range() {
        let mut clip = Clip::ready("a", "a.mp4");
        assert_eq!(clip.set_trim_start(0.1, 0.3, limits()), 0.0);
        assert!((clip.set_trim_end(0.0, 0.3, limits()) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_reclamp_pulls_stale_end_inside_duration() {
        let mut clip = Clip::ready("a", "a.mp4").with_trim(Some(3.8), Some(6.0));
        assert!(clip.reclamp_to_duration(3.0, limits()));
        assert_eq!(clip.trim_end, Some(3.0));
        assert_eq!(clip.trim_start, Some(2.5));
    }

    #[test]
    fn test_reclamp_is_noop_for_valid_window() {
        let mut clip = Clip::ready("a", "a.mp4").with_trim(Some(1.0), Some(3.0));
        assert!(!clip.reclamp_to_duration(5.0, limits()));
        assert!(!clip.reclamp_to_duration(f64::NAN, limits()));
    }

    #[test]
    fn test_visual_geometry_crops_and_shifts() {
        let clip = Clip::ready("a", "a.mp4").with_trim(Some(1.0), Some(3.0));
        let geometry = clip.visual_geometry(4.0, 224.0);
        assert!((geometry.width - 112.0).abs() < 1e-9);
        assert!((geometry.shift - 56.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_at_fraction_hits_window_bounds() {
        let window = TrimWindow { start: 1.0, end: 3.0 };
        assert_eq!(window.time_at_fraction(0.0), 1.0);
        assert_eq!(window.time_at_fraction(1.0), 3.0);
        assert_eq!(window.time_at_fraction(7.0), 3.0);
        assert_eq!(window.time_at_fraction(0.5), 2.0);
    }

    proptest! {
        #[test]
        fn prop_trim_edits_preserve_window_invariant(
            duration in 0.6f64..120.0,
            edits in proptest::collection::vec((any::<bool>(), -50.0f64..200.0), 1..24),
        ) {
            let mut clip = Clip::ready("p", "p.mp4");
            for (is_start, proposed) in edits {
                if is_start {
                    clip.set_trim_start(proposed, duration, limits());
                } else {
                    clip.set_trim_end(proposed, duration, limits());
                }
                let window = clip.trim_window(duration);
                prop_assert!(window.start >= 0.0);
                prop_assert!(window.start < window.end);
                prop_assert!(window.end <= duration + 1e-9);
            }
        }

        #[test]
        fn prop_reclamp_restores_invariant(
            start in -5.0f64..50.0,
            end in -5.0f64..50.0,
            duration in 0.6f64..30.0,
        ) {
            let mut clip = Clip::ready("p", "p.mp4").with_trim(Some(start), Some(end));
            clip.reclamp_to_duration(duration, limits());
            let window = clip.trim_window(duration);
            prop_assert!(window.start >= 0.0);
            prop_assert!(window.start < window.end);
            prop_assert!(window.end <= duration + 1e-9);
        }
    }
}
