//! Screen-space geometry for the filmstrip and drag anchors.

use clipline_common::config::EditorSettings;
use serde::{Deserialize, Serialize};

use crate::clip::Clip;
use crate::trim::TrimWindow;

/// A rectangle in host screen coordinates, captured at drag start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A rectangle with zero or invalid width has not been laid out yet.
    pub fn is_laid_out(&self) -> bool {
        self.width.is_finite() && self.width > 0.0 && self.left.is_finite()
    }

    /// Horizontal position of `pointer_x` across the rect, clamped to `[0, 1]`.
    /// Returns `None` when the rect has not been laid out.
    pub fn fraction_at(&self, pointer_x: f64) -> Option<f64> {
        if !self.is_laid_out() || !pointer_x.is_finite() {
            return None;
        }
        Some(((pointer_x - self.left) / self.width).clamp(0.0, 1.0))
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// How a clip's trimmed window maps onto its fixed-width thumbnail strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualGeometry {
    /// Rendered width of the visible window.
    pub width: f64,
    /// How far the full-duration strip is shifted left.
    pub shift: f64,
}

impl VisualGeometry {
    /// Rendered width, never narrower than `min_width`.
    pub fn display_width(&self, min_width: f64) -> f64 {
        self.width.max(min_width)
    }
}

/// Layout constants for the filmstrip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilmstripLayout {
    /// Width representing a clip's full duration.
    pub full_width: f64,
    /// Minimum rendered width.
    pub min_width: f64,
}

impl Default for FilmstripLayout {
    fn default() -> Self {
        Self {
            full_width: 224.0,
            min_width: 40.0,
        }
    }
}

impl From<&EditorSettings> for FilmstripLayout {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            full_width: settings.filmstrip_full_width_px,
            min_width: settings.filmstrip_min_width_px,
        }
    }
}

impl FilmstripLayout {
    /// Geometry for one clip at the given duration.
    pub fn geometry(&self, clip: &Clip, duration: f64) -> VisualGeometry {
        clip.visual_geometry(duration, self.full_width)
    }

    /// Rendered width for one clip at the given duration.
    pub fn display_width(&self, clip: &Clip, duration: f64) -> f64 {
        self.geometry(clip, duration).display_width(self.min_width)
    }
}

/// Playhead position as a percentage of the visible window.
pub fn playhead_percent(window: &TrimWindow, media_time: f64) -> f64 {
    let visible = window.visible_duration();
    if visible <= 0.0 {
        return 0.0;
    }
    (window.offset_of(media_time) / visible * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_clamps_outside_pointer() {
        let rect = ScreenRect::new(100.0, 0.0, 200.0, 64.0);
        assert_eq!(rect.fraction_at(50.0), Some(0.0));
        assert_eq!(rect.fraction_at(200.0), Some(0.5));
        assert_eq!(rect.fraction_at(900.0), Some(1.0));
    }

    #[test]
    fn test_unlaid_rect_yields_no_fraction() {
        let rect = ScreenRect::new(0.0, 0.0, 0.0, 0.0);
        assert!(!rect.is_laid_out());
        assert_eq!(rect.fraction_at(10.0), None);
    }

    #[test]
    fn test_display_width_respects_minimum() {
        let layout = FilmstripLayout::default();
        let clip = Clip::ready("a", "a.mp4").with_trim(Some(0.0), Some(0.5));
        let geometry = layout.geometry(&clip, 4.0);
        assert!((geometry.width - 28.0).abs() < 1e-9);
        assert!((layout.display_width(&clip, 4.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_playhead_percent() {
        let window = TrimWindow { start: 1.0, end: 3.0 };
        assert!((playhead_percent(&window, 2.0) - 50.0).abs() < 1e-9);
        assert_eq!(playhead_percent(&window, 0.0), 0.0);
        assert_eq!(playhead_percent(&window, 9.0), 100.0);
    }
}
