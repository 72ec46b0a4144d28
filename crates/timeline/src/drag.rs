//! Scrub and trim-handle drag protocols.
//!
//! Both protocols anchor to the screen rectangle of the clip's rendered
//! (trimmed) filmstrip at drag start. Pointer moves are mapped through that
//! rectangle; pointer-up ends the session and drops the anchor.

use clipline_scene_model::{ScreenRect, TrimHandle};

use crate::editor::{EditorEvent, PointerCapture, SceneEditor};
use crate::media::MediaElement;
use crate::mode::InteractionMode;

/// Anchor state of a scrub drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubDrag {
    pub index: usize,
    pub rect: ScreenRect,
}

/// Anchor state of a trim-handle drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimDrag {
    pub index: usize,
    pub handle: TrimHandle,
    pub start_x: f64,
    /// Boundary value when the drag began.
    pub initial_value: f64,
    /// Visible duration when the drag began; pointer deltas scale by it.
    pub visible_at_start: f64,
    pub rect: ScreenRect,
}

impl TrimDrag {
    /// Proposed boundary for a pointer at `pointer_x`, before clamping.
    pub fn proposal(&self, pointer_x: f64) -> Option<f64> {
        if !self.rect.is_laid_out() || !pointer_x.is_finite() {
            return None;
        }
        let delta = (pointer_x - self.start_x) / self.rect.width * self.visible_at_start;
        Some(self.initial_value + delta)
    }
}

impl<M: MediaElement> SceneEditor<M> {
    /// Begin scrubbing the clip at `index`. The clip becomes active, playback
    /// pauses, and the first pointer position applies immediately. Clips
    /// that are not ready cannot be scrubbed.
    pub fn begin_scrub(&mut self, index: usize, rect: ScreenRect, pointer_x: f64) -> bool {
        if self.mode.is_rendering() || self.mode.is_dragging() {
            return false;
        }
        if !self.scene.clip(index).is_some_and(|c| c.is_playable()) {
            return false;
        }
        if self.scene.active_index() != Some(index) {
            self.select(index, false);
        } else if self.mode.is_playing() {
            self.pause();
        }

        self.mode = InteractionMode::Scrubbing(ScrubDrag { index, rect });
        self.emit(EditorEvent::PointerCapture {
            capture: PointerCapture::Acquired,
        });
        self.pointer_move(pointer_x);
        true
    }

    /// Begin dragging a trim handle of the clip at `index`. Pauses playback.
    pub fn begin_trim(
        &mut self,
        index: usize,
        handle: TrimHandle,
        rect: ScreenRect,
        pointer_x: f64,
    ) -> bool {
        if self.mode.is_rendering() || self.mode.is_dragging() {
            return false;
        }
        if !self.scene.clip(index).is_some_and(|c| c.is_playable()) {
            return false;
        }
        if self.scene.active_index() != Some(index) {
            self.select(index, false);
        } else if self.mode.is_playing() {
            self.pause();
        }
        let Some(window) = self.window_of(index) else {
            return false;
        };

        self.mode = InteractionMode::Trimming(TrimDrag {
            index,
            handle,
            start_x: pointer_x,
            initial_value: window.boundary(handle),
            visible_at_start: window.visible_duration(),
            rect,
        });
        self.emit(EditorEvent::PointerCapture {
            capture: PointerCapture::Acquired,
        });
        true
    }

    /// Pointer moved during a drag. Ignored outside a drag or while the
    /// anchor rectangle has no width.
    pub fn pointer_move(&mut self, pointer_x: f64) {
        match self.mode {
            InteractionMode::Scrubbing(drag) => self.scrub_to(drag, pointer_x),
            InteractionMode::Trimming(drag) => self.trim_to(drag, pointer_x),
            _ => {}
        }
    }

    /// Pointer released: end whichever drag is active.
    pub fn pointer_up(&mut self) {
        if self.mode.is_dragging() {
            self.end_drag();
        }
    }

    /// Supply a laid-out rectangle for the current drag.
    pub fn relayout(&mut self, rect: ScreenRect) {
        match &mut self.mode {
            InteractionMode::Scrubbing(drag) => drag.rect = rect,
            InteractionMode::Trimming(drag) => drag.rect = rect,
            _ => {}
        }
    }

    pub(crate) fn end_drag(&mut self) {
        self.mode = InteractionMode::Paused;
        self.emit(EditorEvent::PointerCapture {
            capture: PointerCapture::Released,
        });
    }

    fn scrub_to(&mut self, drag: ScrubDrag, pointer_x: f64) {
        let Some(fraction) = drag.rect.fraction_at(pointer_x) else {
            return;
        };
        let Some(window) = self.window_of(drag.index) else {
            return;
        };
        let time = window.time_at_fraction(fraction);
        self.media.seek(time);
        self.scene.set_playhead(time);
    }

    fn trim_to(&mut self, drag: TrimDrag, pointer_x: f64) {
        let Some(proposed) = drag.proposal(pointer_x) else {
            return;
        };
        let Some(clip) = self.scene.clip(drag.index) else {
            return;
        };
        let duration = self.duration_of(&clip.id);
        let current = clip.trim_window(duration).boundary(drag.handle);
        let clamped = clip.clamp_boundary(drag.handle, proposed, duration, self.limits);
        // Landing on a clamp bound always commits, however small the step.
        let at_bound = clamped != proposed && clamped != current;
        if !at_bound && (clamped - current).abs() <= self.settings.trim_commit_epsilon_secs {
            return;
        }

        let limits = self.limits;
        let Some(clip) = self.scene.clip_mut(drag.index) else {
            return;
        };
        let stored = clip.set_boundary(drag.handle, clamped, duration, limits);
        self.media.seek(stored);
        self.scene.set_playhead(stored);
        self.emit(EditorEvent::ClipsChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_scales_by_visible_duration() {
        let drag = TrimDrag {
            index: 0,
            handle: TrimHandle::Start,
            start_x: 100.0,
            initial_value: 1.0,
            visible_at_start: 4.0,
            rect: ScreenRect::new(100.0, 0.0, 200.0, 64.0),
        };
        assert_eq!(drag.proposal(150.0), Some(2.0));
        assert_eq!(drag.proposal(50.0), Some(0.0));
    }

    #[test]
    fn test_proposal_needs_layout() {
        let drag = TrimDrag {
            index: 0,
            handle: TrimHandle::End,
            start_x: 0.0,
            initial_value: 3.0,
            visible_at_start: 3.0,
            rect: ScreenRect::new(0.0, 0.0, 0.0, 0.0),
        };
        assert_eq!(drag.proposal(40.0), None);
    }
}
