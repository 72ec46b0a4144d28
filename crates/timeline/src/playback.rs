//! Sequential playback across the scene.
//!
//! The scene plays as one continuous timeline: each clip plays its trim
//! window, and reaching the end of a window hands off to the next clip.

use crate::editor::{EditorEvent, SceneEditor};
use crate::media::MediaElement;
use crate::mode::InteractionMode;

impl<M: MediaElement> SceneEditor<M> {
    /// Make the clip at `index` active, pause, and seek to its trim start.
    ///
    /// No-op while rendering or for an out-of-range index.
    pub fn select_clip(&mut self, index: usize) -> bool {
        if self.mode.is_rendering() {
            return false;
        }
        self.select(index, false)
    }

    pub(crate) fn select(&mut self, index: usize, resume: bool) -> bool {
        let changed = self.scene.active_index() != Some(index);
        if !self.scene.set_active(index) {
            return false;
        }
        self.media.pause();
        if !self.mode.is_dragging() {
            self.mode = InteractionMode::Paused;
        }
        if changed {
            self.emit(EditorEvent::ActiveClipChanged { index: Some(index) });
        }
        if resume {
            self.mode = InteractionMode::Playing;
        }
        self.load_active(resume);
        true
    }

    /// Start playback from `Paused`, rewinding first if the playhead sits at
    /// the end of the trim window.
    pub fn play(&mut self) -> bool {
        if !matches!(self.mode, InteractionMode::Paused) {
            return false;
        }
        let Some(window) = self.active_window() else {
            return false;
        };
        if !self.scene.active_clip().is_some_and(|c| c.is_playable()) {
            return false;
        }

        if self.pending_seek.is_some() {
            // Still loading; playback starts with the metadata.
            self.resume_after_load = true;
            self.mode = InteractionMode::Playing;
            return true;
        }

        let now = self.media.current_time();
        if window.reached_end(now, self.settings.end_epsilon_secs)
            || window.before_start(now, self.settings.end_epsilon_secs)
        {
            self.media.seek(window.start);
            self.scene.set_playhead(window.start);
        }
        self.start_media()
    }

    /// `Playing` → `Paused`.
    pub fn pause(&mut self) -> bool {
        if !self.mode.is_playing() {
            return false;
        }
        self.media.pause();
        self.resume_after_load = false;
        self.mode = InteractionMode::Paused;
        true
    }

    pub fn toggle_play(&mut self) -> bool {
        match self.mode {
            InteractionMode::Playing => self.pause(),
            InteractionMode::Paused => self.play(),
            _ => false,
        }
    }

    pub(crate) fn on_time_update(&mut self) {
        let Some(window) = self.active_window() else {
            return;
        };
        let now = self.media.current_time();
        let epsilon = self.settings.end_epsilon_secs;
        match self.mode {
            InteractionMode::Playing if self.pending_seek.is_none() => {
                if window.before_start(now, epsilon) {
                    tracing::debug!(now, start = window.start, "Snapping playback to trim start");
                    self.media.seek(window.start);
                    self.scene.set_playhead(window.start);
                } else if window.reached_end(now, epsilon) {
                    self.on_clip_end();
                } else {
                    self.scene.set_playhead(now);
                }
            }
            InteractionMode::Paused => self.scene.set_playhead(window.clamp_time(now)),
            _ => {}
        }
    }

    pub(crate) fn on_ended(&mut self) {
        if self.mode.is_playing() && self.pending_seek.is_none() {
            self.on_clip_end();
        }
    }

    pub(crate) fn on_seeked(&mut self) {
        if matches!(self.mode, InteractionMode::Paused) && self.pending_seek.is_none() {
            if let Some(window) = self.active_window() {
                let now = window.clamp_time(self.media.current_time());
                self.scene.set_playhead(now);
            }
        }
    }

    /// The active clip's window finished playing.
    fn on_clip_end(&mut self) {
        let Some(index) = self.scene.active_index() else {
            return;
        };
        if self.scene.has_next() {
            tracing::debug!(from = index, to = index + 1, "Advancing to next clip");
            self.select(index + 1, true);
            return;
        }

        self.media.pause();
        self.resume_after_load = false;
        if let Some(window) = self.active_window() {
            self.media.seek(window.start);
            self.scene.set_playhead(window.start);
        }
        self.mode = InteractionMode::Paused;
        tracing::debug!(index, "Scene playback finished");
    }
}
