//! The scene editor: one scene, one media element, one interaction mode.

use serde::Serialize;

use clipline_common::config::EditorSettings;
use clipline_scene_model::{
    playhead_percent, Clip, ClipId, DurationCache, FilmstripLayout, ProjectError, ProjectSession,
    ProjectStore, Scene, ThumbnailCache, TrimHandle, TrimLimits, TrimWindow, VisualGeometry,
};

use crate::media::{MediaElement, MediaEvent};
use crate::mode::InteractionMode;
use crate::resolver::{DurationResolver, MetadataProbe, Resolution};

/// Pointer capture requests for the host.
///
/// Each drag session emits exactly one `Acquired` and one `Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerCapture {
    Acquired,
    Released,
}

/// Notifications for the host, drained with [`SceneEditor::take_events`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// Clip order or trims changed; the host should persist the clip list.
    ClipsChanged,
    ActiveClipChanged { index: Option<usize> },
    DurationResolved { clip_id: ClipId, secs: f64 },
    PointerCapture { capture: PointerCapture },
    /// A user-visible message.
    Notice { message: String },
}

/// Editor state for one scene.
pub struct SceneEditor<M: MediaElement> {
    pub(crate) scene: Scene,
    pub(crate) durations: DurationCache,
    pub(crate) resolver: DurationResolver,
    pub(crate) thumbnails: ThumbnailCache,
    pub(crate) media: M,
    pub(crate) mode: InteractionMode,
    pub(crate) settings: EditorSettings,
    pub(crate) limits: TrimLimits,
    pub(crate) layout: FilmstripLayout,
    /// Clip whose source is in the media element.
    pub(crate) loaded: Option<ClipId>,
    /// Seek target applied once the loaded source has metadata.
    pub(crate) pending_seek: Option<f64>,
    /// Start playback once the pending load completes.
    pub(crate) resume_after_load: bool,
    pub(crate) events: Vec<EditorEvent>,
}

impl<M: MediaElement> SceneEditor<M> {
    pub fn new(clips: Vec<Clip>, media: M, settings: &EditorSettings) -> Self {
        Self::from_scene(Scene::new(clips), media, settings)
    }

    /// Wrap an existing scene. The active clip is loaded immediately.
    pub fn from_scene(scene: Scene, media: M, settings: &EditorSettings) -> Self {
        let limits = TrimLimits::from(settings);
        let mode = if scene.is_empty() {
            InteractionMode::Idle
        } else {
            InteractionMode::Paused
        };
        let mut editor = Self {
            scene,
            durations: DurationCache::new(),
            resolver: DurationResolver::new(limits),
            thumbnails: ThumbnailCache::new(),
            media,
            mode,
            settings: settings.clone(),
            limits,
            layout: FilmstripLayout::from(settings),
            loaded: None,
            pending_seek: None,
            resume_after_load: false,
            events: Vec::new(),
        };
        editor.load_active(false);
        editor
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn durations(&self) -> &DurationCache {
        &self.durations
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn limits(&self) -> TrimLimits {
        self.limits
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Drain pending host notifications.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    /// Raise a user-visible notice.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.emit(EditorEvent::Notice {
            message: message.into(),
        });
    }

    /// Resolved duration of a clip, or the configured default.
    pub fn duration_of(&self, id: &ClipId) -> f64 {
        self.durations
            .duration_or(id, self.settings.default_clip_duration_secs)
    }

    /// Effective trim window of the clip at `index`.
    pub fn window_of(&self, index: usize) -> Option<TrimWindow> {
        let clip = self.scene.clip(index)?;
        Some(clip.trim_window(self.duration_of(&clip.id)))
    }

    pub fn active_window(&self) -> Option<TrimWindow> {
        self.window_of(self.scene.active_index()?)
    }

    pub fn playhead(&self) -> f64 {
        self.scene.playhead()
    }

    /// Playhead offset from the active clip's trim start.
    pub fn playhead_offset(&self) -> f64 {
        self.active_window()
            .map(|w| w.offset_of(self.scene.playhead()))
            .unwrap_or(0.0)
    }

    /// Playhead as a percentage of the active clip's visible window.
    pub fn playhead_percent(&self) -> f64 {
        self.active_window()
            .map(|w| playhead_percent(&w, self.scene.playhead()))
            .unwrap_or(0.0)
    }

    /// Filmstrip geometry for the clip at `index`.
    pub fn geometry(&self, index: usize) -> Option<VisualGeometry> {
        let clip = self.scene.clip(index)?;
        Some(self.layout.geometry(clip, self.duration_of(&clip.id)))
    }

    /// Rendered filmstrip width for the clip at `index`.
    pub fn display_width(&self, index: usize) -> Option<f64> {
        let clip = self.scene.clip(index)?;
        Some(self.layout.display_width(clip, self.duration_of(&clip.id)))
    }

    /// Preview image for the clip at `index`: its own, else a generated one.
    pub fn preview_for(&self, index: usize) -> Option<&str> {
        let clip = self.scene.clip(index)?;
        clip.preview_image
            .as_deref()
            .or_else(|| self.thumbnails.resolved(&clip.id))
    }

    /// Set a trim boundary directly, clamped. Returns the stored value.
    pub fn set_trim(&mut self, index: usize, handle: TrimHandle, value: f64) -> Option<f64> {
        if self.mode.is_rendering() {
            return None;
        }
        let duration = self.duration_of(&self.scene.clip(index)?.id);
        let limits = self.limits;
        let clip = self.scene.clip_mut(index)?;
        if !clip.is_playable() {
            return None;
        }
        let stored = clip.set_boundary(handle, value, duration, limits);
        self.emit(EditorEvent::ClipsChanged);
        Some(stored)
    }

    /// Remove a clip from the scene (the asset is untouched).
    pub fn remove_clip(&mut self, id: &ClipId) -> bool {
        if self.mode.is_rendering() || self.mode.is_dragging() {
            return false;
        }
        let before = self.scene.active_clip().map(|c| c.id.clone());
        if self.scene.remove(id).is_none() {
            return false;
        }
        tracing::debug!(clip_id = %id, remaining = self.scene.len(), "Removed clip from scene");
        self.emit(EditorEvent::ClipsChanged);
        self.after_reorder(before);
        true
    }

    /// Reorder a clip. The active clip stays active.
    pub fn move_clip(&mut self, from: usize, to: usize) -> bool {
        if self.mode.is_rendering() || self.mode.is_dragging() {
            return false;
        }
        if !self.scene.move_clip(from, to) {
            return false;
        }
        if from != to {
            self.emit(EditorEvent::ClipsChanged);
            self.emit(EditorEvent::ActiveClipChanged {
                index: self.scene.active_index(),
            });
        }
        true
    }

    /// Take an updated clip list from the task layer.
    pub fn sync_clips(&mut self, clips: Vec<Clip>) {
        if self.mode.is_rendering() {
            tracing::debug!("Ignoring clip sync during export");
            return;
        }
        if self.mode.is_dragging() {
            self.end_drag();
        }
        let before = self.scene.active_clip().map(|c| c.id.clone());
        self.scene.sync(clips);
        self.after_reorder(before);
    }

    fn after_reorder(&mut self, previous_active: Option<ClipId>) {
        let current = self.scene.active_clip().map(|c| c.id.clone());
        if current == previous_active {
            return;
        }
        self.emit(EditorEvent::ActiveClipChanged {
            index: self.scene.active_index(),
        });
        if current.is_none() {
            self.media.pause();
            self.mode = InteractionMode::Idle;
            self.loaded = None;
            self.pending_seek = None;
            self.resume_after_load = false;
            return;
        }
        if matches!(self.mode, InteractionMode::Idle) {
            self.mode = InteractionMode::Paused;
        }
        let resume = self.mode.is_playing();
        self.load_active(resume);
    }

    /// Load the active clip's source if it is not already in the element and
    /// queue its trim start as the seek target.
    pub(crate) fn load_active(&mut self, resume: bool) {
        let Some(clip) = self.scene.active_clip() else {
            return;
        };
        let id = clip.id.clone();
        let start = clip.trim_window(self.duration_of(&id)).start;
        let Some(url) = clip.source_url.clone().filter(|_| clip.is_playable()) else {
            tracing::debug!(clip_id = %id, "Active clip has no playable source");
            self.loaded = None;
            self.pending_seek = None;
            self.resume_after_load = false;
            if self.mode.is_playing() {
                self.media.pause();
                self.mode = InteractionMode::Paused;
            }
            return;
        };

        self.scene.set_playhead(start);
        if self.loaded.as_ref() == Some(&id) {
            if self.pending_seek.is_some() {
                self.pending_seek = Some(start);
                self.resume_after_load = resume;
                return;
            }
            let drift = (self.media.current_time() - start).abs();
            if drift > self.settings.reselect_seek_tolerance_secs {
                self.media.seek(start);
            }
            if resume {
                self.start_media();
            }
            return;
        }

        self.loaded = Some(id.clone());
        self.pending_seek = Some(start);
        self.resume_after_load = resume;
        if let Err(e) = self.media.load(&url) {
            tracing::debug!(clip_id = %id, error = %e, "Media load failed");
            self.fall_back_to_paused();
        }
    }

    /// Ask the element to play; a rejection degrades to `Paused`.
    pub(crate) fn start_media(&mut self) -> bool {
        match self.media.play() {
            Ok(()) => {
                self.mode = InteractionMode::Playing;
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Play request rejected");
                self.fall_back_to_paused();
                false
            }
        }
    }

    pub(crate) fn fall_back_to_paused(&mut self) {
        self.resume_after_load = false;
        if !self.mode.is_rendering() && !self.scene.is_empty() {
            self.media.pause();
            if !self.mode.is_dragging() {
                self.mode = InteractionMode::Paused;
            }
        }
    }

    /// Metadata arrived for the loaded source.
    pub(crate) fn on_metadata_loaded(&mut self) {
        let Some(index) = self
            .loaded
            .as_ref()
            .and_then(|id| self.scene.index_of(id))
        else {
            return;
        };
        let reported = self.media.duration();
        let mut trims_changed = false;
        if let Some(clip) = self.scene.clip_mut(index) {
            if let Resolution::Resolved {
                secs,
                trims_changed: changed,
            } = self
                .resolver
                .resolve(clip, &mut self.durations, reported)
            {
                trims_changed = changed;
                let clip_id = clip.id.clone();
                self.emit(EditorEvent::DurationResolved { clip_id, secs });
            }
        }
        if trims_changed {
            self.emit(EditorEvent::ClipsChanged);
        }

        let Some(target) = self.pending_seek.take() else {
            return;
        };
        // Trims may have been re-clamped by the resolution above.
        let start = self.window_of(index).map(|w| w.start).unwrap_or(target);
        // A scrub that began before the load finished keeps its position.
        let target = if self.mode.is_dragging() {
            self.scene.playhead()
        } else {
            start
        };
        self.media.seek(target);
        self.scene.set_playhead(target);

        if std::mem::take(&mut self.resume_after_load) && !self.mode.is_rendering() {
            self.start_media();
        }
    }

    /// Route one media notification.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::MetadataLoaded => self.on_metadata_loaded(),
            MediaEvent::TimeUpdate => self.on_time_update(),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::Seeked => self.on_seeked(),
            MediaEvent::Error(message) => {
                tracing::debug!(%message, "Media error");
                self.pending_seek = None;
                self.fall_back_to_paused();
            }
        }
    }

    /// Drain and route every event the element has queued.
    pub fn pump_media_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.media.poll_event() {
            self.handle_media_event(event);
            handled += 1;
        }
        handled
    }

    /// Force a new duration attempt for a clip whose duration is unknown.
    pub fn reload(&mut self, id: &ClipId) -> bool {
        if !self.resolver.reload(id, &self.durations) {
            return false;
        }
        if self.loaded.as_ref() == Some(id) && !self.mode.is_rendering() {
            self.loaded = None;
            self.load_active(false);
        }
        true
    }

    /// Resolve every unresolved ready clip through a probe.
    pub fn resolve_all(&mut self, probe: &dyn MetadataProbe) -> usize {
        let mut resolved = 0;
        let mut trims_changed = false;
        for index in 0..self.scene.len() {
            let Some(clip) = self.scene.clip_mut(index) else {
                continue;
            };
            if let Resolution::Resolved {
                secs,
                trims_changed: changed,
            } = self.resolver.resolve_with(probe, clip, &mut self.durations)
            {
                let clip_id = clip.id.clone();
                trims_changed |= changed;
                resolved += 1;
                self.events
                    .push(EditorEvent::DurationResolved { clip_id, secs });
            }
        }
        if trims_changed {
            self.emit(EditorEvent::ClipsChanged);
        }
        resolved
    }

    /// Ready clips without a preview that need a generated thumbnail.
    ///
    /// Each returned request is marked in flight.
    pub fn pending_thumbnail_requests(&mut self) -> Vec<(ClipId, String)> {
        let mut requests = Vec::new();
        for clip in self.scene.clips() {
            if clip.preview_image.is_some() || !clip.is_playable() {
                continue;
            }
            let Some(url) = clip.source_url.clone() else {
                continue;
            };
            if self.thumbnails.begin(&clip.id) {
                requests.push((clip.id.clone(), url));
            }
        }
        requests
    }

    pub fn thumbnail_ready(&mut self, id: &ClipId, image: impl Into<String>) {
        self.thumbnails.resolve(id, image);
    }

    pub fn thumbnail_failed(&mut self, id: &ClipId) {
        tracing::debug!(clip_id = %id, "Thumbnail generation failed");
        self.thumbnails.fail(id);
    }

    /// Persist the scene's order and trims.
    pub fn save(
        &self,
        session: &mut ProjectSession,
        store: &mut dyn ProjectStore,
    ) -> Result<String, ProjectError> {
        session.save(&self.scene, store)
    }

    /// Hand the media element to an export. Fails while already rendering
    /// or when there is nothing to export.
    pub fn enter_rendering(&mut self) -> bool {
        if self.mode.is_rendering() || self.scene.is_empty() {
            return false;
        }
        if self.mode.is_dragging() {
            self.end_drag();
        }
        self.media.pause();
        self.resume_after_load = false;
        self.mode = InteractionMode::Rendering;
        tracing::debug!("Editor entered rendering");
        true
    }

    /// Take the media element back after an export.
    pub fn exit_rendering(&mut self) {
        if !self.mode.is_rendering() {
            return;
        }
        self.mode = if self.scene.is_empty() {
            InteractionMode::Idle
        } else {
            InteractionMode::Paused
        };
        if let Some(window) = self.active_window() {
            let time = window.clamp_time(self.media.current_time());
            self.scene.set_playhead(time);
        }
        tracing::debug!("Editor left rendering");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedMedia;

    fn editor(clips: Vec<Clip>) -> SceneEditor<ScriptedMedia> {
        let media = ScriptedMedia::new()
            .with_source("a.mp4", 5.0)
            .with_source("b.mp4", 6.0)
            .with_source("c.mp4", 3.0);
        SceneEditor::new(clips, media, &EditorSettings::default())
    }

    #[test]
    fn test_empty_scene_is_idle() {
        let editor = editor(vec![]);
        assert_eq!(*editor.mode(), InteractionMode::Idle);
        assert!(editor.active_window().is_none());
        assert_eq!(editor.playhead_percent(), 0.0);
    }

    #[test]
    fn test_unknown_duration_uses_default() {
        let editor = editor(vec![Clip::ready("a", "a.mp4")]);
        assert_eq!(editor.duration_of(&ClipId::new("a")), 4.0);
        assert_eq!(editor.display_width(0), Some(224.0));
    }

    #[test]
    fn test_metadata_resolves_duration_and_emits() {
        let mut editor = editor(vec![Clip::ready("a", "a.mp4")]);
        editor.pump_media_events();
        assert_eq!(editor.duration_of(&ClipId::new("a")), 5.0);
        assert_eq!(editor.scene().clips()[0].trim_end, Some(5.0));
        let events = editor.take_events();
        assert!(events.contains(&EditorEvent::DurationResolved {
            clip_id: ClipId::new("a"),
            secs: 5.0
        }));
        assert!(events.contains(&EditorEvent::ClipsChanged));
    }

    #[test]
    fn test_set_trim_clamps_and_emits() {
        let mut editor = editor(vec![Clip::ready("a", "a.mp4")]);
        editor.pump_media_events();
        editor.take_events();
        assert_eq!(editor.set_trim(0, TrimHandle::End, 0.1), Some(0.5));
        assert_eq!(editor.take_events(), vec![EditorEvent::ClipsChanged]);
    }

    #[test]
    fn test_remove_active_clip_loads_successor() {
        let mut editor = editor(vec![Clip::ready("a", "a.mp4"), Clip::ready("b", "b.mp4")]);
        editor.pump_media_events();
        assert!(editor.remove_clip(&ClipId::new("a")));
        assert_eq!(editor.media().source(), Some("b.mp4"));
        assert_eq!(editor.scene().active_index(), Some(0));
    }

    #[test]
    fn test_remove_last_clip_goes_idle() {
        let mut editor = editor(vec![Clip::ready("a", "a.mp4")]);
        assert!(editor.remove_clip(&ClipId::new("a")));
        assert_eq!(*editor.mode(), InteractionMode::Idle);
    }

    #[test]
    fn test_thumbnail_requests_skip_clips_with_preview() {
        let mut with_preview = Clip::ready("a", "a.mp4");
        with_preview.preview_image = Some("a.jpg".into());
        let mut editor = editor(vec![with_preview, Clip::ready("b", "b.mp4")]);
        let requests = editor.pending_thumbnail_requests();
        assert_eq!(requests, vec![(ClipId::new("b"), "b.mp4".to_string())]);
        assert!(editor.pending_thumbnail_requests().is_empty());

        editor.thumbnail_ready(&ClipId::new("b"), "data:image/jpeg;base64,AA");
        assert_eq!(editor.preview_for(1), Some("data:image/jpeg;base64,AA"));
        assert_eq!(editor.preview_for(0), Some("a.jpg"));
    }

    #[test]
    fn test_rendering_blocks_scene_edits() {
        let mut editor = editor(vec![Clip::ready("a", "a.mp4"), Clip::ready("b", "b.mp4")]);
        assert!(editor.enter_rendering());
        assert!(!editor.enter_rendering());
        assert!(!editor.move_clip(0, 1));
        assert!(editor.set_trim(0, TrimHandle::Start, 1.0).is_none());
        editor.exit_rendering();
        assert_eq!(*editor.mode(), InteractionMode::Paused);
        assert!(editor.move_clip(0, 1));
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let json = serde_json::to_value(EditorEvent::ActiveClipChanged { index: Some(2) }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "active_clip_changed", "index": 2}));
    }
}
