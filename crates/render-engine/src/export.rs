//! Trim export.
//!
//! Re-encodes the active clip's trim window by playing it through the media
//! element, redrawing every display frame into a canvas, and recording the
//! canvas (plus the element's audio) into a new file. A window covering the
//! whole clip skips all of that and downloads the original.
//!
//! The session is event-driven: the host feeds it media events and display
//! frames until [`ExportSession::is_finished`]. Cleanup runs exactly once on
//! every exit path and hands the editor back in `Paused`.

use std::time::Duration;

use serde::Serialize;

use clipline_common::clock::{within_tolerance, BoundaryDrift, SessionClock};
use clipline_common::config::ExportSettings;
use clipline_common::error::{ClipError, ClipResult};
use clipline_scene_model::{ClipId, TrimWindow};
use clipline_timeline::{MediaElement, MediaEvent, SceneEditor};

use crate::capture::{
    Blob, CaptureBackend, DownloadSink, FrameCanvas, MediaStream, MediaTrack, Recorder,
    RecorderEvent, RecorderOptions, RecorderState, TrackKind,
};
use crate::format::{direct_download_name, negotiate_mime, trimmed_file_name, FALLBACK_MIME};

/// Stages of a rendering export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    /// Waiting for the seek to the trim start to land.
    Seeking,
    /// Drawing frames while the recorder runs.
    Recording,
    /// Recorder stopped; waiting for its final data.
    Finalizing,
    Done,
}

/// How an export ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    /// The window covered the whole clip; the original was downloaded.
    Direct { file_name: String },
    /// A re-encoded file was downloaded. `object_url` should be revoked after
    /// the configured delay.
    Rendered {
        file_name: String,
        object_url: String,
        bytes: usize,
        mime_type: String,
    },
    Failed { message: String },
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Direct { file_name } | Self::Rendered { file_name, .. } => Some(file_name),
            Self::Failed { .. } => None,
        }
    }
}

/// Result of asking for an export.
pub enum ExportStart {
    /// Finished immediately with a direct download.
    Direct(ExportOutcome),
    /// A rendering session now owns the media element.
    Rendering(Box<ExportSession>),
}

/// Start exporting the editor's active clip.
///
/// Errors are returned only for unmet preconditions (already rendering, no
/// ready clip); every later failure ends the session with a notice instead.
pub fn start_export<M: MediaElement>(
    editor: &mut SceneEditor<M>,
    backend: &mut dyn CaptureBackend,
    sink: &mut dyn DownloadSink,
    settings: &ExportSettings,
) -> ClipResult<ExportStart> {
    if editor.mode().is_rendering() {
        return Err(ClipError::export("an export is already in progress"));
    }
    let clip = editor
        .scene()
        .active_clip()
        .ok_or_else(|| ClipError::export("no active clip"))?;
    if !clip.is_playable() {
        return Err(ClipError::export(format!("clip {} is not ready", clip.id)));
    }
    let source_url = clip
        .source_url
        .clone()
        .ok_or_else(|| ClipError::export(format!("clip {} has no source", clip.id)))?;
    let clip_id = clip.id.clone();
    let duration = editor.duration_of(&clip_id);
    let window = editor
        .active_window()
        .ok_or_else(|| ClipError::export("no active clip"))?;

    if window.is_full_range(duration, settings.noop_tolerance_secs) {
        let file_name = direct_download_name(clip_id.as_str());
        tracing::info!(clip_id = %clip_id, %file_name, "Trim covers whole clip, downloading original");
        if let Err(e) = sink.download_url(&source_url, &file_name) {
            tracing::warn!(clip_id = %clip_id, error = %e, "Direct download failed");
            editor.notify(format!("Export failed: {e}"));
            return Ok(ExportStart::Direct(ExportOutcome::Failed {
                message: e.to_string(),
            }));
        }
        return Ok(ExportStart::Direct(ExportOutcome::Direct { file_name }));
    }

    if !editor.enter_rendering() {
        return Err(ClipError::export("editor cannot enter rendering"));
    }
    tracing::info!(
        clip_id = %clip_id,
        start = window.start,
        end = window.end,
        "Starting trimmed export"
    );

    let media = editor.media_mut();
    let saved_audio = SavedAudio {
        muted: media.is_muted(),
        volume: media.volume(),
    };
    media.set_muted(true);

    let mut session = ExportSession {
        clip_id,
        window,
        settings: settings.clone(),
        phase: ExportPhase::Seeking,
        clock: SessionClock::start(),
        saved_audio,
        canvas: None,
        recorder: None,
        streams: Vec::new(),
        chunks: Vec::new(),
        mime_type: None,
        frames_drawn: 0,
        outcome: None,
    };

    if within_tolerance(media.current_time(), window.start, settings.seek_tolerance_secs) {
        session.begin_recording(editor, backend);
    } else {
        media.seek(window.start);
    }
    Ok(ExportStart::Rendering(Box::new(session)))
}

#[derive(Debug, Clone, Copy)]
struct SavedAudio {
    muted: bool,
    volume: f64,
}

/// A trimmed export in progress.
pub struct ExportSession {
    clip_id: ClipId,
    window: TrimWindow,
    settings: ExportSettings,
    phase: ExportPhase,
    clock: SessionClock,
    saved_audio: SavedAudio,
    canvas: Option<Box<dyn FrameCanvas>>,
    recorder: Option<Box<dyn Recorder>>,
    streams: Vec<MediaStream>,
    chunks: Vec<Vec<u8>>,
    mime_type: Option<String>,
    frames_drawn: u64,
    outcome: Option<ExportOutcome>,
}

impl ExportSession {
    pub fn clip_id(&self) -> &ClipId {
        &self.clip_id
    }

    pub fn window(&self) -> TrimWindow {
        self.window
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Negotiated output type, once recording has started.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ExportPhase::Done
    }

    pub fn outcome(&self) -> Option<&ExportOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<ExportOutcome> {
        self.outcome
    }

    /// Route a media event. Events the export does not consume go to the
    /// editor.
    pub fn handle_media_event<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
        sink: &mut dyn DownloadSink,
        event: MediaEvent,
    ) {
        match (self.phase, event) {
            (ExportPhase::Seeking, MediaEvent::Seeked) => self.begin_recording(editor, backend),
            (ExportPhase::Recording, MediaEvent::Ended) => {
                tracing::debug!(clip_id = %self.clip_id, "Media ended during export");
                self.stop_recorder();
                self.drain_recorder(editor, backend, sink);
            }
            (ExportPhase::Seeking | ExportPhase::Recording, MediaEvent::Error(message)) => {
                self.fail(editor, backend, ClipError::capture(format!("media error: {message}")));
            }
            (_, event) => editor.handle_media_event(event),
        }
    }

    /// Drain and route every event the element has queued.
    pub fn pump_media_events<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
        sink: &mut dyn DownloadSink,
    ) {
        while let Some(event) = editor.media_mut().poll_event() {
            self.handle_media_event(editor, backend, sink, event);
        }
    }

    /// One display frame. Returns `true` while more frames are wanted.
    pub fn on_frame<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
        sink: &mut dyn DownloadSink,
    ) -> bool {
        match self.phase {
            ExportPhase::Seeking => {
                let timeout = Duration::from_millis(self.settings.seek_timeout_ms);
                if within_tolerance(
                    editor.media().current_time(),
                    self.window.start,
                    self.settings.seek_tolerance_secs,
                ) {
                    self.begin_recording(editor, backend);
                } else if self.clock.exceeded(timeout) {
                    self.fail(editor, backend, ClipError::export("seek to trim start timed out"));
                }
            }
            ExportPhase::Recording => {
                self.draw_frame(editor, backend);
                let media = editor.media();
                let now = media.current_time();
                if self.phase == ExportPhase::Recording && (now >= self.window.end || media.has_ended())
                {
                    let drift = BoundaryDrift {
                        target_secs: self.window.end,
                        observed_secs: now,
                    };
                    let fps = self.settings.capture_fps;
                    if drift.exceeds_frames(fps, 2.0) {
                        tracing::debug!(
                            clip_id = %self.clip_id,
                            drift_frames = drift.drift_frames(fps),
                            "Recording ran past trim end"
                        );
                    }
                    tracing::debug!(clip_id = %self.clip_id, frames = self.frames_drawn, "Reached trim end");
                    self.stop_recorder();
                }
                self.drain_recorder(editor, backend, sink);
            }
            ExportPhase::Finalizing => self.drain_recorder(editor, backend, sink),
            ExportPhase::Done => {}
        }
        !self.is_finished()
    }

    fn begin_recording<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
    ) {
        if self.phase != ExportPhase::Seeking {
            return;
        }
        if let Err(e) = self.try_begin_recording(editor, backend) {
            self.fail(editor, backend, e);
        }
    }

    fn try_begin_recording<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
    ) -> ClipResult<()> {
        let media = editor.media_mut();
        let (width, height) = media
            .video_size()
            .filter(|(w, h)| *w > 0 && *h > 0)
            .unwrap_or((self.settings.fallback_width, self.settings.fallback_height));

        let mut canvas = backend.create_canvas(width, height)?;
        let mut stream = canvas.capture_stream(self.settings.capture_fps)?;
        self.canvas = Some(canvas);

        if let Some(track) = self.acquire_audio(&*media, backend) {
            stream.add_track(track);
        } else {
            tracing::warn!(clip_id = %self.clip_id, "No audio track available, exporting video only");
        }

        let mime_type = negotiate_mime(&self.settings.mime_preferences, backend);
        self.mime_type = mime_type.clone();
        let options = RecorderOptions {
            mime_type,
            video_bits_per_second: self.settings.video_bits_per_second,
            audio_bits_per_second: self.settings.audio_bits_per_second,
            time_range: Some((self.window.start, self.window.end)),
        };

        self.streams.push(stream.clone());
        let mut recorder = backend.create_recorder(stream, options)?;
        recorder.start()?;
        self.recorder = Some(recorder);

        media
            .play()
            .map_err(|e| ClipError::capture(format!("playback for export was rejected: {e}")))?;

        tracing::info!(
            clip_id = %self.clip_id,
            width,
            height,
            mime = self.mime_type.as_deref().unwrap_or("default"),
            "Recording trimmed clip"
        );
        self.phase = ExportPhase::Recording;
        Ok(())
    }

    /// Element audio if it has any, else backend silence, else nothing.
    fn acquire_audio(
        &mut self,
        media: &dyn MediaElement,
        backend: &mut dyn CaptureBackend,
    ) -> Option<MediaTrack> {
        match backend.capture_element(media) {
            Ok(element_stream) => {
                let audio = element_stream.audio_tracks().next().cloned();
                self.streams.push(element_stream);
                if audio.is_some() {
                    return audio;
                }
            }
            Err(e) => {
                tracing::debug!(clip_id = %self.clip_id, error = %e, "Element capture unavailable");
            }
        }
        match backend.silence_track() {
            Ok(track) if track.kind == TrackKind::Audio => Some(track),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(clip_id = %self.clip_id, error = %e, "Silence track unavailable");
                None
            }
        }
    }

    fn draw_frame<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
    ) {
        let Some(frame) = editor.media().current_frame() else {
            return;
        };
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        match canvas.draw(&frame) {
            Ok(()) => self.frames_drawn += 1,
            Err(e) => self.fail(editor, backend, e),
        }
    }

    fn stop_recorder(&mut self) {
        if let Some(recorder) = self.recorder.as_mut() {
            if recorder.state() == RecorderState::Recording {
                recorder.stop();
            }
        }
        if self.phase == ExportPhase::Recording {
            self.phase = ExportPhase::Finalizing;
        }
    }

    fn drain_recorder<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
        sink: &mut dyn DownloadSink,
    ) {
        loop {
            if self.is_finished() {
                return;
            }
            let Some(event) = self.recorder.as_mut().and_then(|r| r.poll_event()) else {
                return;
            };
            match event {
                RecorderEvent::DataAvailable(chunk) => {
                    if !chunk.is_empty() {
                        self.chunks.push(chunk);
                    }
                }
                RecorderEvent::Stopped => self.finalize(editor, backend, sink),
                RecorderEvent::Error(message) => {
                    self.fail(editor, backend, ClipError::record(message));
                }
            }
        }
    }

    fn finalize<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
        sink: &mut dyn DownloadSink,
    ) {
        let mime_type = self
            .mime_type
            .clone()
            .or_else(|| {
                self.recorder
                    .as_ref()
                    .and_then(|r| r.mime_type().map(str::to_string))
            })
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let data: Vec<u8> = std::mem::take(&mut self.chunks).concat();
        if data.is_empty() {
            self.fail(editor, backend, ClipError::record("recording produced no data"));
            return;
        }

        let bytes = data.len();
        let file_name = trimmed_file_name(self.clip_id.as_str(), &mime_type);
        let delivered = sink
            .create_object_url(Blob::new(data, mime_type.clone()))
            .and_then(|url| sink.download(&url, &file_name).map(|_| url));
        match delivered {
            Ok(object_url) => {
                tracing::info!(clip_id = %self.clip_id, %file_name, bytes, "Export complete");
                self.outcome = Some(ExportOutcome::Rendered {
                    file_name,
                    object_url,
                    bytes,
                    mime_type,
                });
                self.cleanup(editor, backend);
            }
            Err(e) => self.fail(editor, backend, e),
        }
    }

    fn fail<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
        error: ClipError,
    ) {
        if self.is_finished() {
            return;
        }
        tracing::warn!(clip_id = %self.clip_id, error = %error, "Export failed");
        editor.notify(format!("Export failed: {error}"));
        self.outcome = Some(ExportOutcome::Failed {
            message: error.to_string(),
        });
        self.cleanup(editor, backend);
    }

    /// Restore the element and release every capture resource.
    fn cleanup<M: MediaElement>(
        &mut self,
        editor: &mut SceneEditor<M>,
        backend: &mut dyn CaptureBackend,
    ) {
        if let Some(recorder) = self.recorder.as_mut() {
            if recorder.state() == RecorderState::Recording {
                recorder.stop();
            }
        }
        for stream in &mut self.streams {
            stream.stop_all();
        }
        self.canvas = None;
        backend.release_audio();

        let media = editor.media_mut();
        media.set_muted(self.saved_audio.muted);
        media.set_volume(self.saved_audio.volume);
        media.pause();
        media.seek(self.window.start);
        editor.exit_rendering();

        self.phase = ExportPhase::Done;
        tracing::debug!(
            clip_id = %self.clip_id,
            started = self.clock.epoch_wall(),
            elapsed = self.clock.elapsed_secs(),
            "Export cleaned up"
        );
    }

    /// Whether every capture track has been stopped.
    pub fn tracks_released(&self) -> bool {
        self.streams.iter().all(MediaStream::all_stopped)
    }
}
