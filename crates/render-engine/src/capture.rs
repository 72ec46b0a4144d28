//! Capture, recording, and download seams used by the export pipeline.
//!
//! These mirror the primitives a host player exposes: a capture stream of the
//! media element (for its audio), a canvas whose drawn frames form a video
//! track, a recorder that encodes a stream into chunks, and a download sink.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};

use clipline_common::error::ClipResult;
use clipline_timeline::{MediaElement, VideoFrame};

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Shared hand-off point between a canvas and whatever consumes its frames.
///
/// Frames pushed while nothing is attached are dropped. The consumer's queue
/// is bounded, so a slow consumer blocks [`FrameTap::push`].
#[derive(Debug, Clone, Default)]
pub struct FrameTap(Arc<Mutex<Option<SyncSender<VideoFrame>>>>);

impl FrameTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route frames to `sender`, replacing any previous consumer.
    pub fn attach(&self, sender: SyncSender<VideoFrame>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(sender);
        }
    }

    /// Stop routing frames. Dropping the sender ends the consumer's stream.
    pub fn detach(&self) {
        if let Ok(mut slot) = self.0.lock() {
            slot.take();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.0.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Offer a frame. Returns `true` if a consumer accepted it.
    pub fn push(&self, frame: &VideoFrame) -> bool {
        // Send outside the lock so a full queue never blocks `detach`.
        let sender = match self.0.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => return false,
        };
        let Some(sender) = sender else {
            return false;
        };
        if sender.send(frame.clone()).is_ok() {
            return true;
        }
        self.detach();
        false
    }
}

/// Where a track's media comes from.
#[derive(Debug, Clone)]
pub enum TrackOrigin {
    /// Frames drawn into a canvas.
    Canvas {
        tap: FrameTap,
        width: u32,
        height: u32,
        fps: u32,
    },
    /// Output of the media element playing `source_url`.
    Element { source_url: String },
    /// Generated silence.
    Silence,
}

/// One capture track. Clones share liveness: stopping any handle ends the
/// track for every holder.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    pub id: u32,
    pub kind: TrackKind,
    pub origin: TrackOrigin,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, origin: TrackOrigin) -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            origin,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// End the track. Canvas tracks stop feeding their consumer.
    pub fn stop(&mut self) {
        if !self.live.swap(false, Ordering::AcqRel) {
            return;
        }
        if let TrackOrigin::Canvas { tap, .. } = &self.origin {
            tap.detach();
        }
    }
}

/// An ordered set of tracks.
#[derive(Debug, Clone, Default)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, track: MediaTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn add_track(&mut self, track: MediaTrack) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    pub fn has_audio(&self) -> bool {
        self.audio_tracks().next().is_some()
    }

    /// Stop every track. Safe to call repeatedly.
    pub fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }

    pub fn all_stopped(&self) -> bool {
        self.tracks.iter().all(|t| !t.is_live())
    }
}

/// A drawing surface whose frames can be captured as a video track.
pub trait FrameCanvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Draw `frame` scaled to the canvas.
    fn draw(&mut self, frame: &VideoFrame) -> ClipResult<()>;

    /// A stream with one video track fed by this canvas at `fps`.
    fn capture_stream(&mut self, fps: u32) -> ClipResult<MediaStream>;
}

/// Encoder settings handed to a recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderOptions {
    /// Negotiated container/codec, or `None` for the backend default.
    pub mime_type: Option<String>,
    pub video_bits_per_second: u64,
    pub audio_bits_per_second: u64,
    /// Media-time range being recorded, for backends that read source audio
    /// directly.
    pub time_range: Option<(f64, f64)>,
}

/// Lifecycle of a recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
    Stopped,
}

/// Asynchronous recorder notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// An encoded chunk.
    DataAvailable(Vec<u8>),
    /// Recording finished; no more data follows.
    Stopped,
    Error(String),
}

/// Encodes a stream into chunks.
pub trait Recorder {
    fn start(&mut self) -> ClipResult<()>;

    /// Request a stop. Remaining data and [`RecorderEvent::Stopped`] follow
    /// through [`Recorder::poll_event`].
    fn stop(&mut self);

    fn state(&self) -> RecorderState;

    /// Container type of the output, once known.
    fn mime_type(&self) -> Option<&str>;

    fn poll_event(&mut self) -> Option<RecorderEvent>;
}

/// Factory for capture primitives.
pub trait CaptureBackend {
    /// Capture the element's output (used for its audio).
    fn capture_element(&mut self, media: &dyn MediaElement) -> ClipResult<MediaStream>;

    fn create_canvas(&mut self, width: u32, height: u32) -> ClipResult<Box<dyn FrameCanvas>>;

    /// A silent audio track from the backend's audio context.
    fn silence_track(&mut self) -> ClipResult<MediaTrack>;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn create_recorder(
        &mut self,
        stream: MediaStream,
        options: RecorderOptions,
    ) -> ClipResult<Box<dyn Recorder>>;

    /// Release audio-processing resources acquired for silence tracks.
    fn release_audio(&mut self) {}
}

/// Encoded output assembled from recorder chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl Blob {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where finished exports go.
pub trait DownloadSink {
    /// Download the resource at `url` unchanged.
    fn download_url(&mut self, url: &str, file_name: &str) -> ClipResult<PathBuf>;

    /// Register `blob` and return a temporary URL for it.
    fn create_object_url(&mut self, blob: Blob) -> ClipResult<String>;

    /// Download a registered object URL.
    fn download(&mut self, object_url: &str, file_name: &str) -> ClipResult<PathBuf>;

    /// Release a temporary URL.
    fn revoke(&mut self, object_url: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopping_canvas_track_detaches_tap() {
        let tap = FrameTap::new();
        let (tx, rx) = std::sync::mpsc::sync_channel(4);
        tap.attach(tx);

        let mut stream = MediaStream::new().with_track(MediaTrack::new(
            TrackKind::Video,
            TrackOrigin::Canvas {
                tap: tap.clone(),
                width: 2,
                height: 2,
                fps: 30,
            },
        ));
        let frame = VideoFrame::new(2, 2, 0.0, vec![0u8; 16]);
        assert!(tap.push(&frame));
        assert_eq!(rx.try_recv().map(|f| f.width), Ok(2));

        stream.stop_all();
        assert!(stream.all_stopped());
        assert!(!tap.is_attached());
        assert!(!tap.push(&frame));
    }

    #[test]
    fn test_cloned_stream_shares_track_liveness() {
        let mut held = MediaStream::new()
            .with_track(MediaTrack::new(TrackKind::Audio, TrackOrigin::Silence));
        let handed_off = held.clone();
        assert!(!handed_off.all_stopped());

        held.stop_all();
        assert!(handed_off.all_stopped());
        assert!(!handed_off.tracks()[0].is_live());
    }

    #[test]
    fn test_stream_track_queries() {
        let stream = MediaStream::new()
            .with_track(MediaTrack::new(TrackKind::Audio, TrackOrigin::Silence))
            .with_track(MediaTrack::new(
                TrackKind::Audio,
                TrackOrigin::Element {
                    source_url: "a.mp4".into(),
                },
            ));
        assert!(stream.has_audio());
        assert_eq!(stream.video_tracks().count(), 0);
        assert_ne!(stream.tracks()[0].id, stream.tracks()[1].id);
    }
}
