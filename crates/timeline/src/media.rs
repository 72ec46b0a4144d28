//! The media element seam.
//!
//! A [`MediaElement`] is a single decoder/player that can hold one source at a
//! time. Hosts implement it over whatever player they have; the native
//! backend in `clipline-render-engine` implements it over ffmpeg.

use std::sync::Arc;

use clipline_common::error::ClipResult;

/// Notifications a media element raises asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Metadata (duration, dimensions) is available for the loaded source.
    MetadataLoaded,
    /// A seek completed.
    Seeked,
    /// Periodic playback position update.
    TimeUpdate,
    /// Playback reached the end of the media.
    Ended,
    /// Loading or decoding failed.
    Error(String),
}

/// One decoded RGBA video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Media time the frame was presented at.
    pub media_time: f64,
    /// Tightly packed RGBA pixels, `width * height * 4` bytes.
    pub data: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, media_time: f64, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            media_time,
            data: data.into(),
        }
    }

    /// Expected byte length for the frame dimensions.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
    }
}

/// A single playable media element.
pub trait MediaElement {
    /// Start loading `source_url`, replacing any current source.
    ///
    /// Completion is reported with [`MediaEvent::MetadataLoaded`] or
    /// [`MediaEvent::Error`].
    fn load(&mut self, source_url: &str) -> ClipResult<()>;

    /// Currently loaded source, if any.
    fn source(&self) -> Option<&str>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Seek to `secs`. Completion is reported with [`MediaEvent::Seeked`].
    fn seek(&mut self, secs: f64);

    /// Begin playback. An error means the request was rejected.
    fn play(&mut self) -> ClipResult<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn has_ended(&self) -> bool;

    /// Duration reported by the metadata. May be non-finite for live or
    /// indefinite sources.
    fn duration(&self) -> Option<f64>;

    /// Native video dimensions, once known.
    fn video_size(&self) -> Option<(u32, u32)>;

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    /// The frame currently on display, when the element can expose pixels.
    fn current_frame(&self) -> Option<VideoFrame> {
        None
    }

    /// Next pending notification, for elements that queue their events.
    fn poll_event(&mut self) -> Option<MediaEvent> {
        None
    }
}

impl<M: MediaElement + ?Sized> MediaElement for Box<M> {
    fn load(&mut self, source_url: &str) -> ClipResult<()> {
        (**self).load(source_url)
    }

    fn source(&self) -> Option<&str> {
        (**self).source()
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn seek(&mut self, secs: f64) {
        (**self).seek(secs)
    }

    fn play(&mut self) -> ClipResult<()> {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn has_ended(&self) -> bool {
        (**self).has_ended()
    }

    fn duration(&self) -> Option<f64> {
        (**self).duration()
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        (**self).video_size()
    }

    fn is_muted(&self) -> bool {
        (**self).is_muted()
    }

    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }

    fn set_volume(&mut self, volume: f64) {
        (**self).set_volume(volume)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        (**self).current_frame()
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        (**self).poll_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shape_check() {
        let frame = VideoFrame::new(2, 2, 0.0, vec![0u8; 16]);
        assert!(frame.is_well_formed());
        let short = VideoFrame::new(2, 2, 0.0, vec![0u8; 15]);
        assert!(!short.is_well_formed());
    }
}
