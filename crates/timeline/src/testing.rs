//! In-memory media element with a scripted clock.
//!
//! Enabled with the `testing` feature for headless runs and downstream tests.

use std::collections::{HashMap, VecDeque};

use clipline_common::error::{ClipError, ClipResult};

use crate::media::{MediaElement, MediaEvent, VideoFrame};

#[derive(Debug, Clone)]
struct Source {
    duration: Option<f64>,
    size: Option<(u32, u32)>,
}

/// A media element whose time only moves when told to.
#[derive(Debug, Clone)]
pub struct ScriptedMedia {
    sources: HashMap<String, Source>,
    src: Option<String>,
    time: f64,
    paused: bool,
    ended: bool,
    muted: bool,
    volume: f64,
    events: VecDeque<MediaEvent>,
    /// Reject every `play()` call.
    pub reject_play: bool,
    /// Every `load()` argument, in order.
    pub loads: Vec<String>,
    /// Every `seek()` target, in order.
    pub seeks: Vec<f64>,
    pub play_calls: usize,
}

impl Default for ScriptedMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedMedia {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            src: None,
            time: 0.0,
            paused: true,
            ended: false,
            muted: false,
            volume: 1.0,
            events: VecDeque::new(),
            reject_play: false,
            loads: Vec::new(),
            seeks: Vec::new(),
            play_calls: 0,
        }
    }

    /// Register a loadable source with a known duration.
    pub fn with_source(mut self, url: &str, duration: f64) -> Self {
        self.sources.insert(
            url.to_string(),
            Source {
                duration: Some(duration),
                size: Some((64, 36)),
            },
        );
        self
    }

    /// Register a source whose metadata has no usable duration.
    pub fn with_indefinite_source(mut self, url: &str) -> Self {
        self.sources.insert(
            url.to_string(),
            Source {
                duration: Some(f64::INFINITY),
                size: None,
            },
        );
        self
    }

    /// Register a source that decodes no video frames.
    pub fn with_audio_only_source(mut self, url: &str, duration: f64) -> Self {
        self.sources.insert(
            url.to_string(),
            Source {
                duration: Some(duration),
                size: None,
            },
        );
        self
    }

    fn current(&self) -> Option<&Source> {
        self.src.as_ref().and_then(|s| self.sources.get(s))
    }

    /// Jump the clock without raising a seek.
    pub fn set_time(&mut self, secs: f64) {
        self.time = secs;
    }

    /// Advance the clock while playing and raise a time update.
    pub fn advance(&mut self, secs: f64) {
        if self.paused || self.src.is_none() {
            return;
        }
        self.time += secs;
        if let Some(duration) = self.current().and_then(|s| s.duration).filter(|d| d.is_finite()) {
            if self.time >= duration {
                self.time = duration;
                self.ended = true;
                self.paused = true;
                self.events.push_back(MediaEvent::TimeUpdate);
                self.events.push_back(MediaEvent::Ended);
                return;
            }
        }
        self.events.push_back(MediaEvent::TimeUpdate);
    }

    /// Queue an arbitrary event.
    pub fn push_event(&mut self, event: MediaEvent) {
        self.events.push_back(event);
    }

    /// Drop every queued event.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn last_seek(&self) -> Option<f64> {
        self.seeks.last().copied()
    }
}

impl MediaElement for ScriptedMedia {
    fn load(&mut self, source_url: &str) -> ClipResult<()> {
        self.loads.push(source_url.to_string());
        self.time = 0.0;
        self.paused = true;
        self.ended = false;
        self.src = Some(source_url.to_string());
        if self.sources.contains_key(source_url) {
            self.events.push_back(MediaEvent::MetadataLoaded);
            Ok(())
        } else {
            self.events
                .push_back(MediaEvent::Error(format!("cannot load {source_url}")));
            Err(ClipError::playback(format!("unknown source {source_url}")))
        }
    }

    fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, secs: f64) {
        let upper = self
            .current()
            .and_then(|s| s.duration)
            .filter(|d| d.is_finite())
            .unwrap_or(f64::MAX);
        self.time = secs.max(0.0).min(upper);
        self.ended = false;
        self.seeks.push(secs);
        self.events.push_back(MediaEvent::Seeked);
    }

    fn play(&mut self) -> ClipResult<()> {
        self.play_calls += 1;
        if self.reject_play {
            return Err(ClipError::playback("play() rejected"));
        }
        self.paused = false;
        self.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn duration(&self) -> Option<f64> {
        self.current().and_then(|s| s.duration)
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        self.current().and_then(|s| s.size)
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        let (width, height) = self.current()?.size?;
        let shade = ((self.time * 10.0) as u64 % 256) as u8;
        let data = vec![shade; VideoFrame::expected_len(width, height)];
        Some(VideoFrame::new(width, height, self.time, data))
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.pop_front()
    }
}
