//! Native media element decoding RGBA frames with ffmpeg.
//!
//! Playback runs on the wall clock. Frames are decoded lazily from an
//! `ffmpeg -f rawvideo` child as the clock passes their presentation time,
//! which happens whenever the host polls for events.

use std::collections::VecDeque;
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Instant;

use clipline_common::clock::RateController;
use clipline_common::error::{ClipError, ClipResult};
use clipline_timeline::{MediaElement, MediaEvent, VideoFrame};

use crate::probe::{local_source, FfprobeProbe, MediaInfo};

/// Raw frame reader over an ffmpeg child process.
struct FrameDecoder {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    start: f64,
    frame_interval: f64,
    decoded: u64,
}

impl FrameDecoder {
    fn spawn(source: &str, info: &MediaInfo, start: f64) -> ClipResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss"])
            .arg(format!("{start:.3}"))
            .arg("-i")
            .arg(local_source(source))
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipError::playback(format!("Failed to start ffmpeg decoder: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipError::playback("Failed to capture ffmpeg decoder stdout"))?;
        Ok(Self {
            child,
            stdout,
            width: info.width,
            height: info.height,
            start,
            frame_interval: 1.0 / info.fps.max(1.0),
            decoded: 0,
        })
    }

    /// Presentation time of the next frame to be read.
    fn next_pts(&self) -> f64 {
        self.start + self.decoded as f64 * self.frame_interval
    }

    /// Read one frame. `None` at end of stream.
    fn read_frame(&mut self) -> Option<VideoFrame> {
        let mut data = vec![0u8; VideoFrame::expected_len(self.width, self.height)];
        self.stdout.read_exact(&mut data).ok()?;
        let pts = self.next_pts();
        self.decoded += 1;
        Some(VideoFrame::new(self.width, self.height, pts, data))
    }
}

impl Drop for FrameDecoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A [`MediaElement`] over a local media file.
pub struct FfmpegMediaElement {
    probe: FfprobeProbe,
    source: Option<String>,
    info: Option<MediaInfo>,
    decoder: Option<FrameDecoder>,
    frame: Option<VideoFrame>,
    position: f64,
    playing_since: Option<Instant>,
    ended: bool,
    muted: bool,
    volume: f64,
    events: VecDeque<MediaEvent>,
    decode_failed: bool,
    epoch: Instant,
    pacing: RateController,
}

impl Default for FfmpegMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegMediaElement {
    pub fn new() -> Self {
        Self {
            probe: FfprobeProbe::new(),
            source: None,
            info: None,
            decoder: None,
            frame: None,
            position: 0.0,
            playing_since: None,
            ended: false,
            muted: false,
            volume: 1.0,
            events: VecDeque::new(),
            decode_failed: false,
            epoch: Instant::now(),
            pacing: RateController::new(30),
        }
    }

    /// Metadata of the loaded source.
    pub fn info(&self) -> Option<&MediaInfo> {
        self.info.as_ref()
    }

    fn finite_duration(&self) -> Option<f64> {
        self.info
            .as_ref()
            .and_then(|i| i.duration)
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// At most one clock advance per frame interval, so draining the event
    /// queue terminates.
    fn tick_due(&mut self) -> bool {
        let now_ns = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.pacing.should_tick(now_ns)
    }

    /// Advance the clock: decode frames up to now and raise time updates.
    fn tick(&mut self) {
        let Some(info) = self.info.clone() else {
            return;
        };
        let now = self.current_time();

        if info.has_video() && !self.decode_failed {
            self.decode_until(&info, now);
        }

        if self.playing_since.is_none() {
            return;
        }
        if let Some(duration) = self.finite_duration() {
            if now >= duration {
                self.position = duration;
                self.playing_since = None;
                self.ended = true;
                self.events.push_back(MediaEvent::TimeUpdate);
                self.events.push_back(MediaEvent::Ended);
                return;
            }
        }
        self.events.push_back(MediaEvent::TimeUpdate);
    }

    fn decode_until(&mut self, info: &MediaInfo, now: f64) {
        if self.decoder.is_none() {
            let Some(source) = self.source.clone() else {
                return;
            };
            match FrameDecoder::spawn(&source, info, self.position) {
                Ok(decoder) => self.decoder = Some(decoder),
                Err(e) => {
                    tracing::debug!(error = %e, "Frame decoder unavailable");
                    self.decode_failed = true;
                    return;
                }
            }
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        // Always show at least one frame, then catch up to the clock.
        while self.frame.is_none() || decoder.next_pts() <= now {
            match decoder.read_frame() {
                Some(frame) => self.frame = Some(frame),
                None => break,
            }
        }
    }
}

impl MediaElement for FfmpegMediaElement {
    fn load(&mut self, source_url: &str) -> ClipResult<()> {
        self.decoder = None;
        self.frame = None;
        self.position = 0.0;
        self.playing_since = None;
        self.ended = false;
        self.decode_failed = false;
        self.source = Some(source_url.to_string());

        match self.probe.probe(source_url) {
            Ok(info) => {
                tracing::debug!(source = source_url, duration = ?info.duration, "Loaded media");
                self.pacing = RateController::new(info.fps.round().max(1.0) as u32);
                self.info = Some(info);
                self.events.push_back(MediaEvent::MetadataLoaded);
                Ok(())
            }
            Err(e) => {
                self.info = None;
                self.events.push_back(MediaEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn current_time(&self) -> f64 {
        let time = match self.playing_since {
            Some(since) => self.position + since.elapsed().as_secs_f64(),
            None => self.position,
        };
        match self.finite_duration() {
            Some(duration) => time.min(duration),
            None => time,
        }
    }

    fn seek(&mut self, secs: f64) {
        let upper = self.finite_duration().unwrap_or(f64::MAX);
        self.position = if secs.is_finite() {
            secs.max(0.0).min(upper)
        } else {
            0.0
        };
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        self.ended = false;
        self.decoder = None;
        self.frame = None;
        self.events.push_back(MediaEvent::Seeked);
    }

    fn play(&mut self) -> ClipResult<()> {
        if self.info.is_none() {
            return Err(ClipError::playback("no media loaded"));
        }
        if self.playing_since.is_none() {
            if self.ended {
                self.position = 0.0;
                self.decoder = None;
                self.frame = None;
                self.ended = false;
            }
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.position = self.current_time();
            self.playing_since = None;
        }
    }

    fn is_paused(&self) -> bool {
        self.playing_since.is_none()
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn duration(&self) -> Option<f64> {
        self.info.as_ref().and_then(|i| i.duration)
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        self.info
            .as_ref()
            .filter(|i| i.has_video())
            .map(|i| (i.width, i.height))
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
        self.frame.clone()
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        if self.events.is_empty() && self.tick_due() {
            self.tick();
        }
        self.events.pop_front()
    }
}
