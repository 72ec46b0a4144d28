//! ffmpeg-backed capture primitives.
//!
//! The canvas keeps an RGBA buffer and forwards every drawn frame through a
//! [`FrameTap`]. The recorder attaches to that tap and pipes raw frames into
//! an `ffmpeg` child; audio is read straight from the source file for the
//! recorded range, or generated with `anullsrc` for a silence track.

use std::collections::VecDeque;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use clipline_common::error::{ClipError, ClipResult};
use clipline_timeline::{MediaElement, VideoFrame};

use crate::capture::{
    CaptureBackend, FrameCanvas, FrameTap, MediaStream, MediaTrack, Recorder, RecorderEvent,
    RecorderOptions, RecorderState, TrackKind, TrackOrigin,
};
use crate::format::{codecs_of, container_of, extension_for, FALLBACK_MIME};
use crate::probe::{command_exists, local_source, FfprobeProbe};

/// Raw frames buffered between the display loop and the ffmpeg writer.
const FRAME_QUEUE_DEPTH: usize = 8;

/// In-memory RGBA canvas.
pub struct RgbaCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    tap: FrameTap,
}

impl RgbaCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; VideoFrame::expected_len(width, height)],
            tap: FrameTap::new(),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl FrameCanvas for RgbaCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw(&mut self, frame: &VideoFrame) -> ClipResult<()> {
        if !frame.is_well_formed() || frame.width == 0 || frame.height == 0 {
            return Err(ClipError::capture(format!(
                "malformed {}x{} frame ({} bytes)",
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        if frame.width == self.width && frame.height == self.height {
            self.pixels.copy_from_slice(&frame.data);
        } else {
            // Nearest-neighbour scale to the canvas.
            let (sw, sh) = (frame.width as usize, frame.height as usize);
            let (dw, dh) = (self.width as usize, self.height as usize);
            for y in 0..dh {
                let sy = y * sh / dh;
                for x in 0..dw {
                    let sx = x * sw / dw;
                    let src = (sy * sw + sx) * 4;
                    let dst = (y * dw + x) * 4;
                    self.pixels[dst..dst + 4].copy_from_slice(&frame.data[src..src + 4]);
                }
            }
        }

        self.tap.push(&VideoFrame::new(
            self.width,
            self.height,
            frame.media_time,
            self.pixels.clone(),
        ));
        Ok(())
    }

    fn capture_stream(&mut self, fps: u32) -> ClipResult<MediaStream> {
        Ok(MediaStream::new().with_track(MediaTrack::new(
            TrackKind::Video,
            TrackOrigin::Canvas {
                tap: self.tap.clone(),
                width: self.width,
                height: self.height,
                fps,
            },
        )))
    }
}

/// Whether the bundled encoders can produce `mime_type`.
pub fn supports_mime(mime_type: &str) -> bool {
    let codecs = codecs_of(mime_type);
    match container_of(mime_type) {
        "video/mp4" => codecs.iter().all(|c| {
            c == "h264" || c == "aac" || c.starts_with("avc1") || c.starts_with("mp4a")
        }),
        "video/webm" => codecs
            .iter()
            .all(|c| matches!(c.as_str(), "vp8" | "vp9" | "opus" | "vorbis")),
        _ => false,
    }
}

/// Output-side encoder arguments for a container type.
pub fn encoder_args(mime_type: &str) -> Vec<String> {
    let codecs = codecs_of(mime_type);
    let args: &[&str] = if container_of(mime_type) == "video/mp4" {
        &[
            "-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-movflags", "+faststart",
            "-f", "mp4",
        ]
    } else if codecs.iter().any(|c| c == "vp8") {
        &["-c:v", "libvpx", "-c:a", "libopus", "-f", "webm"]
    } else if codecs.iter().any(|c| c == "vorbis") {
        &["-c:v", "libvpx-vp9", "-c:a", "libvorbis", "-f", "webm"]
    } else {
        &["-c:v", "libvpx-vp9", "-c:a", "libopus", "-f", "webm"]
    };
    args.iter().map(|s| s.to_string()).collect()
}

/// Full ffmpeg argument list for recording `stream` into `output`.
pub fn recorder_args(
    stream: &MediaStream,
    options: &RecorderOptions,
    mime_type: &str,
    output: &Path,
) -> ClipResult<Vec<String>> {
    let (width, height, fps) = stream
        .video_tracks()
        .find_map(|t| match &t.origin {
            TrackOrigin::Canvas {
                width, height, fps, ..
            } => Some((*width, *height, *fps)),
            _ => None,
        })
        .ok_or_else(|| ClipError::record("stream has no canvas video track"))?;

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{width}x{height}"),
        "-r".into(),
        fps.to_string(),
        "-i".into(),
        "-".into(),
    ];

    let audio = stream.audio_tracks().next().map(|t| &t.origin);
    match audio {
        Some(TrackOrigin::Element { source_url }) => {
            if let Some((start, end)) = options.time_range {
                args.extend([
                    "-ss".to_string(),
                    format!("{start:.3}"),
                    "-t".to_string(),
                    format!("{:.3}", (end - start).max(0.0)),
                ]);
            }
            args.extend(["-i".to_string(), local_source(source_url).to_string()]);
        }
        Some(_) => {
            args.extend(
                ["-f", "lavfi", "-i", "anullsrc=channel_layout=stereo:sample_rate=48000"]
                    .map(String::from),
            );
        }
        None => {}
    }

    args.extend(["-map", "0:v:0"].map(String::from));
    if audio.is_some() {
        args.extend(["-map", "1:a:0"].map(String::from));
    }
    // yuv420p needs even dimensions.
    args.extend(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2"].map(String::from));
    args.extend(encoder_args(mime_type));
    args.extend(["-b:v".to_string(), options.video_bits_per_second.to_string()]);
    if audio.is_some() {
        args.extend([
            "-b:a".to_string(),
            options.audio_bits_per_second.to_string(),
            "-shortest".to_string(),
        ]);
    } else {
        args.push("-an".into());
    }
    args.push(output.to_string_lossy().into_owned());
    Ok(args)
}

/// Recorder that encodes canvas frames with an `ffmpeg` child process.
pub struct FfmpegRecorder {
    stream: MediaStream,
    options: RecorderOptions,
    mime_type: String,
    output: PathBuf,
    state: RecorderState,
    child: Option<Child>,
    writer: Option<JoinHandle<std::io::Result<u64>>>,
    stderr_task: Option<JoinHandle<String>>,
    events: VecDeque<RecorderEvent>,
}

impl FfmpegRecorder {
    pub fn new(stream: MediaStream, options: RecorderOptions, output: PathBuf) -> Self {
        let mime_type = options
            .mime_type
            .clone()
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        Self {
            stream,
            options,
            mime_type,
            output,
            state: RecorderState::Inactive,
            child: None,
            writer: None,
            stderr_task: None,
            events: VecDeque::new(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    fn canvas_tap(&self) -> Option<FrameTap> {
        self.stream.video_tracks().find_map(|t| match &t.origin {
            TrackOrigin::Canvas { tap, .. } => Some(tap.clone()),
            _ => None,
        })
    }

    fn spawn_writer(stdin: ChildStdin, frames: mpsc::Receiver<VideoFrame>) -> JoinHandle<std::io::Result<u64>> {
        std::thread::spawn(move || {
            let mut stdin = stdin;
            let mut written = 0u64;
            // Ends when the tap is detached and the sender dropped.
            for frame in frames {
                stdin.write_all(&frame.data)?;
                written += 1;
            }
            stdin.flush()?;
            Ok(written)
        })
    }

    /// Wait for ffmpeg and queue the encoded file or the failure.
    fn finish(&mut self) {
        let frames = match self.writer.take().map(|w| w.join()) {
            Some(Ok(Ok(n))) => n,
            Some(Ok(Err(e))) => {
                // A broken pipe means ffmpeg exited early; its stderr says why.
                tracing::debug!(error = %e, "Frame writer stopped");
                0
            }
            Some(Err(_)) => {
                self.events
                    .push_back(RecorderEvent::Error("frame writer panicked".to_string()));
                return;
            }
            None => 0,
        };

        let status = match self.child.take().map(|mut c| c.wait()) {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                self.events
                    .push_back(RecorderEvent::Error(format!("Failed waiting for ffmpeg: {e}")));
                return;
            }
            None => {
                self.events.push_back(RecorderEvent::Stopped);
                return;
            }
        };
        let stderr = self
            .stderr_task
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or_default();

        if !status.success() {
            self.events.push_back(RecorderEvent::Error(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
            return;
        }

        match std::fs::read(&self.output) {
            Ok(data) => {
                tracing::debug!(frames, bytes = data.len(), path = %self.output.display(), "Recording encoded");
                self.events.push_back(RecorderEvent::DataAvailable(data));
                self.events.push_back(RecorderEvent::Stopped);
            }
            Err(e) => self.events.push_back(RecorderEvent::Error(format!(
                "Failed to read {}: {e}",
                self.output.display()
            ))),
        }
        let _ = std::fs::remove_file(&self.output);
    }
}

impl Recorder for FfmpegRecorder {
    fn start(&mut self) -> ClipResult<()> {
        if self.state != RecorderState::Inactive {
            return Err(ClipError::record("recorder already started"));
        }
        let tap = self
            .canvas_tap()
            .ok_or_else(|| ClipError::record("stream has no canvas video track"))?;
        let args = recorder_args(&self.stream, &self.options, &self.mime_type, &self.output)?;

        tracing::debug!(args = ?args, "Running ffmpeg recorder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClipError::record(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipError::record("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipError::record("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        self.stderr_task = Some(std::thread::spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        }));

        let (tx, rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        tap.attach(tx);
        self.writer = Some(Self::spawn_writer(stdin, rx));
        tracing::info!(pid = child.id(), mime = %self.mime_type, "ffmpeg recorder started");
        self.child = Some(child);
        self.state = RecorderState::Recording;
        Ok(())
    }

    fn stop(&mut self) {
        if self.state != RecorderState::Recording {
            return;
        }
        self.state = RecorderState::Stopped;
        if let Some(tap) = self.canvas_tap() {
            tap.detach();
        }
        self.finish();
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    fn mime_type(&self) -> Option<&str> {
        Some(&self.mime_type)
    }

    fn poll_event(&mut self) -> Option<RecorderEvent> {
        self.events.pop_front()
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if let Some(tap) = self.canvas_tap() {
            tap.detach();
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = std::fs::remove_file(&self.output);
    }
}

/// [`CaptureBackend`] producing [`RgbaCanvas`] and [`FfmpegRecorder`].
pub struct FfmpegCaptureBackend {
    probe: FfprobeProbe,
    ffmpeg_available: bool,
    work_dir: PathBuf,
    silence_tracks: u32,
}

impl FfmpegCaptureBackend {
    /// Backend writing intermediate recordings under `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            probe: FfprobeProbe::new(),
            ffmpeg_available: command_exists("ffmpeg"),
            work_dir: work_dir.into(),
            silence_tracks: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.ffmpeg_available
    }

    fn next_output(&self, mime_type: &str) -> PathBuf {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        self.work_dir.join(format!(
            "clipline-rec-{}-{}.{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed),
            extension_for(mime_type)
        ))
    }
}

impl CaptureBackend for FfmpegCaptureBackend {
    fn capture_element(&mut self, media: &dyn MediaElement) -> ClipResult<MediaStream> {
        let source_url = media
            .source()
            .ok_or_else(|| ClipError::capture("media element has no source"))?;
        let info = self.probe.probe(source_url)?;
        let mut stream = MediaStream::new();
        if info.has_audio {
            stream.add_track(MediaTrack::new(
                TrackKind::Audio,
                TrackOrigin::Element {
                    source_url: source_url.to_string(),
                },
            ));
        }
        Ok(stream)
    }

    fn create_canvas(&mut self, width: u32, height: u32) -> ClipResult<Box<dyn FrameCanvas>> {
        if width == 0 || height == 0 {
            return Err(ClipError::capture(format!("invalid canvas size {width}x{height}")));
        }
        Ok(Box::new(RgbaCanvas::new(width, height)))
    }

    fn silence_track(&mut self) -> ClipResult<MediaTrack> {
        self.silence_tracks += 1;
        Ok(MediaTrack::new(TrackKind::Audio, TrackOrigin::Silence))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.ffmpeg_available && supports_mime(mime_type)
    }

    fn create_recorder(
        &mut self,
        stream: MediaStream,
        options: RecorderOptions,
    ) -> ClipResult<Box<dyn Recorder>> {
        if !self.ffmpeg_available {
            return Err(ClipError::unsupported("ffmpeg is not installed"));
        }
        std::fs::create_dir_all(&self.work_dir)?;
        let mime = options.mime_type.as_deref().unwrap_or(FALLBACK_MIME);
        let output = self.next_output(mime);
        Ok(Box::new(FfmpegRecorder::new(stream, options, output)))
    }

    fn release_audio(&mut self) {
        if self.silence_tracks > 0 {
            tracing::debug!(tracks = self.silence_tracks, "Released silence generators");
            self.silence_tracks = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(range: Option<(f64, f64)>) -> RecorderOptions {
        RecorderOptions {
            mime_type: Some("video/mp4".into()),
            video_bits_per_second: 50_000_000,
            audio_bits_per_second: 256_000,
            time_range: range,
        }
    }

    #[test]
    fn test_canvas_scales_and_feeds_tap() {
        let mut canvas = RgbaCanvas::new(2, 2);
        let stream = canvas.capture_stream(30).unwrap();
        let TrackOrigin::Canvas { tap, .. } = &stream.tracks()[0].origin else {
            panic!("expected canvas track");
        };
        let (tx, rx) = mpsc::sync_channel(1);
        tap.attach(tx);

        // 1x1 red frame fills the whole 2x2 canvas.
        let frame = VideoFrame::new(1, 1, 1.5, vec![255, 0, 0, 255]);
        canvas.draw(&frame).unwrap();
        assert_eq!(canvas.pixels().to_vec(), vec![255u8, 0, 0, 255].repeat(4));

        let captured = rx.try_recv().unwrap();
        assert_eq!((captured.width, captured.height), (2, 2));
        assert_eq!(captured.media_time, 1.5);
    }

    #[test]
    fn test_full_frame_queue_blocks_producer() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        let tap = FrameTap::new();
        let (tx, rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        tap.attach(tx);
        let total = FRAME_QUEUE_DEPTH + 3;
        let pushed = Arc::new(AtomicUsize::new(0));

        let producer = {
            let tap = tap.clone();
            let pushed = pushed.clone();
            std::thread::spawn(move || {
                let frame = VideoFrame::new(1, 1, 0.0, vec![0u8; 4]);
                for _ in 0..total {
                    assert!(tap.push(&frame));
                    pushed.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(pushed.load(Ordering::SeqCst) <= FRAME_QUEUE_DEPTH + 1);

        for _ in 0..total {
            rx.recv().unwrap();
        }
        producer.join().unwrap();
        assert_eq!(pushed.load(Ordering::SeqCst), total);
    }

    #[test]
    fn test_canvas_rejects_malformed_frame() {
        let mut canvas = RgbaCanvas::new(2, 2);
        let frame = VideoFrame::new(2, 2, 0.0, vec![0u8; 3]);
        assert!(canvas.draw(&frame).is_err());
    }

    #[test]
    fn test_supported_mime_types() {
        assert!(supports_mime("video/mp4;codecs=avc1,mp4a.40.2"));
        assert!(supports_mime("video/mp4;codecs=h264,aac"));
        assert!(supports_mime("video/webm;codecs=vp9,opus"));
        assert!(supports_mime("video/webm"));
        assert!(!supports_mime("video/webm;codecs=av1"));
        assert!(!supports_mime("video/x-matroska"));
    }

    #[test]
    fn test_encoder_args_follow_container() {
        assert!(encoder_args("video/mp4").contains(&"libx264".to_string()));
        assert!(encoder_args("video/webm;codecs=vp8,opus").contains(&"libvpx".to_string()));
        assert!(encoder_args(FALLBACK_MIME).contains(&"libvpx-vp9".to_string()));
    }

    #[test]
    fn test_recorder_args_read_source_audio_for_range() {
        let mut canvas = RgbaCanvas::new(640, 360);
        let mut stream = canvas.capture_stream(30).unwrap();
        stream.add_track(MediaTrack::new(
            TrackKind::Audio,
            TrackOrigin::Element {
                source_url: "file:///media/a.mp4".into(),
            },
        ));
        let args = recorder_args(
            &stream,
            &options(Some((1.0, 3.5))),
            "video/mp4",
            Path::new("/tmp/out.mp4"),
        )
        .unwrap();
        let joined = args.join(" ");
        assert!(joined.contains("-s 640x360 -r 30 -i -"));
        assert!(joined.contains("-ss 1.000 -t 2.500 -i /media/a.mp4"));
        assert!(joined.contains("-map 1:a:0"));
        assert!(joined.contains("-b:a 256000 -shortest"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn test_recorder_args_silence_and_video_only() {
        let mut canvas = RgbaCanvas::new(4, 4);
        let video_only = canvas.capture_stream(30).unwrap();
        let args = recorder_args(&video_only, &options(None), FALLBACK_MIME, Path::new("o.webm"))
            .unwrap()
            .join(" ");
        assert!(args.contains("-an"));
        assert!(!args.contains("1:a:0"));

        let silent = video_only.with_track(MediaTrack::new(TrackKind::Audio, TrackOrigin::Silence));
        let args = recorder_args(&silent, &options(None), FALLBACK_MIME, Path::new("o.webm"))
            .unwrap()
            .join(" ");
        assert!(args.contains("anullsrc"));
    }

    #[test]
    fn test_recorder_args_need_canvas_track() {
        let stream = MediaStream::new().with_track(MediaTrack::new(TrackKind::Audio, TrackOrigin::Silence));
        assert!(recorder_args(&stream, &options(None), "video/mp4", Path::new("o.mp4")).is_err());
    }
}
