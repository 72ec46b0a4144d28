//! Clipline Render Engine
//!
//! Exports a clip's trim window as a standalone file, plus the ffmpeg-backed
//! native implementations of the media, capture, and download seams.
//!
//! # Export Pipeline
//!
//! ```text
//! active clip ── window == full clip? ── yes ──► download original (scene-<id>.mp4)
//!                        │
//!                        no
//!                        ▼
//!            mute element, seek to trim start
//!                        │  (seeked / already there / timeout = fail)
//!                        ▼
//!   canvas.capture_stream(fps) + element audio | silence | none
//!                        │
//!                        ▼
//!        recorder.start(), element.play()
//!                        │
//!     every display frame: draw current frame into canvas
//!                        │  (time >= trim end or ended)
//!                        ▼
//!      recorder.stop() ─► chunks ─► blob ─► trimmed-<id>.<ext>
//!                        │
//!                        ▼
//!  cleanup: restore audio, pause, seek to trim start, stop tracks
//! ```

pub mod capture;
pub mod download;
pub mod driver;
pub mod export;
pub mod format;
pub mod native_capture;
pub mod native_media;
pub mod probe;
pub mod thumbnail;

pub use capture::*;
pub use download::DirectoryDownloadSink;
pub use driver::{run_export, ExportReport};
pub use export::*;
pub use format::*;
pub use native_capture::{FfmpegCaptureBackend, FfmpegRecorder, RgbaCanvas};
pub use native_media::FfmpegMediaElement;
pub use probe::{FfprobeProbe, MediaInfo};
pub use thumbnail::ThumbnailGenerator;
