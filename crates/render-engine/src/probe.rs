//! Media metadata via `ffprobe`.

use std::process::Command;

use serde::Deserialize;

use clipline_common::error::{ClipError, ClipResult};
use clipline_timeline::MetadataProbe;

/// Stream facts needed for playback and export.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Container duration; `None` when the container reports none.
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    /// Video frame rate; 30 when the stream reports none.
    pub fps: f64,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse ffprobe's `-of json` output.
pub fn parse_probe_json(json: &str) -> ClipResult<MediaInfo> {
    let output: ProbeOutput = serde_json::from_str(json)?;
    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    let duration = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok());
    let fps = video
        .and_then(|v| {
            v.avg_frame_rate
                .as_deref()
                .and_then(parse_rate)
                .or_else(|| v.r_frame_rate.as_deref().and_then(parse_rate))
        })
        .unwrap_or(30.0);

    Ok(MediaInfo {
        duration,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        fps,
        has_audio,
    })
}

/// `"30000/1001"` → 29.97. Zero or malformed rates are `None`.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Whether `binary` is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Strip a `file://` prefix so local sources can be handed to ffmpeg.
pub fn local_source(url: &str) -> &str {
    url.strip_prefix("file://").unwrap_or(url)
}

/// Metadata prober backed by the `ffprobe` binary.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe;

impl FfprobeProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn is_available(&self) -> bool {
        command_exists("ffprobe")
    }

    /// Probe stream and container metadata.
    pub fn probe(&self, source_url: &str) -> ClipResult<MediaInfo> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "stream=codec_type,width,height,avg_frame_rate,r_frame_rate:format=duration",
                "-of",
                "json",
            ])
            .arg(local_source(source_url))
            .output()
            .map_err(|e| ClipError::resolution(format!("Failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ClipError::resolution(format!(
                "ffprobe failed for {source_url}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let json = String::from_utf8(output.stdout)
            .map_err(|e| ClipError::resolution(format!("ffprobe output is not UTF-8: {e}")))?;
        parse_probe_json(&json)
    }
}

impl MetadataProbe for FfprobeProbe {
    fn probe_duration(&self, source_url: &str) -> ClipResult<f64> {
        self.probe(source_url)?
            .duration
            .ok_or_else(|| ClipError::resolution(format!("{source_url} reports no duration")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_json() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001"},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "5.005000"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!(info.has_audio);
        assert_eq!(info.duration, Some(5.005));
    }

    #[test]
    fn test_parse_probe_json_without_video() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "N/A"}}"#;
        let info = parse_probe_json(json).unwrap();
        assert!(!info.has_video());
        assert_eq!(info.duration, None);
        assert_eq!(info.fps, 30.0);
    }

    #[test]
    fn test_parse_rate_rejects_zero() {
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("25"), Some(25.0));
    }

    #[test]
    fn test_local_source_strips_scheme() {
        assert_eq!(local_source("file:///tmp/a.mp4"), "/tmp/a.mp4");
        assert_eq!(local_source("/tmp/a.mp4"), "/tmp/a.mp4");
    }
}
