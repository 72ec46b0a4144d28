//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where projects are stored.
    pub projects_dir: PathBuf,

    /// Timeline editing tolerances and layout constants.
    pub editor: EditorSettings,

    /// Trim export parameters.
    pub export: ExportSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Tolerances and layout constants used by the timeline editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Duration assumed for clips whose metadata has not loaded yet.
    pub default_clip_duration_secs: f64,

    /// Shortest trim window a drag may produce.
    pub min_segment_secs: f64,

    /// Distance from the trim end that counts as "reached the end".
    pub end_epsilon_secs: f64,

    /// Trim-drag updates smaller than this are not committed.
    pub trim_commit_epsilon_secs: f64,

    /// Re-seeking on activation is skipped when already this close.
    pub reselect_seek_tolerance_secs: f64,

    /// Filmstrip width representing a clip's full duration.
    pub filmstrip_full_width_px: f64,

    /// Filmstrip items never render narrower than this.
    pub filmstrip_min_width_px: f64,
}

/// Parameters for the trim export pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Frame rate requested from capture streams.
    pub capture_fps: u32,

    /// Recorder video bitrate.
    pub video_bits_per_second: u64,

    /// Recorder audio bitrate.
    pub audio_bits_per_second: u64,

    /// Canvas size used when the source dimensions are unknown.
    pub fallback_width: u32,
    pub fallback_height: u32,

    /// Trim bounds this close to the clip bounds count as untrimmed.
    pub noop_tolerance_secs: f64,

    /// Seek is considered complete when within this distance of the target.
    pub seek_tolerance_secs: f64,

    /// Upper bound on waiting for seek confirmation before failing.
    pub seek_timeout_ms: u64,

    /// Delay before a temporary download URL is released.
    pub revoke_delay_ms: u64,

    /// Container/codec preferences, most preferred first.
    pub mime_preferences: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            editor: EditorSettings::default(),
            export: ExportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_clip_duration_secs: 4.0,
            min_segment_secs: 0.5,
            end_epsilon_secs: 0.05,
            trim_commit_epsilon_secs: 0.05,
            reselect_seek_tolerance_secs: 0.15,
            filmstrip_full_width_px: 224.0,
            filmstrip_min_width_px: 40.0,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            capture_fps: 30,
            video_bits_per_second: 50_000_000,
            audio_bits_per_second: 256_000,
            fallback_width: 1280,
            fallback_height: 720,
            noop_tolerance_secs: 0.1,
            seek_tolerance_secs: 0.01,
            seek_timeout_ms: 3000,
            revoke_delay_ms: 2000,
            mime_preferences: default_mime_preferences(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Widely compatible MP4 first, then WebM variants.
pub fn default_mime_preferences() -> Vec<String> {
    [
        "video/mp4;codecs=h264,aac",
        "video/mp4;codecs=avc1,mp4a.40.2",
        "video/mp4",
        "video/webm;codecs=vp9,opus",
        "video/webm;codecs=vp8,opus",
        "video/webm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipline").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("clipline").join("projects")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "editor": { "min_segment_secs": 1.0 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!((config.editor.min_segment_secs - 1.0).abs() < 1e-9);
        assert!((config.editor.default_clip_duration_secs - 4.0).abs() < 1e-9);
        assert_eq!(config.export.capture_fps, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_mime_preferences_start_with_mp4() {
        let prefs = ExportSettings::default().mime_preferences;
        assert_eq!(prefs.len(), 6);
        assert_eq!(prefs[0], "video/mp4;codecs=h264,aac");
        assert_eq!(prefs.last().map(String::as_str), Some("video/webm"));
    }
}
