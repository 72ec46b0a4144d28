//! Clip identity, status, and the external task record it is built from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque clip identifier, unique within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClipId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle of a clip as seen by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipStatus {
    /// Still generating; no media yet.
    Pending,
    /// Media available; participates in trimming, playback, and export.
    Ready,
    /// Generation failed.
    Failed,
}

/// Status vocabulary used by the task layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<TaskStatus> for ClipStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending | TaskStatus::Processing => ClipStatus::Pending,
            TaskStatus::Completed => ClipStatus::Ready,
            TaskStatus::Failed => ClipStatus::Failed,
        }
    }
}

/// A generation task as supplied by the task layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,

    pub status: TaskStatus,

    /// URL of the generated video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    /// URL of a preview frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
}

/// One generated video asset placed in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub id: ClipId,

    /// Resolvable media location; absent while the clip is still generating.
    pub source_url: Option<String>,

    /// Static frame shown before playback and in the filmstrip.
    pub preview_image: Option<String>,

    pub status: ClipStatus,

    pub prompt: Option<String>,

    /// Start of the trim window in media seconds (`None` = 0).
    pub trim_start: Option<f64>,

    /// End of the trim window in media seconds (`None` = full duration).
    pub trim_end: Option<f64>,
}

impl Clip {
    /// A clip with no media and no trim.
    pub fn new(id: impl Into<ClipId>, status: ClipStatus) -> Self {
        Self {
            id: id.into(),
            source_url: None,
            preview_image: None,
            status,
            prompt: None,
            trim_start: None,
            trim_end: None,
        }
    }

    /// A ready clip pointing at `source_url`.
    pub fn ready(id: impl Into<ClipId>, source_url: impl Into<String>) -> Self {
        Self {
            source_url: Some(source_url.into()),
            ..Self::new(id, ClipStatus::Ready)
        }
    }

    /// Builder-style trim assignment.
    pub fn with_trim(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.trim_start = start;
        self.trim_end = end;
        self
    }

    /// Ready with a resolvable source: eligible for playback and export.
    pub fn is_playable(&self) -> bool {
        self.status == ClipStatus::Ready && self.source_url.is_some()
    }

    /// Whether an explicit trim has been stored on either boundary.
    pub fn has_explicit_trim(&self) -> bool {
        self.trim_start.is_some() || self.trim_end.is_some()
    }

    /// Convert back into the task layer's record shape.
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id.as_str().to_string(),
            status: match self.status {
                ClipStatus::Pending => TaskStatus::Pending,
                ClipStatus::Ready => TaskStatus::Completed,
                ClipStatus::Failed => TaskStatus::Failed,
            },
            result_url: self.source_url.clone(),
            thumbnail_url: self.preview_image.clone(),
            prompt: self.prompt.clone(),
            trim_start: self.trim_start,
            trim_end: self.trim_end,
        }
    }
}

impl From<TaskRecord> for Clip {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: ClipId::new(record.id),
            source_url: record.result_url,
            preview_image: record.thumbnail_url,
            status: record.status.into(),
            prompt: record.prompt,
            trim_start: record.trim_start,
            trim_end: record.trim_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_maps_processing_to_pending() {
        assert_eq!(ClipStatus::from(TaskStatus::Processing), ClipStatus::Pending);
        assert_eq!(ClipStatus::from(TaskStatus::Completed), ClipStatus::Ready);
        assert_eq!(ClipStatus::from(TaskStatus::Failed), ClipStatus::Failed);
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let json = r#"{
            "id": "clipA",
            "status": "COMPLETED",
            "resultUrl": "https://cdn.example/a.mp4",
            "thumbnailUrl": "https://cdn.example/a.jpg",
            "trimEnd": 3.5
        }"#;
        let clip: Clip = serde_json::from_str::<TaskRecord>(json).unwrap().into();
        assert_eq!(clip.id.as_str(), "clipA");
        assert!(clip.is_playable());
        assert_eq!(clip.trim_start, None);
        assert_eq!(clip.trim_end, Some(3.5));
        assert_eq!(clip.preview_image.as_deref(), Some("https://cdn.example/a.jpg"));
    }

    #[test]
    fn test_pending_clip_is_not_playable() {
        let clip = Clip::new("clipB", ClipStatus::Pending);
        assert!(!clip.is_playable());

        let mut ready_without_url = Clip::new("clipC", ClipStatus::Ready);
        assert!(!ready_without_url.is_playable());
        ready_without_url.source_url = Some("file:///tmp/c.mp4".to_string());
        assert!(ready_without_url.is_playable());
    }

    #[test]
    fn test_record_omits_absent_fields() {
        let record = Clip::ready("clipA", "a.mp4").to_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("trimStart"));
        assert!(!json.contains("thumbnailUrl"));
        assert!(json.contains("\"status\":\"COMPLETED\""));
    }
}
