//! Project records and the store a scene is saved through.
//!
//! A project directory looks like:
//!
//! ```text
//! <projects_dir>/<project-id>/
//!   meta/project.json   # ProjectRecord, including the scene payload
//!   meta/library.json   # known clip set (task records)
//!   exports/            # rendered clips
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, TaskRecord};

/// Persistence seam used by scene saves.
pub trait ProjectStore {
    /// Create a project holding `clips`. Returns the new project id.
    fn create_project(&mut self, name: &str, clips: serde_json::Value)
        -> Result<String, ProjectError>;

    /// Replace the name and scene payload of an existing project.
    fn update_project(
        &mut self,
        id: &str,
        name: &str,
        clips: serde_json::Value,
    ) -> Result<(), ProjectError>;
}

/// Stored project metadata (`meta/project.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Schema version.
    pub version: String,

    pub id: String,

    pub name: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    pub modified_at: String,

    /// Opaque scene payload.
    #[serde(default)]
    pub clips: serde_json::Value,
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, clips: serde_json::Value) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            id: id.into(),
            name: name.into(),
            created_at: now.clone(),
            modified_at: now,
            clips,
        }
    }

    /// Bump the modification timestamp.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Projects kept as directories under a common root.
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    root: PathBuf,
}

impl FileProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one project.
    pub fn project_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Where rendered clips for a project are written.
    pub fn exports_dir(&self, id: &str) -> PathBuf {
        self.project_dir(id).join("exports")
    }

    fn meta_path(&self, id: &str, file: &str) -> PathBuf {
        self.project_dir(id).join("meta").join(file)
    }

    /// Load a project's metadata.
    pub fn load(&self, id: &str) -> Result<ProjectRecord, ProjectError> {
        read_json(&self.meta_path(id, "project.json"))
    }

    /// Known clip set of a project. A missing library is empty.
    pub fn load_library(&self, id: &str) -> Result<Vec<Clip>, ProjectError> {
        let path = self.meta_path(id, "library.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let records: Vec<TaskRecord> = read_json(&path)?;
        Ok(records.into_iter().map(Clip::from).collect())
    }

    /// Replace a project's known clip set.
    pub fn save_library(&self, id: &str, clips: &[Clip]) -> Result<(), ProjectError> {
        let records: Vec<TaskRecord> = clips.iter().map(Clip::to_record).collect();
        write_json(&self.meta_path(id, "library.json"), &records)
    }

    /// Ids of every project under the root, sorted.
    pub fn list(&self) -> Result<Vec<String>, ProjectError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.root).map_err(|e| ProjectError::IoError {
            path: self.root.clone(),
            source: e,
        })?;
        let mut ids: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().join("meta").join("project.json").exists())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn save(&self, record: &ProjectRecord) -> Result<(), ProjectError> {
        let exports = self.exports_dir(&record.id);
        std::fs::create_dir_all(&exports).map_err(|e| ProjectError::IoError {
            path: exports,
            source: e,
        })?;
        write_json(&self.meta_path(&record.id, "project.json"), record)
    }
}

impl ProjectStore for FileProjectStore {
    fn create_project(
        &mut self,
        name: &str,
        clips: serde_json::Value,
    ) -> Result<String, ProjectError> {
        let id = project_id();
        if self.project_dir(&id).exists() {
            return Err(ProjectError::ValidationError {
                message: format!("project {id} already exists"),
            });
        }
        self.save(&ProjectRecord::new(&id, name, clips))?;
        Ok(id)
    }

    fn update_project(
        &mut self,
        id: &str,
        name: &str,
        clips: serde_json::Value,
    ) -> Result<(), ProjectError> {
        let mut record = self.load(id)?;
        record.name = name.to_string();
        record.clips = clips;
        record.touch();
        self.save(&record)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ProjectError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

/// Time-ordered project id: `p<timestamp>-<counter>`.
fn project_id() -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let now = chrono::Utc::now();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("p{}-{:04x}", now.format("%Y%m%d%H%M%S%6f"), seq & 0xFFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clipline_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_project_ids_are_unique() {
        let a = project_id();
        let b = project_id();
        assert_ne!(a, b);
        assert!(a.starts_with('p'));
    }

    #[test]
    fn test_create_then_update() {
        let root = temp_root("store_update");
        let mut store = FileProjectStore::new(&root);

        let id = store
            .create_project("First", serde_json::json!(["clipA"]))
            .unwrap();
        assert!(store.exports_dir(&id).is_dir());

        store
            .update_project(&id, "Renamed", serde_json::json!([{"id": "clipA", "trimEnd": 2.0}]))
            .unwrap();
        let record = store.load(&id).unwrap();
        assert_eq!(record.name, "Renamed");
        assert_eq!(record.clips, serde_json::json!([{"id": "clipA", "trimEnd": 2.0}]));
        assert_eq!(store.list().unwrap(), vec![id]);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_update_missing_project_fails() {
        let root = temp_root("store_missing");
        let mut store = FileProjectStore::new(&root);
        let err = store
            .update_project("nope", "x", serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, ProjectError::IoError { .. }));
    }

    #[test]
    fn test_library_round_trip() {
        let root = temp_root("store_library");
        let store = FileProjectStore::new(&root);
        assert!(store.load_library("p1").unwrap().is_empty());

        let clips = vec![Clip::ready("clipA", "a.mp4").with_trim(None, Some(3.0))];
        store.save_library("p1", &clips).unwrap();
        assert_eq!(store.load_library("p1").unwrap(), clips);

        std::fs::remove_dir_all(&root).ok();
    }
}
