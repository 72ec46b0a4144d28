//! Scene persistence payloads.
//!
//! A project stores its scene as an opaque "clips" blob. Two shapes exist in
//! the wild: the current list of `{id, trimStart?, trimEnd?}` entries, and a
//! legacy list of bare clip ids with no trim data.

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, ClipId};
use crate::project::{ProjectError, ProjectStore};
use crate::scene::Scene;

/// One persisted clip reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEntry {
    pub id: ClipId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
}

impl From<&Clip> for SceneEntry {
    fn from(clip: &Clip) -> Self {
        Self {
            id: clip.id.clone(),
            trim_start: clip.trim_start,
            trim_end: clip.trim_end,
        }
    }
}

/// Either persisted payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenePayload {
    /// Ordered bare ids; every clip is full-range.
    Legacy(Vec<ClipId>),
    Entries(Vec<SceneEntry>),
}

impl ScenePayload {
    /// Normalize to entries. Legacy ids become untrimmed entries.
    pub fn into_entries(self) -> Vec<SceneEntry> {
        match self {
            ScenePayload::Legacy(ids) => ids
                .into_iter()
                .map(|id| SceneEntry {
                    id,
                    trim_start: None,
                    trim_end: None,
                })
                .collect(),
            ScenePayload::Entries(entries) => entries,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ScenePayload::Legacy(_))
    }
}

/// Encode the scene's order and trims in the current payload shape.
pub fn encode_scene(scene: &Scene) -> Vec<SceneEntry> {
    scene.clips().iter().map(SceneEntry::from).collect()
}

/// Encode the scene as the JSON value a project stores.
pub fn encode_scene_value(scene: &Scene) -> serde_json::Value {
    serde_json::Value::Array(
        encode_scene(scene)
            .into_iter()
            .filter_map(|entry| serde_json::to_value(entry).ok())
            .collect(),
    )
}

/// Parse a stored payload. `null` means an empty scene.
pub fn decode_payload(value: &serde_json::Value) -> Result<ScenePayload, serde_json::Error> {
    if value.is_null() {
        return Ok(ScenePayload::Entries(Vec::new()));
    }
    ScenePayload::deserialize(value)
}

/// Resolve payload entries against the known clip set.
///
/// Unknown ids are dropped silently; the remaining order is preserved. Stored
/// trims replace the known clip's trims, and an absent stored trim clears it.
pub fn restore_scene(payload: ScenePayload, known: &[Clip]) -> Scene {
    let legacy = payload.is_legacy();
    let clips: Vec<Clip> = payload
        .into_entries()
        .into_iter()
        .filter_map(|entry| {
            let Some(found) = known.iter().find(|c| c.id == entry.id) else {
                tracing::debug!(clip_id = %entry.id, "Dropping unknown clip from payload");
                return None;
            };
            let mut clip = found.clone();
            clip.trim_start = entry.trim_start;
            clip.trim_end = entry.trim_end;
            Some(clip)
        })
        .collect();
    tracing::debug!(clips = clips.len(), legacy, "Restored scene");
    Scene::new(clips)
}

/// Tracks which project a scene saves into.
///
/// The first save creates a project; later saves update it.
#[derive(Debug, Clone, Default)]
pub struct ProjectSession {
    project_id: Option<String>,
    name: String,
}

impl ProjectSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project_id: None,
            name: name.into(),
        }
    }

    /// Session bound to an existing project.
    pub fn existing(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project_id: Some(id.into()),
            name: name.into(),
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Persist the scene. Returns the project id.
    pub fn save(
        &mut self,
        scene: &Scene,
        store: &mut dyn ProjectStore,
    ) -> Result<String, ProjectError> {
        let payload = encode_scene_value(scene);
        match &self.project_id {
            Some(id) => {
                store.update_project(id, &self.name, payload)?;
                tracing::info!(project_id = %id, clips = scene.len(), "Updated project");
                Ok(id.clone())
            }
            None => {
                let id = store.create_project(&self.name, payload)?;
                tracing::info!(project_id = %id, clips = scene.len(), "Created project");
                self.project_id = Some(id.clone());
                Ok(id)
            }
        }
    }
}
