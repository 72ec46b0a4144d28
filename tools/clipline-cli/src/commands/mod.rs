pub mod check;
pub mod edit;
pub mod export;
pub mod info;
pub mod init;
pub mod probe;

use clipline_common::config::AppConfig;
use clipline_render_engine::{FfmpegMediaElement, FfprobeProbe};
use clipline_scene_model::{
    decode_payload, restore_scene, ClipId, FileProjectStore, ProjectRecord, ProjectSession,
};
use clipline_timeline::SceneEditor;

/// A stored project opened for editing.
pub struct OpenProject {
    pub store: FileProjectStore,
    pub record: ProjectRecord,
    pub session: ProjectSession,
    pub editor: SceneEditor<FfmpegMediaElement>,
    pub legacy: bool,
}

impl OpenProject {
    pub fn open(config: &AppConfig, id: &str) -> anyhow::Result<Self> {
        let store = FileProjectStore::new(&config.projects_dir);
        let record = store
            .load(id)
            .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
        let library = store
            .load_library(id)
            .map_err(|e| anyhow::anyhow!("Failed to load clip library: {e}"))?;
        let payload = decode_payload(&record.clips)
            .map_err(|e| anyhow::anyhow!("Invalid scene payload in project {id}: {e}"))?;
        let legacy = payload.is_legacy();

        let scene = restore_scene(payload, &library);
        let mut editor =
            SceneEditor::from_scene(scene, FfmpegMediaElement::new(), &config.editor);
        editor.pump_media_events();

        Ok(Self {
            session: ProjectSession::existing(&record.id, &record.name),
            store,
            record,
            editor,
            legacy,
        })
    }

    /// Probe every clip's duration. Returns how many resolved.
    pub fn resolve_durations(&mut self) -> usize {
        let probe = FfprobeProbe::new();
        if !probe.is_available() {
            tracing::warn!("ffprobe not found; clip durations stay at their defaults");
            return 0;
        }
        self.editor.resolve_all(&probe)
    }

    pub fn clip_index(&self, clip: &str) -> anyhow::Result<usize> {
        self.editor
            .scene()
            .index_of(&ClipId::new(clip))
            .ok_or_else(|| anyhow::anyhow!("Clip {clip} is not in project {}", self.record.id))
    }

    pub fn save(&mut self) -> anyhow::Result<String> {
        self.editor
            .save(&mut self.session, &mut self.store)
            .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))
    }
}
