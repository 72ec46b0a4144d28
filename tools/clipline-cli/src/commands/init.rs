//! Create a new Clipline project.

use std::path::PathBuf;

use clipline_common::config::AppConfig;
use clipline_render_engine::{FfmpegMediaElement, ThumbnailGenerator};
use clipline_scene_model::{Clip, FileProjectStore, ProjectSession, TaskRecord};
use clipline_timeline::SceneEditor;

pub fn run(
    config: &AppConfig,
    name: String,
    library: Option<PathBuf>,
    thumbnails: bool,
) -> anyhow::Result<()> {
    let mut clips: Vec<Clip> = match &library {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
            let records: Vec<TaskRecord> = serde_json::from_str(&text)
                .map_err(|e| anyhow::anyhow!("Invalid clip library {}: {e}", path.display()))?;
            records.into_iter().map(Clip::from).collect()
        }
        None => Vec::new(),
    };

    let mut store = FileProjectStore::new(&config.projects_dir);
    let mut session = ProjectSession::new(&name);
    let mut editor = SceneEditor::new(clips.clone(), FfmpegMediaElement::new(), &config.editor);
    editor.pump_media_events();

    let id = editor
        .save(&mut session, &mut store)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    if thumbnails {
        let generator = ThumbnailGenerator::new(store.project_dir(&id).join("cache"));
        let made = generator.fill(&mut editor);
        println!("Generated {made} thumbnail(s)");
        for (index, clip) in clips.iter_mut().enumerate() {
            if clip.preview_image.is_none() {
                clip.preview_image = editor.preview_for(index).map(str::to_string);
            }
        }
    }
    store
        .save_library(&id, &clips)
        .map_err(|e| anyhow::anyhow!("Failed to write clip library: {e}"))?;

    let ready = clips.iter().filter(|c| c.is_playable()).count();
    println!("Project '{}' created", name);
    println!("  ID: {id}");
    println!("  Directory: {}", store.project_dir(&id).display());
    println!("  Clips: {} ({} ready)", clips.len(), ready);
    println!();
    println!("Directory structure:");
    println!("  {id}/");
    println!("  ├── meta/        (project.json, library.json)");
    println!("  ├── cache/       (thumbnails, intermediate recordings)");
    println!("  └── exports/     (downloaded and trimmed clips)");

    Ok(())
}
