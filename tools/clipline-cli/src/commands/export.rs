//! Export a clip's trim window.

use clipline_common::config::AppConfig;
use clipline_render_engine::{
    run_export, DirectoryDownloadSink, ExportOutcome, FfmpegCaptureBackend,
};
use clipline_timeline::EditorEvent;

use super::OpenProject;

pub async fn run(config: &AppConfig, id: &str, clip: Option<&str>) -> anyhow::Result<()> {
    let mut project = OpenProject::open(config, id)?;
    project.resolve_durations();
    if let Some(clip) = clip {
        let index = project.clip_index(clip)?;
        project.editor.select_clip(index);
        project.editor.pump_media_events();
    }

    let exports = project.store.exports_dir(id);
    let mut backend = FfmpegCaptureBackend::new(project.store.project_dir(id).join("cache"));
    if !backend.is_available() {
        anyhow::bail!("ffmpeg is not installed; run `clipline check`");
    }
    let mut sink = DirectoryDownloadSink::new(&exports);

    if let (Some(clip), Some(window)) = (
        project.editor.scene().active_clip(),
        project.editor.active_window(),
    ) {
        println!(
            "Exporting {} ({:.2}s - {:.2}s) to {}",
            clip.id,
            window.start,
            window.end,
            exports.display()
        );
    }

    let report = run_export(&mut project.editor, &mut backend, &mut sink, &config.export)
        .await
        .map_err(|e| anyhow::anyhow!("Export could not start: {e}"))?;

    for event in project.editor.take_events() {
        if let EditorEvent::Notice { message } = event {
            eprintln!("{message}");
        }
    }

    match report.outcome {
        ExportOutcome::Direct { file_name } => {
            println!("Clip is untrimmed; saved original as {}", exports.join(file_name).display());
        }
        ExportOutcome::Rendered {
            file_name,
            bytes,
            mime_type,
            ..
        } => {
            println!(
                "Export complete: {} ({bytes} bytes, {mime_type}, {} frames)",
                exports.join(file_name).display(),
                report.frames_drawn
            );
        }
        ExportOutcome::Failed { message } => {
            anyhow::bail!("Export failed: {message}");
        }
    }
    Ok(())
}
