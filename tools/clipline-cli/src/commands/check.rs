//! Check system capabilities.

use clipline_common::config::AppConfig;
use clipline_render_engine::probe::command_exists;
use clipline_render_engine::{CaptureBackend, FfmpegCaptureBackend};
use clipline_scene_model::FileProjectStore;

pub fn run(config: &AppConfig, write_config: bool) -> anyhow::Result<()> {
    println!("Clipline System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = command_exists("ffmpeg");
    let ffprobe = command_exists("ffprobe");
    report(ffmpeg, "ffmpeg (decoding, recording, thumbnails)");
    report(ffprobe, "ffprobe (clip durations)");

    let store = FileProjectStore::new(&config.projects_dir);
    match store.list() {
        Ok(ids) => println!(
            "[OK] Projects directory: {} ({} projects)",
            config.projects_dir.display(),
            ids.len()
        ),
        Err(e) => println!("[WARN] Projects directory: {e}"),
    }

    println!();
    println!("Export formats (most preferred first):");
    let backend = FfmpegCaptureBackend::new(std::env::temp_dir());
    for mime in &config.export.mime_preferences {
        let mark = if backend.is_type_supported(mime) { "yes" } else { "no " };
        println!("  [{mark}] {mime}");
    }

    if write_config {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;
        println!();
        println!("Configuration written.");
    }

    println!();
    if ffmpeg && ffprobe {
        println!("All required tools are available. Clipline is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to trim and export.");
    }
    Ok(())
}

fn report(ok: bool, what: &str) {
    if ok {
        println!("[OK] {what}");
    } else {
        println!("[MISSING] {what}");
    }
}
