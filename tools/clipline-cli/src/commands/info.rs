//! Show a project's scene.

use clipline_common::clock::format_timecode;
use clipline_common::config::AppConfig;

use super::OpenProject;

pub fn run(config: &AppConfig, id: &str, probe: bool) -> anyhow::Result<()> {
    let mut project = OpenProject::open(config, id)?;
    if probe {
        project.resolve_durations();
    }

    let record = &project.record;
    println!("Project: {}", record.name);
    println!("  ID: {}", record.id);
    println!("  Created: {}", record.created_at);
    println!("  Modified: {}", record.modified_at);
    if project.legacy {
        println!("  Scene format: legacy id list (trims reset to full range)");
    }
    println!();

    let editor = &project.editor;
    let scene = editor.scene();
    println!("Scene ({} clips):", scene.len());
    for (index, clip) in scene.clips().iter().enumerate() {
        let marker = if scene.active_index() == Some(index) { "*" } else { " " };
        let known = editor.durations().get(&clip.id);
        let duration = match known {
            Some(secs) => format!("{secs:.2}s"),
            None => "unknown".to_string(),
        };
        print!("  {marker} {index}. {} [{:?}] duration {duration}", clip.id, clip.status);
        if let Some(window) = editor.window_of(index) {
            print!(
                ", trim {} - {} ({:.2}s - {:.2}s)",
                format_timecode(window.start),
                format_timecode(window.end),
                window.start,
                window.end
            );
        }
        println!();
        if let Some(prompt) = &clip.prompt {
            println!("       prompt: {prompt}");
        }
    }

    Ok(())
}
