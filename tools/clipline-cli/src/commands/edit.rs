//! Scene edits: trim, remove, and reorder.

use clipline_common::clock::format_timecode;
use clipline_common::config::AppConfig;
use clipline_scene_model::{ClipId, TrimHandle};
use clipline_timeline::{MediaElement, SceneEditor};

use super::OpenProject;

pub fn trim(
    config: &AppConfig,
    id: &str,
    clip: &str,
    start: Option<f64>,
    end: Option<f64>,
) -> anyhow::Result<()> {
    if start.is_none() && end.is_none() {
        anyhow::bail!("Nothing to do: pass --start and/or --end");
    }
    let mut project = OpenProject::open(config, id)?;
    project.resolve_durations();
    let index = project.clip_index(clip)?;

    let applied = apply_trim(&mut project.editor, index, start, end)
        .ok_or_else(|| anyhow::anyhow!("Clip {clip} cannot be trimmed yet"))?;
    for (handle, value, stored) in applied {
        if (stored - value).abs() > f64::EPSILON {
            println!("  {handle:?} clamped from {value:.2}s to {stored:.2}s");
        }
    }

    project.save()?;
    if let Some(window) = project.editor.window_of(index) {
        println!(
            "Trimmed {clip}: {} - {} ({:.2}s visible)",
            format_timecode(window.start),
            format_timecode(window.end),
            window.visible_duration()
        );
    }
    Ok(())
}

/// Apply the requested bounds to clip `index`, returning
/// `(handle, requested, stored)` per bound.
///
/// A start at or past the current end moves the end first so the start is
/// clamped against the new window rather than the old one.
fn apply_trim<M: MediaElement>(
    editor: &mut SceneEditor<M>,
    index: usize,
    start: Option<f64>,
    end: Option<f64>,
) -> Option<Vec<(TrimHandle, f64, f64)>> {
    let current_end = editor.window_of(index)?.end;
    let end_first = matches!((start, end), (Some(s), Some(_)) if s >= current_end);
    let order = if end_first {
        [(TrimHandle::End, end), (TrimHandle::Start, start)]
    } else {
        [(TrimHandle::Start, start), (TrimHandle::End, end)]
    };

    let mut applied = Vec::new();
    for (handle, value) in order {
        let Some(value) = value else {
            continue;
        };
        let stored = editor.set_trim(index, handle, value)?;
        applied.push((handle, value, stored));
    }
    Some(applied)
}

pub fn remove(config: &AppConfig, id: &str, clip: &str) -> anyhow::Result<()> {
    let mut project = OpenProject::open(config, id)?;
    if !project.editor.remove_clip(&ClipId::new(clip)) {
        anyhow::bail!("Clip {clip} is not in project {id}");
    }
    project.save()?;
    println!(
        "Removed {clip}; {} clip(s) remain",
        project.editor.scene().len()
    );
    Ok(())
}

pub fn move_clip(config: &AppConfig, id: &str, from: usize, to: usize) -> anyhow::Result<()> {
    let mut project = OpenProject::open(config, id)?;
    if !project.editor.move_clip(from, to) {
        anyhow::bail!(
            "Cannot move clip {from} to {to}: scene has {} clip(s)",
            project.editor.scene().len()
        );
    }
    project.save()?;
    let order: Vec<&str> = project
        .editor
        .scene()
        .clips()
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    println!("New order: {}", order.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipline_common::config::EditorSettings;
    use clipline_scene_model::Clip;
    use clipline_timeline::testing::ScriptedMedia;

    fn editor_with(clip: Clip) -> SceneEditor<ScriptedMedia> {
        let media = ScriptedMedia::new().with_source("a.mp4", 5.0);
        let mut editor = SceneEditor::new(vec![clip], media, &EditorSettings::default());
        editor.pump_media_events();
        editor
    }

    fn window(editor: &SceneEditor<ScriptedMedia>) -> (Option<f64>, Option<f64>) {
        let clip = &editor.scene().clips()[0];
        (clip.trim_start, clip.trim_end)
    }

    #[test]
    fn test_trim_shifting_window_right_moves_end_first() {
        let mut editor = editor_with(Clip::ready("clipA", "a.mp4").with_trim(Some(0.0), Some(2.0)));
        let applied = apply_trim(&mut editor, 0, Some(3.0), Some(4.5)).unwrap();
        assert_eq!(window(&editor), (Some(3.0), Some(4.5)));
        assert_eq!(applied[0].0, TrimHandle::End);
        assert!(applied.iter().all(|(_, value, stored)| value == stored));
    }

    #[test]
    fn test_trim_shifting_window_left_moves_start_first() {
        let mut editor = editor_with(Clip::ready("clipA", "a.mp4").with_trim(Some(3.0), Some(4.5)));
        apply_trim(&mut editor, 0, Some(0.5), Some(2.0)).unwrap();
        assert_eq!(window(&editor), (Some(0.5), Some(2.0)));
    }

    #[test]
    fn test_trim_single_bound_still_clamps() {
        let mut editor = editor_with(Clip::ready("clipA", "a.mp4").with_trim(Some(1.0), Some(3.0)));
        let applied = apply_trim(&mut editor, 0, Some(4.0), None).unwrap();
        assert_eq!(applied, vec![(TrimHandle::Start, 4.0, 2.5)]);
    }
}
