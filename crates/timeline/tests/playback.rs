use clipline_common::config::EditorSettings;
use clipline_scene_model::Clip;
use clipline_timeline::testing::ScriptedMedia;
use clipline_timeline::{EditorEvent, InteractionMode, MediaElement, MediaEvent, SceneEditor};

fn media() -> ScriptedMedia {
    ScriptedMedia::new()
        .with_source("a.mp4", 5.0)
        .with_source("b.mp4", 6.0)
        .with_source("c.mp4", 3.0)
}

fn three_clip_editor() -> SceneEditor<ScriptedMedia> {
    let clips = vec![
        Clip::ready("clip1", "a.mp4").with_trim(None, Some(2.0)),
        Clip::ready("clip2", "b.mp4").with_trim(Some(1.0), None),
        Clip::ready("clip3", "c.mp4"),
    ];
    let mut editor = SceneEditor::new(clips, media(), &EditorSettings::default());
    editor.pump_media_events();
    editor
}

#[test]
fn reaching_trim_end_within_epsilon_advances_to_next_clip() {
    let mut editor = three_clip_editor();
    assert!(editor.play());
    assert_eq!(*editor.mode(), InteractionMode::Playing);

    editor.media_mut().set_time(1.96);
    editor.media_mut().push_event(MediaEvent::TimeUpdate);
    editor.pump_media_events();

    assert_eq!(editor.scene().active_index(), Some(1));
    assert_eq!(editor.media().source(), Some("b.mp4"));
    assert_eq!(editor.media().last_seek(), Some(1.0));
    assert_eq!(editor.playhead(), 1.0);
    assert_eq!(*editor.mode(), InteractionMode::Playing);
    assert!(!editor.media().is_paused());
}

#[test]
fn time_short_of_epsilon_keeps_playing_current_clip() {
    let mut editor = three_clip_editor();
    editor.play();
    editor.media_mut().set_time(1.9);
    editor.media_mut().push_event(MediaEvent::TimeUpdate);
    editor.pump_media_events();

    assert_eq!(editor.scene().active_index(), Some(0));
    assert!((editor.playhead() - 1.9).abs() < 1e-9);
}

#[test]
fn last_clip_end_rewinds_and_pauses() {
    let mut editor = three_clip_editor();
    editor.select_clip(2);
    editor.pump_media_events();
    assert!(editor.play());

    editor.media_mut().advance(3.5);
    editor.pump_media_events();

    assert_eq!(editor.scene().active_index(), Some(2));
    assert_eq!(*editor.mode(), InteractionMode::Paused);
    assert_eq!(editor.media().last_seek(), Some(0.0));
    assert!(editor.media().is_paused());
}

#[test]
fn playback_before_trim_start_snaps_forward() {
    let mut editor = three_clip_editor();
    editor.select_clip(1);
    editor.pump_media_events();
    editor.play();

    editor.media_mut().set_time(0.2);
    editor.media_mut().push_event(MediaEvent::TimeUpdate);
    editor.pump_media_events();

    assert_eq!(editor.media().last_seek(), Some(1.0));
    assert_eq!(editor.playhead(), 1.0);
}

#[test]
fn play_at_window_end_rewinds_first() {
    let mut editor = three_clip_editor();
    editor.media_mut().set_time(2.0);
    assert!(editor.play());
    assert_eq!(editor.media().last_seek(), Some(0.0));
}

#[test]
fn rejected_play_falls_back_to_paused() {
    let mut editor = three_clip_editor();
    editor.media_mut().reject_play = true;
    assert!(!editor.play());
    assert_eq!(*editor.mode(), InteractionMode::Paused);
    assert!(editor.take_events().iter().all(|e| !matches!(e, EditorEvent::Notice { .. })));
}

#[test]
fn load_failure_is_silent_and_paused() {
    let clips = vec![Clip::ready("broken", "missing.mp4")];
    let mut editor = SceneEditor::new(clips, media(), &EditorSettings::default());
    editor.pump_media_events();
    assert_eq!(*editor.mode(), InteractionMode::Paused);
    assert_eq!(editor.duration_of(&"broken".into()), 4.0);
}

#[test]
fn select_clip_pauses_and_seeks_to_trim_start() {
    let mut editor = three_clip_editor();
    editor.play();
    assert!(editor.select_clip(1));
    assert_eq!(*editor.mode(), InteractionMode::Paused);
    editor.pump_media_events();
    assert_eq!(editor.media().last_seek(), Some(1.0));
    assert!(!editor.select_clip(7));
}

#[test]
fn rendering_blocks_playback_controls() {
    let mut editor = three_clip_editor();
    assert!(editor.enter_rendering());
    assert!(!editor.select_clip(1));
    assert!(!editor.play());
    assert!(!editor.toggle_play());
    assert_eq!(editor.scene().active_index(), Some(0));
    editor.exit_rendering();
    assert!(editor.toggle_play());
    assert!(editor.toggle_play());
    assert_eq!(*editor.mode(), InteractionMode::Paused);
}

#[test]
fn duration_discovery_runs_once_per_clip() {
    let mut editor = three_clip_editor();
    editor.select_clip(1);
    editor.pump_media_events();
    editor.select_clip(0);
    editor.pump_media_events();
    editor.take_events();

    editor.select_clip(1);
    editor.pump_media_events();
    let events = editor.take_events();
    assert!(events
        .iter()
        .all(|e| !matches!(e, EditorEvent::DurationResolved { .. })));
    assert_eq!(editor.durations().len(), 2);
}

#[test]
fn indefinite_duration_waits_for_reload() {
    let media = ScriptedMedia::new().with_indefinite_source("live.mp4");
    let clips = vec![Clip::ready("live", "live.mp4")];
    let mut editor = SceneEditor::new(clips, media, &EditorSettings::default());
    editor.pump_media_events();

    let id = "live".into();
    assert!(!editor.durations().is_resolved(&id));
    assert_eq!(editor.scene().clips()[0].trim_end, None);
    assert!(editor.reload(&id));
    assert_eq!(editor.media().loads.len(), 2);
}
