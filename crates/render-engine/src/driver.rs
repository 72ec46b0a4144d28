//! Async export driver.
//!
//! Paces display frames with a tokio interval at the capture rate and
//! releases the download URL after the configured delay.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use clipline_common::clock::RateController;
use clipline_common::config::ExportSettings;
use clipline_common::error::ClipResult;
use clipline_timeline::{MediaElement, SceneEditor};

use crate::capture::{CaptureBackend, DownloadSink};
use crate::export::{start_export, ExportOutcome, ExportStart};

/// Summary of a driven export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub outcome: ExportOutcome,
    pub frames_drawn: u64,
}

/// Run an export of the editor's active clip to completion.
///
/// Precondition failures are returned as errors; failures during the export
/// are reported in the outcome (and as an editor notice).
pub async fn run_export<M: MediaElement>(
    editor: &mut SceneEditor<M>,
    backend: &mut dyn CaptureBackend,
    sink: &mut dyn DownloadSink,
    settings: &ExportSettings,
) -> ClipResult<ExportReport> {
    let mut session = match start_export(editor, backend, sink, settings)? {
        ExportStart::Direct(outcome) => {
            return Ok(ExportReport {
                outcome,
                frames_drawn: 0,
            })
        }
        ExportStart::Rendering(session) => session,
    };

    let pacing = RateController::new(settings.capture_fps);
    let mut frames = tokio::time::interval(pacing.interval());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        frames.tick().await;
        session.pump_media_events(editor, backend, sink);
        if !session.on_frame(editor, backend, sink) {
            break;
        }
    }

    let frames_drawn = session.frames_drawn();
    let outcome = session
        .into_outcome()
        .unwrap_or_else(|| ExportOutcome::Failed {
            message: "export ended without an outcome".to_string(),
        });

    if let ExportOutcome::Rendered { object_url, .. } = &outcome {
        tokio::time::sleep(Duration::from_millis(settings.revoke_delay_ms)).await;
        sink.revoke(object_url);
        tracing::debug!(%object_url, "Revoked export URL");
    }

    Ok(ExportReport {
        outcome,
        frames_drawn,
    })
}
