//! Interaction mode of the editor.

use serde::Serialize;

use crate::drag::{ScrubDrag, TrimDrag};

/// What currently drives the media element.
///
/// Drag sessions live inside their variant, so starting one protocol ends any
/// other and releasing the pointer drops the anchor state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionMode {
    /// Empty scene, nothing to drive.
    #[default]
    Idle,
    Paused,
    Playing,
    Scrubbing(ScrubDrag),
    Trimming(TrimDrag),
    /// An export owns the element; UI operations are no-ops.
    Rendering,
}

impl InteractionMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::Paused => ModeKind::Paused,
            Self::Playing => ModeKind::Playing,
            Self::Scrubbing(_) => ModeKind::Scrubbing,
            Self::Trimming(_) => ModeKind::Trimming,
            Self::Rendering => ModeKind::Rendering,
        }
    }

    pub fn is_rendering(&self) -> bool {
        matches!(self, Self::Rendering)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Scrubbing(_) | Self::Trimming(_))
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Payload-free view of [`InteractionMode`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Idle,
    Paused,
    Playing,
    Scrubbing,
    Trimming,
    Rendering,
}
