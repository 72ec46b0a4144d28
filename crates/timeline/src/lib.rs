//! Clipline Timeline
//!
//! Drives one media element across an ordered scene of trimmed clips.
//!
//! # Architecture
//!
//! ```text
//! pointer / media events
//!          │
//!          ▼
//! ┌──────────────────────────────────────────────┐
//! │                 SceneEditor                  │
//! │  ┌──────────┐ ┌───────────┐ ┌─────────────┐  │
//! │  │ Duration │ │ Scrub and │ │ Sequential  │  │
//! │  │ Resolver │ │ Trim Drag │ │ Playback    │  │
//! │  └────┬─────┘ └─────┬─────┘ └──────┬──────┘  │
//! │       └─────────────┼──────────────┘         │
//! │                     ▼                        │
//! │          InteractionMode + Scene             │
//! └─────────────────────┬────────────────────────┘
//!                       ▼
//!               dyn MediaElement
//! ```
//!
//! Every handler takes `&mut self`; exactly one of scrubbing, trimming,
//! playback, or an export holds the media element at a time.

pub mod drag;
pub mod editor;
pub mod media;
pub mod mode;
pub mod playback;
pub mod resolver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use drag::*;
pub use editor::*;
pub use media::*;
pub use mode::*;
pub use resolver::*;
