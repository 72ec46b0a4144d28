//! Clipline Scene Model
//!
//! Defines the core data contracts for Clipline scenes:
//! - **Clips:** Generated video assets and their non-destructive trim windows
//! - **Scene:** The ordered, editable sequence of clips with one active clip
//! - **Durations:** Write-once cache of discovered media durations
//! - **Payloads:** The serialized clip list a project stores, legacy shape included
//!
//! All times are media-time seconds (`f64`). Screen-space values are CSS-style
//! pixels as reported by the host UI.

pub mod clip;
pub mod duration;
pub mod geometry;
pub mod payload;
pub mod project;
pub mod scene;
pub mod thumbnail;
pub mod trim;

pub use clip::*;
pub use duration::*;
pub use geometry::*;
pub use payload::*;
pub use project::*;
pub use scene::*;
pub use thumbnail::*;
pub use trim::*;
