//! Per-clip preview thumbnail cache.

use std::collections::HashMap;

use crate::clip::ClipId;

/// Generation state of one clip's thumbnail. Absence from the cache is the
/// third state ("not requested").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailState {
    InFlight,
    Resolved(String),
}

/// Thumbnails generated for clips that arrived without a preview image.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailCache {
    entries: HashMap<ClipId, ThumbnailState>,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: &ClipId) -> Option<&ThumbnailState> {
        self.entries.get(id)
    }

    /// Mark a request as started. Returns `false` if one is already in flight
    /// or resolved.
    pub fn begin(&mut self, id: &ClipId) -> bool {
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.clone(), ThumbnailState::InFlight);
        true
    }

    /// Store a generated thumbnail.
    pub fn resolve(&mut self, id: &ClipId, image: impl Into<String>) {
        self.entries
            .insert(id.clone(), ThumbnailState::Resolved(image.into()));
    }

    /// Drop an in-flight request that failed, so a later pass may retry.
    pub fn fail(&mut self, id: &ClipId) {
        if matches!(self.entries.get(id), Some(ThumbnailState::InFlight)) {
            self.entries.remove(id);
        }
    }

    pub fn resolved(&self, id: &ClipId) -> Option<&str> {
        match self.entries.get(id) {
            Some(ThumbnailState::Resolved(image)) => Some(image),
            _ => None,
        }
    }
}
