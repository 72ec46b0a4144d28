//! Write-once cache of discovered media durations.

use std::collections::HashMap;

use crate::clip::ClipId;

/// Whether a decoder-reported duration is usable.
pub fn is_valid_duration(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0
}

/// Discovered clip durations, keyed by clip id.
///
/// An entry is recorded at most once per clip and never overwritten. Absent
/// entries mean "unknown"; callers substitute a default for layout.
#[derive(Debug, Clone, Default)]
pub struct DurationCache {
    entries: HashMap<ClipId, f64>,
}

impl DurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a duration. Returns `true` only if this call stored it.
    pub fn record(&mut self, id: &ClipId, secs: f64) -> bool {
        if !is_valid_duration(secs) || self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.clone(), secs);
        true
    }

    pub fn get(&self, id: &ClipId) -> Option<f64> {
        self.entries.get(id).copied()
    }

    pub fn is_resolved(&self, id: &ClipId) -> bool {
        self.entries.contains_key(id)
    }

    /// The recorded duration, or `default` while unknown.
    pub fn duration_or(&self, id: &ClipId, default: f64) -> f64 {
        self.get(id).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_write_once() {
        let mut cache = DurationCache::new();
        let id = ClipId::new("clipA");
        assert!(cache.record(&id, 5.0));
        assert!(!cache.record(&id, 7.0));
        assert_eq!(cache.get(&id), Some(5.0));
    }

    #[test]
    fn test_invalid_durations_are_rejected() {
        let mut cache = DurationCache::new();
        let id = ClipId::new("clipA");
        assert!(!cache.record(&id, f64::INFINITY));
        assert!(!cache.record(&id, f64::NAN));
        assert!(!cache.record(&id, 0.0));
        assert!(!cache.is_resolved(&id));
        assert_eq!(cache.duration_or(&id, 4.0), 4.0);
    }
}
