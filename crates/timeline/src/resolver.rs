//! Clip duration resolution.
//!
//! Each ready clip gets exactly one attempt to discover its duration from
//! media metadata. A failed attempt leaves the duration unknown (callers keep
//! using the default) until an explicit [`DurationResolver::reload`].

use std::collections::HashSet;

use clipline_common::error::ClipResult;
use clipline_scene_model::{is_valid_duration, Clip, ClipId, DurationCache, TrimLimits};

/// Out-of-band metadata lookup for a media source.
pub trait MetadataProbe {
    /// Duration of the media at `source_url`, in seconds.
    fn probe_duration(&self, source_url: &str) -> ClipResult<f64>;
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Duration discovered and recorded. `trims_changed` reports whether the
    /// clip's stored trims were written.
    Resolved { secs: f64, trims_changed: bool },
    /// The cache already held a duration for the clip.
    AlreadyKnown(f64),
    /// Metadata arrived without a usable duration.
    Invalid,
    /// The clip had already used its attempt.
    Skipped,
}

/// Tracks which clips have used their one resolution attempt.
#[derive(Debug, Clone, Default)]
pub struct DurationResolver {
    attempted: HashSet<ClipId>,
    limits: TrimLimits,
}

impl DurationResolver {
    pub fn new(limits: TrimLimits) -> Self {
        Self {
            attempted: HashSet::new(),
            limits,
        }
    }

    /// Whether an attempt should be made for `clip` on its next load.
    pub fn needs_resolution(&self, clip: &Clip, cache: &DurationCache) -> bool {
        clip.is_playable() && !cache.is_resolved(&clip.id) && !self.attempted.contains(&clip.id)
    }

    pub fn was_attempted(&self, id: &ClipId) -> bool {
        self.attempted.contains(id)
    }

    /// Re-arm resolution for a clip whose duration is still unknown.
    ///
    /// Returns `false` if the duration is already known.
    pub fn reload(&mut self, id: &ClipId, cache: &DurationCache) -> bool {
        if cache.is_resolved(id) {
            return false;
        }
        self.attempted.remove(id)
    }

    /// Consume the clip's attempt with the duration reported by metadata.
    pub fn resolve(
        &mut self,
        clip: &mut Clip,
        cache: &mut DurationCache,
        reported: Option<f64>,
    ) -> Resolution {
        if let Some(known) = cache.get(&clip.id) {
            return Resolution::AlreadyKnown(known);
        }
        if !self.attempted.insert(clip.id.clone()) {
            return Resolution::Skipped;
        }

        let Some(secs) = reported.filter(|d| is_valid_duration(*d)) else {
            tracing::warn!(clip_id = %clip.id, ?reported, "Clip duration unavailable, using default");
            return Resolution::Invalid;
        };

        cache.record(&clip.id, secs);
        let mut trims_changed = false;
        if clip.trim_end.is_none() {
            clip.trim_end = Some(secs);
            trims_changed = true;
        }
        trims_changed |= clip.reclamp_to_duration(secs, self.limits);

        tracing::debug!(clip_id = %clip.id, secs, trims_changed, "Resolved clip duration");
        Resolution::Resolved {
            secs,
            trims_changed,
        }
    }

    /// Resolve through a probe instead of a loaded element.
    pub fn resolve_with(
        &mut self,
        probe: &dyn MetadataProbe,
        clip: &mut Clip,
        cache: &mut DurationCache,
    ) -> Resolution {
        if !self.needs_resolution(clip, cache) {
            return match cache.get(&clip.id) {
                Some(known) => Resolution::AlreadyKnown(known),
                None => Resolution::Skipped,
            };
        }
        let Some(url) = clip.source_url.clone() else {
            return Resolution::Skipped;
        };
        let reported = match probe.probe_duration(&url) {
            Ok(secs) => Some(secs),
            Err(e) => {
                tracing::warn!(clip_id = %clip.id, error = %e, "Duration probe failed");
                None
            }
        };
        self.resolve(clip, cache, reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipline_common::error::ClipError;

    struct FixedProbe(Option<f64>);

    impl MetadataProbe for FixedProbe {
        fn probe_duration(&self, _source_url: &str) -> ClipResult<f64> {
            self.0.ok_or_else(|| ClipError::resolution("no duration"))
        }
    }

    #[test]
    fn test_first_resolution_sets_missing_trim_end() {
        let mut resolver = DurationResolver::default();
        let mut cache = DurationCache::new();
        let mut clip = Clip::ready("a", "a.mp4");

        let outcome = resolver.resolve(&mut clip, &mut cache, Some(5.0));
        assert_eq!(
            outcome,
            Resolution::Resolved {
                secs: 5.0,
                trims_changed: true
            }
        );
        assert_eq!(clip.trim_end, Some(5.0));
        assert_eq!(cache.get(&clip.id), Some(5.0));
    }

    #[test]
    fn test_explicit_trim_end_is_kept() {
        let mut resolver = DurationResolver::default();
        let mut cache = DurationCache::new();
        let mut clip = Clip::ready("a", "a.mp4").with_trim(Some(1.0), Some(3.0));

        resolver.resolve(&mut clip, &mut cache, Some(5.0));
        assert_eq!(clip.trim_end, Some(3.0));
        assert_eq!(clip.trim_start, Some(1.0));
    }

    #[test]
    fn test_stale_trims_are_reclamped() {
        let mut resolver = DurationResolver::default();
        let mut cache = DurationCache::new();
        let mut clip = Clip::ready("a", "a.mp4").with_trim(Some(1.0), Some(9.0));

        resolver.resolve(&mut clip, &mut cache, Some(4.0));
        assert_eq!(clip.trim_end, Some(4.0));
    }

    #[test]
    fn test_invalid_duration_uses_attempt_until_reload() {
        let mut resolver = DurationResolver::default();
        let mut cache = DurationCache::new();
        let mut clip = Clip::ready("a", "a.mp4");

        assert_eq!(
            resolver.resolve(&mut clip, &mut cache, Some(f64::INFINITY)),
            Resolution::Invalid
        );
        assert!(clip.trim_end.is_none());
        assert!(!resolver.needs_resolution(&clip, &cache));
        assert_eq!(
            resolver.resolve(&mut clip, &mut cache, Some(5.0)),
            Resolution::Skipped
        );

        assert!(resolver.reload(&clip.id, &cache));
        assert!(resolver.needs_resolution(&clip, &cache));
        assert!(matches!(
            resolver.resolve(&mut clip, &mut cache, Some(5.0)),
            Resolution::Resolved { .. }
        ));
        assert!(!resolver.reload(&clip.id, &cache));
    }

    #[test]
    fn test_probe_failure_leaves_duration_unknown() {
        let mut resolver = DurationResolver::default();
        let mut cache = DurationCache::new();
        let mut clip = Clip::ready("a", "a.mp4");

        let outcome = resolver.resolve_with(&FixedProbe(None), &mut clip, &mut cache);
        assert_eq!(outcome, Resolution::Invalid);
        assert!(cache.is_empty());

        resolver.reload(&clip.id, &cache);
        let outcome = resolver.resolve_with(&FixedProbe(Some(6.5)), &mut clip, &mut cache);
        assert!(matches!(outcome, Resolution::Resolved { secs, .. } if secs == 6.5));
    }
}
