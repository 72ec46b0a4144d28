//! The ordered scene being assembled.

use crate::clip::{Clip, ClipId};

/// Ordered clip sequence with exactly one active clip when non-empty.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    clips: Vec<Clip>,
    active: Option<usize>,
    playhead: f64,
}

impl Scene {
    /// Create a scene; the first clip becomes active.
    pub fn new(clips: Vec<Clip>) -> Self {
        let active = if clips.is_empty() { None } else { Some(0) };
        Self {
            clips,
            active,
            playhead: 0.0,
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clip(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn clip_mut(&mut self, index: usize) -> Option<&mut Clip> {
        self.clips.get_mut(index)
    }

    pub fn index_of(&self, id: &ClipId) -> Option<usize> {
        self.clips.iter().position(|c| &c.id == id)
    }

    pub fn find(&self, id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| &c.id == id)
    }

    pub fn find_mut(&mut self, id: &ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| &c.id == id)
    }

    /// Index of the active clip; `None` iff the scene is empty.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_clip(&self) -> Option<&Clip> {
        self.active.and_then(|i| self.clips.get(i))
    }

    pub fn active_clip_mut(&mut self) -> Option<&mut Clip> {
        self.active.and_then(move |i| self.clips.get_mut(i))
    }

    /// Whether a clip follows the active one.
    pub fn has_next(&self) -> bool {
        self.active.is_some_and(|i| i + 1 < self.clips.len())
    }

    /// Make `index` active. Out-of-range indices are rejected.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.clips.len() {
            return false;
        }
        self.active = Some(index);
        true
    }

    /// Current media time of the active clip.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn set_playhead(&mut self, secs: f64) {
        if secs.is_finite() {
            self.playhead = secs;
        }
    }

    /// Remove a clip reference from the scene (the asset itself is untouched).
    ///
    /// The active clip stays active when another clip is removed. When the
    /// active clip itself goes, its successor (or the new last clip) takes over.
    pub fn remove(&mut self, id: &ClipId) -> Option<Clip> {
        let index = self.index_of(id)?;
        let removed = self.clips.remove(index);
        self.active = match self.active {
            _ if self.clips.is_empty() => None,
            Some(active) if index < active => Some(active - 1),
            Some(active) => Some(active.min(self.clips.len() - 1)),
            None => Some(0),
        };
        Some(removed)
    }

    /// Move the clip at `from` to position `to`. The active clip follows its move.
    pub fn move_clip(&mut self, from: usize, to: usize) -> bool {
        let len = self.clips.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }
        let active_id = self.active_clip().map(|c| c.id.clone());
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        if let Some(id) = active_id {
            self.active = self.index_of(&id);
        }
        true
    }

    /// Replace the clip list with a fresh copy from the task layer.
    ///
    /// A longer list means clips were appended; the newest becomes active.
    pub fn sync(&mut self, clips: Vec<Clip>) {
        let grew = clips.len() > self.clips.len();
        self.clips = clips;
        self.active = if self.clips.is_empty() {
            None
        } else if grew {
            Some(self.clips.len() - 1)
        } else {
            Some(self.active.unwrap_or(0).min(self.clips.len() - 1))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> Scene {
        Scene::new(vec![
            Clip::ready("a", "a.mp4"),
            Clip::ready("b", "b.mp4"),
            Clip::ready("c", "c.mp4"),
        ])
    }

    #[test]
    fn test_empty_scene_has_no_active_clip() {
        let scene = Scene::new(vec![]);
        assert_eq!(scene.active_index(), None);
        assert!(scene.active_clip().is_none());
        assert!(!scene.has_next());
    }

    #[test]
    fn test_set_active_rejects_out_of_range() {
        let mut scene = three();
        assert!(scene.set_active(2));
        assert!(!scene.set_active(3));
        assert_eq!(scene.active_index(), Some(2));
        assert!(!scene.has_next());
    }

    #[test]
    fn test_remove_before_active_keeps_active_clip() {
        let mut scene = three();
        scene.set_active(2);
        scene.remove(&ClipId::new("a"));
        assert_eq!(scene.active_clip().map(|c| c.id.as_str()), Some("c"));
    }

    #[test]
    fn test_remove_active_last_clip_moves_to_new_last() {
        let mut scene = three();
        scene.set_active(2);
        scene.remove(&ClipId::new("c"));
        assert_eq!(scene.active_index(), Some(1));
    }

    #[test]
    fn test_remove_everything_empties_active() {
        let mut scene = Scene::new(vec![Clip::ready("a", "a.mp4")]);
        assert!(scene.remove(&ClipId::new("a")).is_some());
        assert_eq!(scene.active_index(), None);
        assert!(scene.remove(&ClipId::new("a")).is_none());
    }

    #[test]
    fn test_move_clip_active_follows() {
        let mut scene = three();
        scene.set_active(0);
        assert!(scene.move_clip(0, 2));
        let order: Vec<&str> = scene.clips().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(scene.active_index(), Some(2));
    }

    #[test]
    fn test_sync_with_appended_clip_activates_newest() {
        let mut scene = three();
        let mut clips = scene.clips().to_vec();
        clips.push(Clip::ready("d", "d.mp4"));
        scene.sync(clips);
        assert_eq!(scene.active_clip().map(|c| c.id.as_str()), Some("d"));
    }
}
