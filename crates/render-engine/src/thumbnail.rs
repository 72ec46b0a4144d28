//! Filmstrip thumbnails grabbed with ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Command;

use clipline_common::error::{ClipError, ClipResult};
use clipline_scene_model::ClipId;
use clipline_timeline::{MediaElement, SceneEditor};

use crate::probe::local_source;

/// Writes one JPEG per clip into a cache directory.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    cache_dir: PathBuf,
    width: u32,
}

impl ThumbnailGenerator {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            width: 320,
        }
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width.max(16);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn path_for(&self, id: &ClipId) -> PathBuf {
        self.cache_dir.join(format!("thumb-{id}.jpg"))
    }

    /// Grab the frame at the middle of the clip. Returns the image path.
    pub fn generate(&self, id: &ClipId, source_url: &str, duration: f64) -> ClipResult<PathBuf> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let target = self.path_for(id);
        let at = if duration.is_finite() && duration > 0.0 {
            duration / 2.0
        } else {
            0.0
        };

        let output = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-ss"])
            .arg(format!("{at:.3}"))
            .arg("-i")
            .arg(local_source(source_url))
            .args(["-frames:v", "1", "-vf"])
            .arg(format!("scale={}:-2", self.width))
            .args(["-q:v", "4"])
            .arg(&target)
            .output()
            .map_err(|e| ClipError::capture(format!("Failed to start ffmpeg: {e}")))?;

        if !output.status.success() || !target.exists() {
            return Err(ClipError::capture(format!(
                "thumbnail for {id} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(target)
    }

    /// Serve every pending thumbnail request of `editor`.
    ///
    /// Returns how many thumbnails resolved. Failures return the clip to the
    /// uncached state so a later pass can retry.
    pub fn fill<M: MediaElement>(&self, editor: &mut SceneEditor<M>) -> usize {
        let mut resolved = 0;
        for (id, url) in editor.pending_thumbnail_requests() {
            let duration = editor.duration_of(&id);
            match self.generate(&id, &url, duration) {
                Ok(path) => {
                    editor.thumbnail_ready(&id, path.to_string_lossy());
                    resolved += 1;
                }
                Err(e) => {
                    tracing::debug!(clip_id = %id, error = %e, "Thumbnail unavailable");
                    editor.thumbnail_failed(&id);
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_path_is_per_clip() {
        let generator = ThumbnailGenerator::new("/tmp/cache");
        assert_eq!(
            generator.path_for(&ClipId::new("clipA")),
            PathBuf::from("/tmp/cache/thumb-clipA.jpg")
        );
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = std::env::temp_dir().join(format!("clipline-thumb-{}", std::process::id()));
        let generator = ThumbnailGenerator::new(&dir);
        let result = generator.generate(&ClipId::new("x"), "/nonexistent/clip.mp4", 4.0);
        assert!(result.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
