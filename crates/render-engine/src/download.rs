//! Filesystem download sink.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clipline_common::error::{ClipError, ClipResult};

use crate::capture::{Blob, DownloadSink};
use crate::probe::local_source;

/// Writes downloads into a directory; object URLs are held in memory until
/// revoked.
#[derive(Debug)]
pub struct DirectoryDownloadSink {
    dir: PathBuf,
    objects: HashMap<String, Blob>,
    next_object: u64,
}

impl DirectoryDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            objects: HashMap::new(),
            next_object: 1,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Object URLs not yet revoked.
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    fn target(&self, file_name: &str) -> ClipResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(self.dir.join(file_name))
    }
}

impl DownloadSink for DirectoryDownloadSink {
    fn download_url(&mut self, url: &str, file_name: &str) -> ClipResult<PathBuf> {
        if url.contains("://") && !url.starts_with("file://") {
            return Err(ClipError::unsupported(format!("cannot fetch remote source {url}")));
        }
        let source = PathBuf::from(local_source(url));
        if !source.exists() {
            return Err(ClipError::FileNotFound { path: source });
        }
        let target = self.target(file_name)?;
        std::fs::copy(&source, &target)?;
        tracing::info!(source = %source.display(), target = %target.display(), "Downloaded original");
        Ok(target)
    }

    fn create_object_url(&mut self, blob: Blob) -> ClipResult<String> {
        let url = format!("blob:clipline/{}", self.next_object);
        self.next_object += 1;
        self.objects.insert(url.clone(), blob);
        Ok(url)
    }

    fn download(&mut self, object_url: &str, file_name: &str) -> ClipResult<PathBuf> {
        let blob = self
            .objects
            .get(object_url)
            .ok_or_else(|| ClipError::export(format!("unknown object URL {object_url}")))?;
        let target = self.target(file_name)?;
        std::fs::write(&target, &blob.data)?;
        tracing::info!(target = %target.display(), bytes = blob.len(), "Saved export");
        Ok(target)
    }

    fn revoke(&mut self, object_url: &str) {
        self.objects.remove(object_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clipline-dl-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_object_url_lifecycle() {
        let dir = temp_dir("objects");
        let mut sink = DirectoryDownloadSink::new(&dir);
        let url = sink
            .create_object_url(Blob::new(vec![1, 2, 3], "video/webm"))
            .unwrap();
        assert!(url.starts_with("blob:"));

        let path = sink.download(&url, "trimmed-clipA.webm").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(path, dir.join("trimmed-clipA.webm"));

        sink.revoke(&url);
        assert_eq!(sink.live_objects(), 0);
        assert!(sink.download(&url, "again.webm").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_download_url_copies_local_files() {
        let dir = temp_dir("direct");
        std::fs::create_dir_all(&dir).unwrap();
        let source = dir.join("source.mp4");
        std::fs::write(&source, b"mp4").unwrap();

        let mut sink = DirectoryDownloadSink::new(dir.join("out"));
        let url = format!("file://{}", source.display());
        let path = sink.download_url(&url, "scene-clipA.mp4").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"mp4");

        assert!(sink.download_url("https://cdn/x.mp4", "x.mp4").is_err());
        assert!(sink
            .download_url(&dir.join("missing.mp4").display().to_string(), "m.mp4")
            .is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
