//! Output format negotiation and export file naming.

use crate::capture::CaptureBackend;

/// Container type used when nothing was negotiated.
pub const FALLBACK_MIME: &str = "video/webm";

/// First preferred type the backend supports, or `None` for its default.
pub fn negotiate_mime(preferences: &[String], backend: &dyn CaptureBackend) -> Option<String> {
    let chosen = preferences
        .iter()
        .find(|mime| backend.is_type_supported(mime))
        .cloned();
    match &chosen {
        Some(mime) => tracing::debug!(%mime, "Negotiated export format"),
        None => tracing::debug!("No preferred export format supported, using backend default"),
    }
    chosen
}

/// File extension for a container type.
pub fn extension_for(mime_type: &str) -> &'static str {
    if mime_type.contains("mp4") {
        "mp4"
    } else {
        "webm"
    }
}

/// Name of an untrimmed clip downloaded as-is.
pub fn direct_download_name(clip_id: &str) -> String {
    format!("scene-{clip_id}.mp4")
}

/// Name of a re-encoded trimmed clip.
pub fn trimmed_file_name(clip_id: &str, mime_type: &str) -> String {
    format!("trimmed-{clip_id}.{}", extension_for(mime_type))
}

/// Container portion of a MIME type (`video/mp4;codecs=...` → `video/mp4`).
pub fn container_of(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// Codec list of a MIME type, lowercased.
pub fn codecs_of(mime_type: &str) -> Vec<String> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().strip_prefix("codecs="))
        .flat_map(|list| list.trim_matches('"').split(','))
        .map(|codec| codec.trim().to_ascii_lowercase())
        .filter(|codec| !codec.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(direct_download_name("clipA"), "scene-clipA.mp4");
        assert_eq!(
            trimmed_file_name("clipA", "video/mp4;codecs=avc1,mp4a.40.2"),
            "trimmed-clipA.mp4"
        );
        assert_eq!(trimmed_file_name("clipA", FALLBACK_MIME), "trimmed-clipA.webm");
    }

    #[test]
    fn test_mime_parsing() {
        let mime = "video/webm;codecs=vp9,opus";
        assert_eq!(container_of(mime), "video/webm");
        assert_eq!(codecs_of(mime), vec!["vp9", "opus"]);
        assert!(codecs_of("video/mp4").is_empty());
    }
}
