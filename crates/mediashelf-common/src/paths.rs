//! Path utilities for detecting video files by extension.

use std::path::Path;

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "m2ts", "webm", "mov", "wmv", "flv", "mpeg", "mpg",
];

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mediashelf_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/video.mp4")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}
