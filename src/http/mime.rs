//! MIME type detection module
//!
//! Maps a file extension to its Content-Type and tells video apart from
//! everything else, since only video gets range streaming.

use std::path::Path;

/// Content-Type used when the extension is unknown or missing
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content information derived from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub mime_type: &'static str,
    pub is_video: bool,
}

/// Get MIME Content-Type based on file extension (case-insensitive)
///
/// # Examples
/// ```
/// use display_server::http::mime::content_type;
/// assert_eq!(content_type(Some("html")), "text/html");
/// assert_eq!(content_type(Some("MP4")), "video/mp4");
/// assert_eq!(content_type(None), "application/octet-stream");
/// ```
pub fn content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" => "text/plain",
        "xml" => "application/xml",

        // Scripts and data
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "webmanifest" => "application/manifest+json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Video
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Documents
        "pdf" => "application/pdf",

        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Describe the file at `path` from its extension alone
pub fn describe(path: &Path) -> ContentDescriptor {
    let mime_type = content_type(path.extension().and_then(|e| e.to_str()));
    ContentDescriptor {
        mime_type,
        is_video: mime_type.starts_with("video/"),
    }
}
