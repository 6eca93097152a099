//! MIME type detection from body bytes or file extensions.

use std::path::Path;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const TEXT_CSS: &str = "text/css; charset=utf-8";
pub const APPLICATION_JAVASCRIPT: &str = "application/javascript; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
pub const IMAGE_PNG: &str = "image/png";
pub const IMAGE_JPEG: &str = "image/jpeg";
pub const IMAGE_GIF: &str = "image/gif";

/// Guesses a content type from the leading bytes of a body.
///
/// Empty bodies are reported as plain text, unrecognized ones as
/// `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return TEXT_PLAIN;
    }

    let trimmed = data.trim_ascii();

    if trimmed.starts_with(b"{") || trimmed.starts_with(b"[") {
        return APPLICATION_JSON;
    }

    if trimmed.starts_with(b"<!DOCTYPE html") || trimmed.starts_with(b"<html") {
        return TEXT_HTML;
    }

    if data.len() > 4 {
        if data[0] == 0x89 && data[1..].starts_with(b"PNG") {
            return IMAGE_PNG;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return IMAGE_JPEG;
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return IMAGE_GIF;
        }
    }

    APPLICATION_OCTET_STREAM
}

/// Maps a file path to a content type by its extension.
pub fn from_extension(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => TEXT_HTML,
        Some("css") => TEXT_CSS,
        Some("js") => APPLICATION_JAVASCRIPT,
        Some("json") => APPLICATION_JSON,
        Some("xml") => APPLICATION_XML,
        Some("txt") => TEXT_PLAIN,
        Some("jpg") | Some("jpeg") => IMAGE_JPEG,
        Some("png") => IMAGE_PNG,
        Some("gif") => IMAGE_GIF,
        _ => APPLICATION_OCTET_STREAM,
    }
}
