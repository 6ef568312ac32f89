//! Classification of link and image destinations.

use percent_encoding::percent_decode_str;

/// Whether a destination points outside the document tree: a URL scheme
/// (`https:`, `data:`, `mailto:`, ...) or a protocol-relative `//host`.
pub fn is_remote_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Attachment name for a local image: the percent-decoded last path segment.
pub fn attachment_filename(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let name = path.rsplit('/').next().unwrap_or(path);
    percent_decode_str(name).decode_utf8_lossy().into_owned()
}
