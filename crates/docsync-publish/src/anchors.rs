//! Heading anchor translation.
//!
//! The Markdown renderer and Confluence derive heading anchors differently
//! from the same text. [`extract_heading_anchors`] maps one convention to the
//! other so link fragments can be translated.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Baseline anchor to Confluence anchor, for one page.
pub type AnchorMap = HashMap<String, String>;

/// Anchor maps for every page, keyed by source path.
pub type AnchorIndex = HashMap<String, AnchorMap>;

static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}#{1,6}\s+(.+)$").expect("valid regex"));

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Build the anchor map for one page from its raw Markdown.
///
/// Only ATX headings outside fenced code blocks are considered.
pub fn extract_heading_anchors(markdown: &str) -> AnchorMap {
    let mut anchors = AnchorMap::new();
    let mut fence: Option<&str> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if let Some(marker) = fence_marker(trimmed) {
            fence = Some(marker);
            continue;
        }

        let Some(caps) = ATX_HEADING.captures(line) else {
            continue;
        };
        let text = heading_text(&caps[1]);
        if text.is_empty() {
            continue;
        }

        let baseline = baseline_anchor(text);
        let target = target_anchor(text);
        tracing::debug!("Heading '{text}': '{baseline}' -> '{target}'");
        anchors.insert(baseline, target);
    }

    anchors
}

/// Anchor as produced by the Markdown renderer: `Grafana (visualizations)`
/// becomes `grafana-visualizations`.
pub fn baseline_anchor(text: &str) -> String {
    let lower = text.to_lowercase().replace(['(', ')'], "");
    let cleaned = NON_SLUG_CHARS.replace_all(&lower, "");
    let slug = SLUG_SEPARATORS.replace_all(&cleaned, "-");
    slug.trim_matches('-').to_owned()
}

/// Anchor as produced by Confluence: `Grafana (visualizations)` becomes
/// `Grafana-(visualizations)`.
pub fn target_anchor(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), "-").into_owned()
}

/// Opening fence marker (` ``` ` or `~~~`) of a fenced code block line.
pub(crate) fn fence_marker(trimmed: &str) -> Option<&'static str> {
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Heading text without surrounding whitespace or a closing `#` sequence.
fn heading_text(raw: &str) -> &str {
    let text = raw.trim();
    match text.trim_end_matches('#') {
        stripped if stripped.len() < text.len() && stripped.ends_with(char::is_whitespace) => {
            stripped.trim_end()
        }
        _ => text,
    }
}
