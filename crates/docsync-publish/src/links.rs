//! Link rewriting from relative Markdown links to Confluence page links.
//!
//! Operates on rendered storage markup. Every `<a href>` pointing at another
//! `.md` file in the docs tree is resolved against the current page's source
//! directory and, when that page was synchronized, replaced by an `ac:link`
//! to its title. Fragments are translated through the target page's
//! [`AnchorMap`](crate::AnchorMap).

use std::sync::LazyLock;

use docsync_renderer::{escape_html, is_remote_url};
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};

use crate::anchors::AnchorIndex;
use crate::markup::map_outside_cdata;
use crate::sync::PageIdentityMap;

static ANCHOR_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).expect("valid regex")
});

/// Rewrites intra-site links using the page identity map and anchor index.
pub struct LinkResolver<'a> {
    pages: &'a PageIdentityMap,
    anchors: &'a AnchorIndex,
}

impl<'a> LinkResolver<'a> {
    /// Create a resolver over a complete map and anchor index.
    pub fn new(pages: &'a PageIdentityMap, anchors: &'a AnchorIndex) -> Self {
        Self { pages, anchors }
    }

    /// Rewrite links in `content` rendered from the page at `src_path`.
    ///
    /// Links to unmapped pages are left untouched and reported in `warnings`.
    /// Code block bodies (CDATA sections) are never rewritten.
    pub fn rewrite(&self, content: &str, src_path: &str, warnings: &mut Vec<String>) -> String {
        map_outside_cdata(content, |markup| {
            ANCHOR_ELEMENT
                .replace_all(markup, |caps: &Captures<'_>| {
                    let href = unescape_attr(&caps[1]);
                    self.rewrite_link(&href, &caps[2], src_path, warnings)
                        .unwrap_or_else(|| caps[0].to_owned())
                })
                .into_owned()
        })
    }

    fn rewrite_link(
        &self,
        href: &str,
        text: &str,
        src_path: &str,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        if is_remote_url(href) {
            return None;
        }

        let (page_path, fragment) = match href.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment).filter(|f| !f.is_empty())),
            None => (href, None),
        };

        if page_path.is_empty() {
            let fragment = fragment?;
            let anchor = self.translate_anchor(src_path, fragment);
            return Some(format!(
                r#"<ac:link ac:anchor="{}"><ac:link-body>{text}</ac:link-body></ac:link>"#,
                escape_html(&anchor)
            ));
        }

        let decoded = percent_decode_str(page_path).decode_utf8_lossy();
        if !decoded.ends_with(".md") {
            return None;
        }

        let resolved = resolve_relative(src_path, &decoded);
        let Some(target) = resolved.as_ref().and_then(|path| self.pages.get(path)) else {
            let message = format!(
                "Could not find Confluence page for link {href} (resolved to {}) in {src_path}",
                resolved.as_deref().unwrap_or("<outside docs>")
            );
            tracing::warn!("{message}");
            warnings.push(message);
            return None;
        };
        let resolved = resolved.unwrap_or_default();

        let anchor_attr = fragment
            .map(|fragment| {
                let anchor = self.translate_anchor(&resolved, fragment);
                tracing::debug!("Translated anchor '{fragment}' to '{anchor}' for {resolved}");
                format!(r#" ac:anchor="{}""#, escape_html(&anchor))
            })
            .unwrap_or_default();

        tracing::debug!("Rewrote link {href} to page '{}'", target.title);
        Some(format!(
            r#"<ac:link{anchor_attr}><ri:page ri:content-title="{}" /><ac:link-body>{text}</ac:link-body></ac:link>"#,
            escape_html(&target.title)
        ))
    }

    /// Translate a fragment through the anchor map of `src_path`, falling back to the raw fragment.
    fn translate_anchor(&self, src_path: &str, fragment: &str) -> String {
        let fragment = percent_decode_str(fragment).decode_utf8_lossy();
        self.anchors
            .get(src_path)
            .and_then(|anchors| anchors.get(fragment.as_ref()))
            .cloned()
            .unwrap_or_else(|| fragment.into_owned())
    }
}

/// Resolve `target` against the directory of `src_path`, normalizing `.` and
/// `..` segments with `/` separators.
///
/// Returns `None` when the result would leave the docs root.
pub(crate) fn resolve_relative(src_path: &str, target: &str) -> Option<String> {
    let target = target.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    if !target.starts_with('/')
        && let Some((dir, _)) = src_path.rsplit_once('/')
    {
        segments.extend(dir.split('/'));
    }

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    Some(segments.join("/"))
}

/// Undo the attribute escaping applied by the renderer.
fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
