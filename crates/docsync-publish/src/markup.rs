//! Helpers for passes over rendered storage markup.

use std::sync::LazyLock;

use regex::Regex;

/// One CDATA section. A `]]>` inside code is split across two sections by the
/// renderer, so each section ends at its first `]]>`.
static CDATA_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[.*?\]\]>").expect("valid regex"));

/// Apply `f` to every part of `content` outside CDATA sections.
///
/// CDATA sections are copied through unchanged.
pub(crate) fn map_outside_cdata(content: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut output = String::with_capacity(content.len());
    let mut last = 0;
    for section in CDATA_SECTION.find_iter(content) {
        output.push_str(&f(&content[last..section.start()]));
        output.push_str(section.as_str());
        last = section.end();
    }
    output.push_str(&f(&content[last..]));
    output
}
