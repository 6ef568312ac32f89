//! Indented table normalization.
//!
//! Tables nested in list items or blockquotes keep their indentation in the
//! raw Markdown, which the renderer then reads as nested content. Table runs
//! are dedented before rendering.

use std::sync::LazyLock;

use regex::Regex;

use crate::anchors::fence_marker;

static SEPARATOR_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|[-:|\s]+\|$").expect("valid regex"));

/// Strip leading whitespace from every line of each table run.
///
/// A run is a block of contiguous lines framed with `|` on both ends that
/// contains a separator row. It ends at a blank or non-table line. Lines
/// outside runs and lines inside fenced code blocks are left untouched.
pub fn normalize_indented_tables(markdown: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in markdown.split('\n') {
        let trimmed = line.trim();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            output.push(line);
            continue;
        }

        if is_table_line(trimmed) {
            run.push(line);
            continue;
        }

        flush_run(&mut run, &mut output);
        if let Some(marker) = fence_marker(trimmed) {
            fence = Some(marker);
        }
        output.push(line);
    }
    flush_run(&mut run, &mut output);

    output.join("\n")
}

fn is_table_line(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Move a pending run to the output, dedented when it is a table.
fn flush_run<'a>(run: &mut Vec<&'a str>, output: &mut Vec<&'a str>) {
    let is_table = run.iter().any(|line| SEPARATOR_ROW.is_match(line.trim()));
    if is_table {
        output.extend(run.drain(..).map(str::trim_start));
    } else {
        output.append(run);
    }
}
