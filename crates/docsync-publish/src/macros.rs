//! Code macro language compatibility.

/// Code block languages Confluence rejects, with the replacement used instead.
pub const MACRO_REPLACEMENTS: &[(&str, &str)] = &[("json", "yaml")];

/// Rewrite unsupported code macro language parameters.
///
/// Matches the exact parameter element emitted by the renderer, so other
/// occurrences of the language name are left alone.
pub fn replace_incompatible_macros(content: &str) -> String {
    let mut content = content.to_owned();
    for (incompatible, compatible) in MACRO_REPLACEMENTS {
        let pattern = language_parameter(incompatible);
        if content.contains(&pattern) {
            content = content.replace(&pattern, &language_parameter(compatible));
            tracing::debug!("Replaced code macro language {incompatible} with {compatible}");
        }
    }
    content
}

fn language_parameter(language: &str) -> String {
    format!(r#"<ac:parameter ac:name="language">{language}</ac:parameter>"#)
}
