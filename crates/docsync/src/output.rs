//! Run summaries on stderr.

use console::{Style, Term};

/// Width of [`Output::separator`] lines.
const SEPARATOR_WIDTH: usize = 60;

/// Styled line writer for user-facing progress and results.
///
/// Everything goes to stderr so `render` can keep stdout for markup.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg, None);
    }

    /// Created or updated pages.
    pub(crate) fn success(&self, msg: &str) {
        self.line(msg, Some(Style::new().green()));
    }

    /// Unresolved references and partial failures.
    pub(crate) fn warning(&self, msg: &str) {
        self.line(msg, Some(Style::new().yellow()));
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(msg, Some(Style::new().red().bold()));
    }

    /// Mode banners such as dry runs.
    pub(crate) fn highlight(&self, msg: &str) {
        self.line(msg, Some(Style::new().cyan().bold()));
    }

    /// Reused pages, attachments and other secondary lines.
    pub(crate) fn detail(&self, msg: &str) {
        self.line(msg, Some(Style::new().dim()));
    }

    pub(crate) fn separator(&self) {
        self.line(&"-".repeat(SEPARATOR_WIDTH), Some(Style::new().dim()));
    }

    fn line(&self, msg: &str, style: Option<Style>) {
        let text = match style {
            Some(style) => style.apply_to(msg).to_string(),
            None => msg.to_owned(),
        };
        // Best effort
        let _ = self.term.write_line(&text);
    }
}
