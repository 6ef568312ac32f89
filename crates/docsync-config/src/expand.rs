//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use std::sync::LazyLock;

use regex::Regex;

use crate::ConfigError;

/// `${VAR}` references without a default.
static REQUIRED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    // Fast path: no expansion needed
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    for caps in REQUIRED_VAR.captures_iter(value) {
        let var = &caps[1];
        if std::env::var_os(var).is_none() {
            return Err(ConfigError::EnvVar {
                field: field.to_owned(),
                message: format!("${{{var}}} not set"),
            });
        }
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} is not valid UTF-8", e.cause.var_name),
    })
}

/// Error returned when environment variable lookup fails.
#[derive(Debug)]
struct LookupError {
    var_name: String,
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not valid UTF-8", self.var_name)
    }
}

impl std::error::Error for LookupError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_simple_var() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::set_var("DOCSYNC_TEST_SIMPLE", "hello");
        }
        let result = expand_env("${DOCSYNC_TEST_SIMPLE}", "test.field").unwrap();
        assert_eq!(result, "hello");
        unsafe {
            std::env::remove_var("DOCSYNC_TEST_SIMPLE");
        }
    }

    #[test]
    fn test_expand_with_default_uses_value() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::set_var("DOCSYNC_TEST_DEFAULT", "hello");
        }
        let result = expand_env("${DOCSYNC_TEST_DEFAULT:-world}", "test.field").unwrap();
        assert_eq!(result, "hello");
        unsafe {
            std::env::remove_var("DOCSYNC_TEST_DEFAULT");
        }
    }

    #[test]
    fn test_expand_with_default_uses_default() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::remove_var("DOCSYNC_TEST_UNSET");
        }
        let result = expand_env("${DOCSYNC_TEST_UNSET:-default}", "test.field").unwrap();
        assert_eq!(result, "default");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::remove_var("DOCSYNC_TEST_MISSING");
        }
        let err = expand_env("${DOCSYNC_TEST_MISSING}", "confluence.token").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("DOCSYNC_TEST_MISSING"));
        assert!(err.to_string().contains("confluence.token"));
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::set_var("DOCSYNC_TEST_HOST", "wiki.example.com");
        }
        let result = expand_env("https://${DOCSYNC_TEST_HOST}/", "test.url").unwrap();
        assert_eq!(result, "https://wiki.example.com/");
        unsafe {
            std::env::remove_var("DOCSYNC_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_literal_unchanged() {
        assert_eq!(expand_env("DOCS", "test.field").unwrap(), "DOCS");
        assert_eq!(expand_env("$VAR", "test.field").unwrap(), "$VAR");
    }
}
