//! Configuration management for docsync.
//!
//! Parses `docsync.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `confluence.base_url`
//! - `confluence.space`
//! - `confluence.parent_id`
//! - `confluence.token`
//! - `confluence.username`
//! - `diagrams.kroki_url`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub source_dir: Option<PathBuf>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override target space key.
    pub space: Option<String>,
    /// Override root parent page id.
    pub parent_id: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docsync.toml";

/// Default diagram request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Diagram rendering configuration (paths are relative strings from TOML).
    diagrams: DiagramsConfigRaw,
    /// Confluence configuration.
    pub confluence: Option<ConfluenceConfig>,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    nav_file: Option<String>,
}

/// Resolved documentation configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Source directory for markdown files.
    pub source_dir: PathBuf,
    /// `MkDocs` configuration holding the `nav:` tree. The source directory
    /// is walked when absent.
    pub nav_file: Option<PathBuf>,
}

/// Raw diagrams configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    kroki_url: Option<String>,
    cache_dir: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved diagram rendering configuration with absolute paths.
#[derive(Debug)]
pub struct DiagramsConfig {
    /// Kroki server URL. Diagrams stay code blocks when unset.
    pub kroki_url: Option<String>,
    /// Directory holding rendered diagram images.
    pub cache_dir: PathBuf,
    /// HTTP timeout for Kroki requests in seconds.
    pub timeout_secs: u64,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            kroki_url: None,
            cache_dir: PathBuf::from(".docsync/diagrams"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Confluence configuration.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence server base URL.
    pub base_url: String,
    /// Target space key.
    pub space: String,
    /// Page id under which top-level navigation nodes are created.
    pub parent_id: String,
    /// API token (bearer token, or password when `username` is set).
    pub token: String,
    /// Username for basic authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Text prepended to every page title.
    #[serde(default)]
    pub page_prefix: String,
    /// Text appended to every page title.
    #[serde(default)]
    pub page_suffix: String,
}

impl ConfluenceConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "confluence.base_url")?;
        require_http_url(&self.base_url, "confluence.base_url")?;
        require_non_empty(&self.space, "confluence.space")?;
        require_non_empty(&self.parent_id, "confluence.parent_id")?;
        require_non_empty(&self.token, "confluence.token")?;
        if let Some(username) = &self.username {
            require_non_empty(username, "confluence.username")?;
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.token`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `docsync.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url = Some(kroki_url.clone());
        }
        if let Some(confluence) = self.confluence.as_mut() {
            if let Some(space) = &settings.space {
                confluence.space.clone_from(space);
            }
            if let Some(parent_id) = &settings.parent_id {
                confluence.parent_id.clone_from(parent_id);
            }
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// Returns the Confluence config if the `[confluence]` section is present
    /// and all fields are valid. Use this instead of accessing the `confluence`
    /// field directly when the command requires Confluence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let conf = self.confluence.as_ref().ok_or_else(|| {
            ConfigError::Validation("[confluence] section required in config".into())
        })?;
        conf.validate()?;
        Ok(conf)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file. The `[confluence]`
    /// section is validated separately by [`Config::require_confluence`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref kroki_url) = self.diagrams_resolved.kroki_url {
            require_non_empty(kroki_url, "diagrams.kroki_url")?;
            require_http_url(kroki_url, "diagrams.kroki_url")?;
        }
        if self.diagrams_resolved.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            diagrams: DiagramsConfigRaw::default(),
            confluence: None,
            docs_resolved: DocsConfig {
                source_dir: base.join("docs"),
                nav_file: None,
            },
            diagrams_resolved: DiagramsConfig {
                cache_dir: base.join(".docsync/diagrams"),
                ..DiagramsConfig::default()
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.diagrams.kroki_url {
            self.diagrams.kroki_url = Some(expand::expand_env(url, "diagrams.kroki_url")?);
        }

        if let Some(ref mut confluence) = self.confluence {
            confluence.base_url = expand::expand_env(&confluence.base_url, "confluence.base_url")?;
            confluence.space = expand::expand_env(&confluence.space, "confluence.space")?;
            confluence.parent_id =
                expand::expand_env(&confluence.parent_id, "confluence.parent_id")?;
            confluence.token = expand::expand_env(&confluence.token, "confluence.token")?;
            if let Some(ref username) = confluence.username {
                confluence.username = Some(expand::expand_env(username, "confluence.username")?);
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "docs"),
            nav_file: self.docs.nav_file.as_deref().map(|p| config_dir.join(p)),
        };

        self.diagrams_resolved = DiagramsConfig {
            kroki_url: self.diagrams.kroki_url.clone(),
            cache_dir: resolve(self.diagrams.cache_dir.as_deref(), ".docsync/diagrams"),
            timeout_secs: self.diagrams.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
[docs]
source_dir = "documentation"
nav_file = "mkdocs.yml"

[confluence]
base_url = "https://wiki.example.com"
space = "DOCS"
parent_id = "12345"
token = "secret"
page_prefix = "[Docs] "

[diagrams]
kroki_url = "https://kroki.io"
cache_dir = "build/diagrams"
timeout_secs = 10
"#;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/test/docs"));
        assert_eq!(config.docs_resolved.nav_file, None);
        assert_eq!(
            config.diagrams_resolved.cache_dir,
            PathBuf::from("/test/.docsync/diagrams")
        );
        assert_eq!(config.diagrams_resolved.kroki_url, None);
        assert_eq!(config.diagrams_resolved.timeout_secs, 30);
        assert!(config.confluence.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.confluence.is_none());
        assert!(config.docs.source_dir.is_none());
    }

    #[test]
    fn test_parse_confluence_config() {
        let config: Config = toml::from_str(FULL_CONFIG).unwrap();
        let confluence = config.confluence.unwrap();
        assert_eq!(confluence.base_url, "https://wiki.example.com");
        assert_eq!(confluence.space, "DOCS");
        assert_eq!(confluence.parent_id, "12345");
        assert_eq!(confluence.token, "secret");
        assert_eq!(confluence.username, None);
        assert_eq!(confluence.page_prefix, "[Docs] ");
        assert_eq!(confluence.page_suffix, "");
    }

    #[test]
    fn test_resolve_paths() {
        let mut config: Config = toml::from_str(FULL_CONFIG).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/project/documentation")
        );
        assert_eq!(
            config.docs_resolved.nav_file,
            Some(PathBuf::from("/project/mkdocs.yml"))
        );
        assert_eq!(
            config.diagrams_resolved.cache_dir,
            PathBuf::from("/project/build/diagrams")
        );
        assert_eq!(
            config.diagrams_resolved.kroki_url.as_deref(),
            Some("https://kroki.io")
        );
        assert_eq!(config.diagrams_resolved.timeout_secs, 10);
    }

    #[test]
    fn test_load_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), FULL_CONFIG);

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.config_path, Some(path));
        assert_eq!(
            config.docs_resolved.source_dir,
            tmp.path().join("documentation")
        );
        assert_eq!(config.require_confluence().unwrap().space, "DOCS");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("nope.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "[docs\nsource_dir = ");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_cli_settings_override() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), FULL_CONFIG);
        let settings = CliSettings {
            source_dir: Some(PathBuf::from("/elsewhere/docs")),
            kroki_url: Some("http://localhost:8000".to_owned()),
            space: Some("TEAM".to_owned()),
            parent_id: Some("999".to_owned()),
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/elsewhere/docs")
        );
        assert_eq!(
            config.diagrams_resolved.kroki_url.as_deref(),
            Some("http://localhost:8000")
        );
        let confluence = config.require_confluence().unwrap();
        assert_eq!(confluence.space, "TEAM");
        assert_eq!(confluence.parent_id, "999");
    }

    #[test]
    fn test_cli_kroki_url_validated() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "");
        let settings = CliSettings {
            kroki_url: Some("kroki.io".to_owned()),
            ..CliSettings::default()
        };

        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(err.to_string().contains("diagrams.kroki_url"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "[diagrams]\ntimeout_secs = 0\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_require_confluence_missing_section() {
        let config = Config::default_with_base(Path::new("/test"));
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("[confluence]"));
    }

    #[test]
    fn test_require_confluence_validates_fields() {
        let config: Config = toml::from_str(
            r#"
[confluence]
base_url = "wiki.example.com"
space = "DOCS"
parent_id = "1"
token = "t"
"#,
        )
        .unwrap();
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("confluence.base_url"));

        let config: Config = toml::from_str(
            r#"
[confluence]
base_url = "https://wiki.example.com"
space = "  "
parent_id = "1"
token = "t"
"#,
        )
        .unwrap();
        let err = config.require_confluence().unwrap_err();
        assert!(err.to_string().contains("confluence.space"));
    }

    #[test]
    fn test_env_expansion_in_confluence_fields() {
        // SAFETY: variable names are unique to this test
        unsafe {
            std::env::set_var("DOCSYNC_CFG_TOKEN", "from-env");
            std::env::set_var("DOCSYNC_CFG_USER", "bot");
        }
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[confluence]
base_url = "${DOCSYNC_CFG_URL:-https://wiki.example.com}"
space = "DOCS"
parent_id = "1"
token = "${DOCSYNC_CFG_TOKEN}"
username = "${DOCSYNC_CFG_USER}"
"#,
        );

        let config = Config::load(Some(&path), None).unwrap();
        let confluence = config.require_confluence().unwrap();
        assert_eq!(confluence.base_url, "https://wiki.example.com");
        assert_eq!(confluence.token, "from-env");
        assert_eq!(confluence.username.as_deref(), Some("bot"));

        unsafe {
            std::env::remove_var("DOCSYNC_CFG_TOKEN");
            std::env::remove_var("DOCSYNC_CFG_USER");
        }
    }

    #[test]
    fn test_env_expansion_missing_var() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[confluence]
base_url = "https://wiki.example.com"
space = "DOCS"
parent_id = "1"
token = "${DOCSYNC_CFG_DEFINITELY_UNSET}"
"#,
        );

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "confluence.token"));
    }
}
