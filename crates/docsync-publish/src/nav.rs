//! Navigation tree and its loaders.
//!
//! The tree is either read from the `nav:` key of an `MkDocs` configuration
//! or derived by walking the docs directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docsync_renderer::is_remote_url;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::links::resolve_relative;

static H1_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex"));

/// Node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavNode {
    /// Groups child nodes; carries no document of its own.
    Section {
        /// Section title.
        title: String,
        /// Ordered children.
        children: Vec<NavNode>,
    },
    /// One Markdown document.
    Leaf(NavPage),
}

impl NavNode {
    /// Node title before prefix and suffix are applied.
    pub fn title(&self) -> &str {
        match self {
            Self::Section { title, .. } => title,
            Self::Leaf(page) => &page.title,
        }
    }
}

/// Markdown document referenced from the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPage {
    /// Page title.
    pub title: String,
    /// Path relative to the docs directory with `/` separators (e.g. `guide/setup.md`).
    pub src_path: String,
    /// Absolute path of the Markdown file.
    pub abs_src_path: PathBuf,
}

/// Navigation loading error.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// File or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// `MkDocs` configuration is not valid YAML.
    #[error("failed to parse {}: {source}", path.display())]
    Yaml {
        /// Configuration path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// `MkDocs` configuration has no `nav:` key.
    #[error("{} has no nav entry", .0.display())]
    MissingNav(PathBuf),

    /// Nav entry is neither a page path nor a titled entry.
    #[error("invalid nav entry: {0}")]
    InvalidEntry(String),

    /// Docs directory does not exist.
    #[error("docs directory not found: {}", .0.display())]
    DocsDirNotFound(PathBuf),
}

/// Collect every page of the tree in pre-order.
pub fn leaves(nodes: &[NavNode]) -> Vec<&NavPage> {
    let mut pages = Vec::new();
    collect_leaves(nodes, &mut pages);
    pages
}

fn collect_leaves<'a>(nodes: &'a [NavNode], pages: &mut Vec<&'a NavPage>) {
    for node in nodes {
        match node {
            NavNode::Section { children, .. } => collect_leaves(children, pages),
            NavNode::Leaf(page) => pages.push(page),
        }
    }
}

/// Load the navigation tree from the `nav:` key of an `MkDocs` configuration.
///
/// Entries may be a bare page path, `{title: path}` or `{title: [entries]}`.
/// External URLs and pages whose file does not exist are skipped with a warning.
pub fn load_mkdocs_nav(mkdocs_yml: &Path, docs_dir: &Path) -> Result<Vec<NavNode>, NavError> {
    let content = fs::read_to_string(mkdocs_yml).map_err(|source| NavError::Io {
        path: mkdocs_yml.to_path_buf(),
        source,
    })?;
    let root: Value = serde_yaml::from_str(&content).map_err(|source| NavError::Yaml {
        path: mkdocs_yml.to_path_buf(),
        source,
    })?;

    let Some(Value::Sequence(entries)) = root.get("nav") else {
        return Err(NavError::MissingNav(mkdocs_yml.to_path_buf()));
    };

    parse_entries(entries, docs_dir)
}

fn parse_entries(entries: &[Value], docs_dir: &Path) -> Result<Vec<NavNode>, NavError> {
    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(node) = parse_entry(entry, docs_dir)? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

fn parse_entry(entry: &Value, docs_dir: &Path) -> Result<Option<NavNode>, NavError> {
    match entry {
        Value::String(path) => Ok(nav_page(None, path, docs_dir).map(NavNode::Leaf)),
        Value::Mapping(mapping) => parse_titled_entry(mapping, docs_dir),
        other => Err(NavError::InvalidEntry(format!("{other:?}"))),
    }
}

fn parse_titled_entry(mapping: &Mapping, docs_dir: &Path) -> Result<Option<NavNode>, NavError> {
    let mut iter = mapping.iter();
    let (Some((Value::String(title), value)), None) = (iter.next(), iter.next()) else {
        return Err(NavError::InvalidEntry(format!("{mapping:?}")));
    };

    match value {
        Value::String(path) => {
            Ok(nav_page(Some(title.as_str()), path, docs_dir).map(NavNode::Leaf))
        }
        Value::Sequence(children) => {
            let children = parse_entries(children, docs_dir)?;
            if children.is_empty() {
                tracing::debug!("Skipping empty nav section '{title}'");
                return Ok(None);
            }
            Ok(Some(NavNode::Section {
                title: title.clone(),
                children,
            }))
        }
        other => Err(NavError::InvalidEntry(format!("{title}: {other:?}"))),
    }
}

fn nav_page(title: Option<&str>, path: &str, docs_dir: &Path) -> Option<NavPage> {
    if is_remote_url(path) {
        tracing::debug!("Skipping external nav link {path}");
        return None;
    }
    let Some(src_path) = resolve_relative("", path) else {
        tracing::warn!("Nav entry {path} points outside the docs directory");
        return None;
    };
    let abs_src_path = docs_dir.join(&src_path);
    if !abs_src_path.is_file() {
        tracing::warn!("Nav entry {path} not found at {}", abs_src_path.display());
        return None;
    }

    let title = title.map_or_else(|| page_title(&abs_src_path, &src_path), str::to_owned);
    Some(NavPage {
        title,
        src_path,
        abs_src_path,
    })
}

/// Build the navigation tree by walking the docs directory.
///
/// Hidden entries are skipped. Within a directory, `index.md` comes first,
/// then other Markdown files, then subdirectories as sections, each sorted by
/// name. Directories without Markdown files are skipped.
pub fn scan_docs_dir(docs_dir: &Path) -> Result<Vec<NavNode>, NavError> {
    if !docs_dir.is_dir() {
        return Err(NavError::DocsDirNotFound(docs_dir.to_path_buf()));
    }
    scan_directory(docs_dir, "")
}

fn scan_directory(dir: &Path, prefix: &str) -> Result<Vec<NavNode>, NavError> {
    let io_err = |source| NavError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        if is_dir {
            dirs.push((name, entry.path()));
        } else if Path::new(&name).extension().is_some_and(|e| e == "md") {
            files.push((name, entry.path()));
        }
    }
    files.sort_by(|(a, _), (b, _)| (a != "index.md", a).cmp(&(b != "index.md", b)));
    dirs.sort();

    let join = |name: &str| {
        if prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{prefix}/{name}")
        }
    };

    let mut nodes = Vec::with_capacity(files.len() + dirs.len());
    for (name, path) in files {
        let src_path = join(&name);
        nodes.push(NavNode::Leaf(NavPage {
            title: page_title(&path, &src_path),
            src_path,
            abs_src_path: path,
        }));
    }
    for (name, path) in dirs {
        let children = scan_directory(&path, &join(&name))?;
        if children.is_empty() {
            continue;
        }
        nodes.push(NavNode::Section {
            title: format_title(&name),
            children,
        });
    }

    Ok(nodes)
}

/// Title of a page: its first `# ` heading, else the formatted file stem.
fn page_title(abs_src_path: &Path, src_path: &str) -> String {
    if let Ok(content) = fs::read_to_string(abs_src_path)
        && let Some(caps) = H1_HEADING.captures(&content)
    {
        return caps[1].trim().to_owned();
    }
    let stem = Path::new(src_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format_title(&stem)
}

/// Format a file or directory name as a title: `getting-started` becomes `Getting started`.
fn format_title(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn leaf_paths(nodes: &[NavNode]) -> Vec<&str> {
        leaves(nodes).iter().map(|p| p.src_path.as_str()).collect()
    }

    #[test]
    fn test_format_title() {
        assert_eq!(format_title("getting-started"), "Getting started");
        assert_eq!(format_title("api_reference"), "Api reference");
        assert_eq!(format_title("FAQ"), "FAQ");
        assert_eq!(format_title(""), "");
    }

    #[test]
    fn test_page_title_from_heading_or_stem() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "intro\n\n# Real Title #\n\n## Sub\n");
        write(tmp.path(), "setup-guide.md", "no heading here\n");

        assert_eq!(page_title(&tmp.path().join("a.md"), "a.md"), "Real Title");
        assert_eq!(
            page_title(&tmp.path().join("setup-guide.md"), "setup-guide.md"),
            "Setup guide"
        );
    }

    #[test]
    fn test_scan_docs_dir_ordering() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path();
        write(docs, "zeta.md", "# Zeta\n");
        write(docs, "alpha.md", "# Alpha\n");
        write(docs, "index.md", "# Home\n");
        write(docs, "guide/index.md", "# Guide\n");
        write(docs, "guide/install.md", "# Install\n");
        write(docs, "guide/deep/more.md", "# More\n");
        write(docs, ".hidden/secret.md", "# Secret\n");
        write(docs, "assets/logo.png", "png");
        write(docs, "notes.txt", "text");

        let nodes = scan_docs_dir(docs).unwrap();

        assert_eq!(
            leaf_paths(&nodes),
            vec![
                "index.md",
                "alpha.md",
                "zeta.md",
                "guide/index.md",
                "guide/install.md",
                "guide/deep/more.md",
            ]
        );
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].title(), "Home");
        let NavNode::Section { title, children } = &nodes[3] else {
            panic!("expected section");
        };
        assert_eq!(title, "Guide");
        assert_eq!(children.len(), 3);
        assert_eq!(children[2].title(), "Deep");
    }

    #[test]
    fn test_scan_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let err = scan_docs_dir(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, NavError::DocsDirNotFound(_)));
    }

    #[test]
    fn test_load_mkdocs_nav() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        write(&docs, "index.md", "# Welcome\n");
        write(&docs, "guide/setup.md", "# Setup\n");
        write(&docs, "guide/usage.md", "# Usage\n");
        let mkdocs = tmp.path().join("mkdocs.yml");
        fs::write(
            &mkdocs,
            r"
site_name: Example
theme:
  name: material
nav:
  - index.md
  - User Guide:
      - Getting Set Up: guide/setup.md
      - guide/usage.md
      - Missing: guide/missing.md
  - GitHub: https://github.com/example/repo
  - Empty: []
",
        )
        .unwrap();

        let nodes = load_mkdocs_nav(&mkdocs, &docs).unwrap();

        assert_eq!(nodes.len(), 2);
        let NavNode::Leaf(home) = &nodes[0] else {
            panic!("expected leaf");
        };
        assert_eq!(home.title, "Welcome");
        assert_eq!(home.src_path, "index.md");
        assert_eq!(home.abs_src_path, docs.join("index.md"));

        let NavNode::Section { title, children } = &nodes[1] else {
            panic!("expected section");
        };
        assert_eq!(title, "User Guide");
        assert_eq!(
            children.iter().map(NavNode::title).collect::<Vec<_>>(),
            vec!["Getting Set Up", "Usage"]
        );
        assert_eq!(leaf_paths(&nodes), vec!["index.md", "guide/setup.md", "guide/usage.md"]);
    }

    #[test]
    fn test_load_mkdocs_without_nav() {
        let tmp = TempDir::new().unwrap();
        let mkdocs = tmp.path().join("mkdocs.yml");
        fs::write(&mkdocs, "site_name: Example\n").unwrap();

        let err = load_mkdocs_nav(&mkdocs, tmp.path()).unwrap_err();
        assert!(matches!(err, NavError::MissingNav(_)));
    }

    #[test]
    fn test_load_mkdocs_invalid_entry() {
        let tmp = TempDir::new().unwrap();
        let mkdocs = tmp.path().join("mkdocs.yml");
        fs::write(&mkdocs, "nav:\n  - 42\n").unwrap();

        let err = load_mkdocs_nav(&mkdocs, tmp.path()).unwrap_err();
        assert!(matches!(err, NavError::InvalidEntry(_)));
    }
}
