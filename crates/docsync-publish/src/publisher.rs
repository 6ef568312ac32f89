//! End-to-end publishing of a navigation tree.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use docsync_confluence::{PageIdentity, WikiClient};
use docsync_diagrams::DiagramRasterizer;
use docsync_renderer::MarkupRenderer;
use rayon::prelude::*;

use crate::anchors::{AnchorIndex, extract_heading_anchors};
use crate::nav::{NavNode, NavPage, leaves};
use crate::sync::{PageHierarchySynchronizer, PageNaming, SyncReport};
use crate::transform::{ContentTransformer, TransformedPage};

/// Target and behavior of a publish run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Space key.
    pub space: String,
    /// Page under which the tree is mirrored.
    pub parent_id: String,
    /// Title decoration.
    pub naming: PageNaming,
    /// Transform pages without updating them.
    pub dry_run: bool,
}

/// Final state of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    /// Body updated and attachments uploaded.
    Updated,
    /// Transformed only.
    DryRun,
    /// Not updated.
    Failed {
        /// Error that stopped the page.
        reason: String,
    },
}

/// Per-page result of a publish run.
#[derive(Debug, Clone)]
pub struct PageReport {
    /// Source path relative to the docs root.
    pub src_path: String,
    /// Display title.
    pub title: String,
    /// Result.
    pub status: PageStatus,
    /// Attachments uploaded, or that would be uploaded on a dry run.
    pub attachments: Vec<PathBuf>,
    /// Non-fatal problems found while transforming or uploading.
    pub warnings: Vec<String>,
}

/// Result of a publish run.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Hierarchy synchronization result.
    pub sync: SyncReport,
    /// One entry per synchronized leaf, in navigation order.
    pub pages: Vec<PageReport>,
}

impl PublishReport {
    /// Number of updated pages.
    pub fn updated(&self) -> usize {
        self.count(|s| matches!(s, PageStatus::Updated))
    }

    /// Number of failed pages.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, PageStatus::Failed { .. }))
    }

    /// Total warnings across pages.
    pub fn warnings(&self) -> usize {
        self.pages.iter().map(|p| p.warnings.len()).sum()
    }

    fn count(&self, predicate: impl Fn(&PageStatus) -> bool) -> usize {
        self.pages.iter().filter(|p| predicate(&p.status)).count()
    }
}

/// A synchronized leaf ready for transformation.
struct PendingPage<'n> {
    page: &'n NavPage,
    identity: PageIdentity,
    markdown: String,
}

/// Publishes a navigation tree into a wiki space.
pub struct Publisher<'a> {
    client: &'a dyn WikiClient,
    renderer: &'a dyn MarkupRenderer,
    options: PublishOptions,
    diagrams: Option<&'a DiagramRasterizer>,
}

impl<'a> Publisher<'a> {
    /// Create a publisher.
    pub fn new(
        client: &'a dyn WikiClient,
        renderer: &'a dyn MarkupRenderer,
        options: PublishOptions,
    ) -> Self {
        Self {
            client,
            renderer,
            options,
            diagrams: None,
        }
    }

    /// Render diagram code blocks through `diagrams`.
    #[must_use]
    pub fn with_diagrams(mut self, diagrams: &'a DiagramRasterizer) -> Self {
        self.diagrams = Some(diagrams);
        self
    }

    /// Synchronize the hierarchy, then convert and update every mapped page.
    pub fn publish(&self, nav: &[NavNode]) -> PublishReport {
        let sync = PageHierarchySynchronizer::new(
            self.client,
            self.options.space.as_str(),
            self.options.naming.clone(),
        )
        .sync(nav, &self.options.parent_id);

        tracing::info!(
            "Synchronized hierarchy: {} created, {} reused, {} skipped",
            sync.created(),
            sync.reused(),
            sync.skipped()
        );

        let mut pages = Vec::new();
        let mut pending = Vec::new();
        let mut seen = HashSet::new();

        for page in leaves(nav) {
            let Some(identity) = sync.map.get(&page.src_path) else {
                continue;
            };
            if !seen.insert(page.src_path.as_str()) {
                continue;
            }
            match fs::read_to_string(&page.abs_src_path) {
                Ok(markdown) => pending.push(PendingPage {
                    page,
                    identity: identity.clone(),
                    markdown,
                }),
                Err(e) => {
                    tracing::error!("Failed to read {}: {e}", page.abs_src_path.display());
                    pages.push(PageReport {
                        src_path: page.src_path.clone(),
                        title: identity.title.clone(),
                        status: PageStatus::Failed {
                            reason: format!("read failed: {e}"),
                        },
                        attachments: Vec::new(),
                        warnings: Vec::new(),
                    });
                }
            }
        }

        let anchors: AnchorIndex = pending
            .iter()
            .map(|p| (p.page.src_path.clone(), extract_heading_anchors(&p.markdown)))
            .collect();

        let mut transformer = ContentTransformer::new(self.renderer, &sync.map, &anchors);
        if let Some(diagrams) = self.diagrams {
            transformer = transformer.with_diagrams(diagrams);
        }

        let transformed: Vec<TransformedPage> = pending
            .par_iter()
            .map(|p| transformer.transform(&p.markdown, p.page))
            .collect();

        for (pending, page) in pending.iter().zip(transformed) {
            pages.push(self.apply(pending, page));
        }

        // Restore navigation order; read failures were pushed first
        let order: Vec<&str> = leaves(nav).iter().map(|p| p.src_path.as_str()).collect();
        pages.sort_by_key(|p| order.iter().position(|s| *s == p.src_path));

        PublishReport { sync, pages }
    }

    fn apply(&self, pending: &PendingPage<'_>, page: TransformedPage) -> PageReport {
        let TransformedPage {
            body,
            attachments,
            mut warnings,
        } = page;
        let attachments = dedup_by_filename(attachments);
        let title = pending.identity.title.clone();

        let mut report = PageReport {
            src_path: pending.page.src_path.clone(),
            title: title.clone(),
            status: PageStatus::DryRun,
            attachments: Vec::new(),
            warnings: Vec::new(),
        };

        if self.options.dry_run {
            tracing::info!("Dry run, not updating {title}");
            report.attachments = attachments;
            report.warnings = warnings;
            return report;
        }

        if let Err(e) = self.client.update_page(&pending.identity.id, &body, &title) {
            tracing::error!("Failed to update page {title}: {e}");
            report.status = PageStatus::Failed {
                reason: format!("update failed: {e}"),
            };
            report.warnings = warnings;
            return report;
        }
        tracing::info!("Updated page {title} (id={})", pending.identity.id);

        for path in attachments {
            match self.client.upload_attachment(&pending.identity.id, &path) {
                Ok(()) => {
                    tracing::debug!("Uploaded {} to {title}", path.display());
                    report.attachments.push(path);
                }
                Err(e) => {
                    let message = format!("Failed to upload {} to {title}: {e}", path.display());
                    tracing::error!("{message}");
                    warnings.push(message);
                }
            }
        }

        report.status = PageStatus::Updated;
        report.warnings = warnings;
        report
    }
}

/// Keep the first attachment for each file name.
fn dedup_by_filename(attachments: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    attachments
        .into_iter()
        .filter(|path| seen.insert(path.file_name().map(ToOwned::to_owned)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    use docsync_renderer::StorageRenderer;
    use tempfile::TempDir;

    use crate::testing::MemoryWiki;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn leaf(root: &Path, title: &str, src_path: &str) -> NavNode {
        NavNode::Leaf(NavPage {
            title: title.to_owned(),
            src_path: src_path.to_owned(),
            abs_src_path: root.join(src_path),
        })
    }

    fn options(dry_run: bool) -> PublishOptions {
        PublishOptions {
            space: "DOCS".to_owned(),
            parent_id: "root".to_owned(),
            naming: PageNaming::default(),
            dry_run,
        }
    }

    fn fixture() -> (TempDir, Vec<NavNode>) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "docs/index.md",
            "# Home\n\nSee [details](./sub/page.md#grafana-visualizations).\n\n![Arch](img/arch.png)\n",
        );
        write(root, "docs/img/arch.png", "png");
        write(
            root,
            "docs/sub/page.md",
            "# Sub Page\n\n## Grafana (visualizations)\n\n![Arch](../img/arch.png)\n",
        );
        let nav = vec![
            leaf(root, "Home", "docs/index.md"),
            NavNode::Section {
                title: "Sub".to_owned(),
                children: vec![leaf(root, "Sub Page", "docs/sub/page.md")],
            },
        ];
        (tmp, nav)
    }

    #[test]
    fn test_publish_updates_pages_with_rewritten_links() {
        let (_tmp, nav) = fixture();
        let wiki = MemoryWiki::new();
        let renderer = StorageRenderer::new();

        let report = Publisher::new(&wiki, &renderer, options(false)).publish(&nav);

        assert_eq!(report.updated(), 2);
        assert_eq!(report.failed(), 0);
        let home = wiki.page_by_title("Home").unwrap();
        assert!(home.body.contains(
            r#"<ac:link ac:anchor="Grafana-(visualizations)"><ri:page ri:content-title="Sub Page" /><ac:link-body>details</ac:link-body></ac:link>"#
        ));
        assert_eq!(home.attachments, vec!["arch.png"]);
        assert_eq!(home.updates, 1);
        assert_eq!(wiki.page_by_title("Sub").unwrap().updates, 0);
    }

    #[test]
    fn test_dry_run_leaves_pages_untouched() {
        let (_tmp, nav) = fixture();
        let wiki = MemoryWiki::new();
        let renderer = StorageRenderer::new();

        let report = Publisher::new(&wiki, &renderer, options(true)).publish(&nav);

        assert_eq!(report.pages.len(), 2);
        assert!(report.pages.iter().all(|p| p.status == PageStatus::DryRun));
        assert_eq!(report.pages[0].attachments.len(), 1);
        let home = wiki.page_by_title("Home").unwrap();
        assert_eq!(home.body, "");
        assert!(home.attachments.is_empty());
    }

    #[test]
    fn test_update_failure_is_per_page() {
        let (_tmp, nav) = fixture();
        let wiki = MemoryWiki::new().fail_update("Home");
        let renderer = StorageRenderer::new();

        let report = Publisher::new(&wiki, &renderer, options(false)).publish(&nav);

        assert_eq!(report.updated(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.pages[0].src_path, "docs/index.md");
        assert!(matches!(&report.pages[0].status, PageStatus::Failed { reason } if reason.contains("update failed")));
        assert!(wiki.page_by_title("Home").unwrap().attachments.is_empty());
        assert_eq!(wiki.page_by_title("Sub Page").unwrap().updates, 1);
    }

    #[test]
    fn test_unreadable_file_fails_only_that_page() {
        let (tmp, mut nav) = fixture();
        nav.insert(0, leaf(tmp.path(), "Ghost", "docs/ghost.md"));
        let wiki = MemoryWiki::new();
        let renderer = StorageRenderer::new();

        let report = Publisher::new(&wiki, &renderer, options(false)).publish(&nav);

        assert_eq!(
            report
                .pages
                .iter()
                .map(|p| p.src_path.as_str())
                .collect::<Vec<_>>(),
            vec!["docs/ghost.md", "docs/index.md", "docs/sub/page.md"]
        );
        assert!(matches!(report.pages[0].status, PageStatus::Failed { .. }));
        assert_eq!(report.updated(), 2);
    }

    #[test]
    fn test_skipped_branch_not_published() {
        let (_tmp, nav) = fixture();
        let wiki = MemoryWiki::new().fail_create("Sub");
        let renderer = StorageRenderer::new();

        let report = Publisher::new(&wiki, &renderer, options(false)).publish(&nav);

        assert_eq!(report.sync.skipped(), 1);
        assert_eq!(report.pages.len(), 1);
        // The link target was never mapped, so the link is left with a warning
        assert_eq!(report.pages[0].warnings.len(), 1);
        assert!(wiki.page_by_title("Home").unwrap().body.contains("<a href="));
    }

    #[test]
    fn test_dedup_by_filename() {
        let deduped = dedup_by_filename(vec![
            PathBuf::from("/a/arch.png"),
            PathBuf::from("/b/arch.png"),
            PathBuf::from("/a/flow.png"),
        ]);
        assert_eq!(
            deduped,
            vec![PathBuf::from("/a/arch.png"), PathBuf::from("/a/flow.png")]
        );
    }
}
