//! Page hierarchy synchronization.
//!
//! Walks the navigation tree depth-first and makes sure every node has a
//! remote page, reusing pages found by title and creating the rest under
//! their parent. The resulting [`PageIdentityMap`] is what link rewriting
//! resolves against.
//!
//! A page found by title is reused as-is: its parent and body are neither
//! verified nor repaired.

use std::collections::BTreeMap;

use docsync_confluence::{PageIdentity, WikiClient};

use crate::nav::NavNode;

/// Body of a newly created section page: a listing of its child pages.
pub const SECTION_BODY: &str = r#"<ac:structured-macro ac:name="children" />"#;

/// Remote page identity per synchronized leaf, keyed by source path.
pub type PageIdentityMap = BTreeMap<String, PageIdentity>;

/// Prefix and suffix applied to every page title.
#[derive(Debug, Clone, Default)]
pub struct PageNaming {
    /// Text prepended to the title.
    pub prefix: String,
    /// Text appended to the title.
    pub suffix: String,
}

impl PageNaming {
    /// Display title for a node title.
    pub fn display_title(&self, title: &str) -> String {
        format!("{}{title}{}", self.prefix, self.suffix)
    }
}

/// What happened to one navigation node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    /// A page with the display title already existed.
    Reused(PageIdentity),
    /// A new page was created.
    Created(PageIdentity),
    /// The node and its descendants were skipped.
    Skipped {
        /// Error that caused the skip.
        reason: String,
    },
}

/// Outcome for one visited node. Descendants of a skipped node have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutcome {
    /// Display title.
    pub title: String,
    /// Source path for leaves, `None` for sections.
    pub src_path: Option<String>,
    /// Result.
    pub status: NodeStatus,
}

/// Result of a synchronization run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Identity of every synchronized leaf.
    pub map: PageIdentityMap,
    /// Per-node outcomes in traversal order.
    pub outcomes: Vec<NodeOutcome>,
}

impl SyncReport {
    /// Number of created pages.
    pub fn created(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Created(_)))
    }

    /// Number of reused pages.
    pub fn reused(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Reused(_)))
    }

    /// Number of skipped nodes (descendants not included).
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, NodeStatus::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&NodeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// Mirrors a navigation tree into a wiki space.
pub struct PageHierarchySynchronizer<'a> {
    client: &'a dyn WikiClient,
    space: String,
    naming: PageNaming,
}

impl<'a> PageHierarchySynchronizer<'a> {
    /// Create a synchronizer for one space.
    pub fn new(client: &'a dyn WikiClient, space: impl Into<String>, naming: PageNaming) -> Self {
        Self {
            client,
            space: space.into(),
            naming,
        }
    }

    /// Ensure a remote page exists for every node under `parent_id`.
    ///
    /// Never fails as a whole: a node whose lookup or creation fails is
    /// reported as skipped and its children are not visited.
    pub fn sync(&self, nodes: &[NavNode], parent_id: &str) -> SyncReport {
        let mut report = SyncReport::default();
        self.sync_nodes(nodes, parent_id, &mut report);
        report
    }

    fn sync_nodes(&self, nodes: &[NavNode], parent_id: &str, report: &mut SyncReport) {
        for node in nodes {
            let title = self.naming.display_title(node.title());
            let src_path = match node {
                NavNode::Section { .. } => None,
                NavNode::Leaf(page) => Some(page.src_path.clone()),
            };

            let status = self.ensure_page(node, &title, parent_id);
            let identity = match &status {
                NodeStatus::Reused(identity) | NodeStatus::Created(identity) => {
                    Some(identity.clone())
                }
                NodeStatus::Skipped { .. } => None,
            };
            report.outcomes.push(NodeOutcome {
                title,
                src_path,
                status,
            });

            let Some(identity) = identity else {
                continue;
            };

            match node {
                NavNode::Leaf(page) => {
                    tracing::debug!("Mapped {} to page {}", page.src_path, identity.id);
                    report.map.insert(page.src_path.clone(), identity);
                }
                NavNode::Section { children, .. } => {
                    if !children.is_empty() {
                        self.sync_nodes(children, &identity.id, report);
                    }
                }
            }
        }
    }

    fn ensure_page(&self, node: &NavNode, title: &str, parent_id: &str) -> NodeStatus {
        match self.client.find_page_by_title(&self.space, title) {
            Ok(Some(existing)) => {
                tracing::debug!("Page already exists: {title} (id={})", existing.id);
                return NodeStatus::Reused(PageIdentity {
                    id: existing.id,
                    title: title.to_owned(),
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Error looking up page {title}: {e}");
                return NodeStatus::Skipped {
                    reason: format!("lookup failed: {e}"),
                };
            }
        }

        let body = match node {
            NavNode::Section { .. } => {
                tracing::info!("Creating section page: {title}");
                SECTION_BODY
            }
            NavNode::Leaf(_) => {
                tracing::info!("Creating empty page: {title}");
                ""
            }
        };

        match self.client.create_page(&self.space, title, body, parent_id) {
            Ok(created) => NodeStatus::Created(PageIdentity {
                id: created.id,
                title: title.to_owned(),
            }),
            Err(e) => {
                tracing::error!("Error creating page {title}: {e}");
                NodeStatus::Skipped {
                    reason: format!("creation failed: {e}"),
                }
            }
        }
    }
}
