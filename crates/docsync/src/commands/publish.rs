//! `docsync publish` command implementation.

use clap::Args;
use docsync_publish::{PageStatus, PublishOptions, PublishReport, Publisher};
use docsync_renderer::StorageRenderer;

use super::{
    CommonArgs, create_confluence_client, create_diagram_rasterizer, load_nav, page_naming,
    print_sync_report, write_map,
};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the publish command.
#[derive(Args)]
pub(crate) struct PublishArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Convert pages without updating Confluence.
    #[arg(long)]
    dry_run: bool,
}

impl PublishArgs {
    /// Execute the publish command.
    ///
    /// Skipped or failed pages are reported but do not fail the command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or navigation cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.common.load_config()?;
        let conf = config.require_confluence()?;
        let nav = load_nav(&config)?;
        let client = create_confluence_client(conf);
        let renderer = StorageRenderer::new();
        let diagrams = create_diagram_rasterizer(&config.diagrams_resolved);
        if diagrams.is_none() {
            output.detail("Diagram rendering disabled (no kroki_url configured)");
        }

        let options = PublishOptions {
            space: conf.space.clone(),
            parent_id: conf.parent_id.clone(),
            naming: page_naming(conf),
            dry_run: self.dry_run,
        };

        output.info(&format!(
            "Publishing {} to space {}...",
            config.docs_resolved.source_dir.display(),
            conf.space
        ));

        let mut publisher = Publisher::new(&client, &renderer, options);
        if let Some(diagrams) = &diagrams {
            publisher = publisher.with_diagrams(diagrams);
        }
        let report = publisher.publish(&nav);

        print_sync_report(&output, &report.sync);
        print_publish_report(&output, &report, self.dry_run);

        if let Some(path) = &self.common.map_out {
            write_map(path, &report.sync.map)?;
            output.info(&format!("Page map written to {}", path.display()));
        }

        Ok(())
    }
}

fn print_publish_report(output: &Output, report: &PublishReport, dry_run: bool) {
    output.separator();
    if dry_run {
        output.highlight("[DRY RUN] No pages updated.");
    }

    for page in &report.pages {
        match &page.status {
            PageStatus::Updated => output.success(&format!("  Updated {}", page.title)),
            PageStatus::DryRun => output.info(&format!("  Would update {}", page.title)),
            PageStatus::Failed { reason } => {
                output.error(&format!("  Failed {} ({}): {reason}", page.title, page.src_path));
            }
        }
        for attachment in &page.attachments {
            output.detail(&format!("    -> {}", attachment.display()));
        }
        for warning in &page.warnings {
            output.warning(&format!("    ! {warning}"));
        }
    }

    output.separator();
    let summary = format!(
        "{} updated, {} failed, {} warnings",
        report.updated(),
        report.failed(),
        report.warnings()
    );
    if report.failed() > 0 || report.sync.skipped() > 0 {
        output.warning(&summary);
    } else {
        output.success(&summary);
    }
}
