//! `docsync sync` command implementation.

use clap::Args;
use docsync_publish::PageHierarchySynchronizer;

use super::{
    CommonArgs, create_confluence_client, load_nav, page_naming, print_sync_report, write_map,
};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl SyncArgs {
    /// Execute the sync command.
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

        output.info(&format!(
            "Synchronizing {} into space {} under page {}...",
            config.docs_resolved.source_dir.display(),
            conf.space,
            conf.parent_id
        ));

        let report =
            PageHierarchySynchronizer::new(&client, conf.space.as_str(), page_naming(conf))
                .sync(&nav, &conf.parent_id);

        print_sync_report(&output, &report);

        if let Some(path) = &self.common.map_out {
            write_map(path, &report.map)?;
            output.info(&format!("Page map written to {}", path.display()));
        }

        Ok(())
    }
}
