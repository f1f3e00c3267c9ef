pub mod files;
pub mod serve;
pub mod set;
pub mod show;

use anyhow::Context;
use progress_core::{config::Config, DocumentStore};
use std::path::Path;

/// Open the document store for `root` with its on-disk configuration.
pub fn open_store(root: &Path) -> anyhow::Result<DocumentStore> {
    let config = Config::load(root).context("failed to load configuration")?;
    DocumentStore::open(root, config)
        .with_context(|| format!("cannot open project root {}", root.display()))
}
