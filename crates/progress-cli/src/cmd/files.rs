use super::open_store;
use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let entries = store.list().context("failed to list documents")?;

    if json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No progress documents found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            let modified = chrono::DateTime::from_timestamp(e.mtime, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default();
            vec![e.path.clone(), e.name.clone(), modified]
        })
        .collect();
    print_table(&["PATH", "NAME", "MODIFIED"], rows);
    Ok(())
}
