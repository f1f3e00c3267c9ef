use super::open_store;
use crate::output::{print_json, print_table};
use anyhow::Context;
use progress_core::status;
use std::path::Path;

pub fn run(root: &Path, path: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let doc = store
        .read(path)
        .with_context(|| format!("failed to read {path}"))?;
    let checkboxes = doc.checkboxes();
    let tally = status::tally(&doc.content);

    if json {
        #[derive(serde::Serialize)]
        struct ShowOutput<'a> {
            path: &'a str,
            rev: &'a str,
            mtime: i64,
            checkboxes: &'a [progress_core::CheckboxLine],
            tally: &'a status::Tally,
        }
        return print_json(&ShowOutput {
            path: &doc.path,
            rev: doc.rev.as_str(),
            mtime: doc.mtime,
            checkboxes: &checkboxes,
            tally: &tally,
        });
    }

    println!("{}  (rev {})", doc.path, &doc.rev.as_str()[..12]);
    if checkboxes.is_empty() {
        println!("No checkbox lines.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = checkboxes
        .iter()
        .map(|cb| {
            vec![
                cb.index.to_string(),
                format!("{} {}", cb.marker.symbol(), cb.marker.label()),
                cb.text.clone(),
            ]
        })
        .collect();
    print_table(&["LINE", "STATUS", "TEXT"], rows);
    println!();
    println!(
        "☑ {}  🔄 {}  ☐ {}  ➖ {}  ❌ {}  ❓ {}  ({} total)",
        tally.done,
        tally.in_progress,
        tally.not_started,
        tally.not_applicable,
        tally.blocked,
        tally.unclear,
        tally.total()
    );
    Ok(())
}
