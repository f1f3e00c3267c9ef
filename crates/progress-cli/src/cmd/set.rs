use super::open_store;
use crate::output::print_json;
use anyhow::{anyhow, Context};
use progress_core::{Marker, Precondition};
use std::path::Path;

pub fn run(root: &Path, path: &str, line: usize, value: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let doc = store
        .read(path)
        .with_context(|| format!("failed to read {path}"))?;
    let current = doc
        .checkboxes()
        .into_iter()
        .find(|cb| cb.index == line)
        .ok_or_else(|| anyhow!("line {line} of {path} is not a checkbox"))?;

    let marker = resolve_marker(current.marker, value)?;
    let expected = Precondition::new(doc.rev.as_str()).with_mtime(Some(doc.mtime));
    let outcome = store
        .write_line(path, line, marker, &expected)
        .with_context(|| format!("failed to update line {line} of {path}"))?;

    if json {
        print_json(&outcome)?;
    } else {
        println!(
            "{} → {}  {}",
            current.marker.symbol(),
            marker.symbol(),
            outcome.updated_line.trim_start()
        );
    }
    Ok(())
}

/// `next` advances the primary cycle, a digit is a shortcut key, anything
/// else must be one of the six marker characters.
fn resolve_marker(current: Marker, value: &str) -> anyhow::Result<Marker> {
    let marker = match value {
        "next" if !current.is_primary() => {
            return Err(anyhow!(
                "{} {} is outside the ☐ → 🔄 → ☑ cycle; pick a status with keys 1-6",
                current.symbol(),
                current.label()
            ))
        }
        "next" => current.next_primary()?,
        v if v.len() == 1 && v.chars().all(|c| c.is_ascii_digit()) => Marker::from_key(v)?,
        v => v.parse::<Marker>()?,
    };
    Ok(marker)
}
