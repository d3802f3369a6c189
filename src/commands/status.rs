//! Command: print the recorded state.
use std::path::Path;

use anyhow::Result;

use super::Session;
use crate::state::{StateDocument, ToolRecord};

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the state document exists but cannot be read.
pub fn run(session: &Session<'_>) -> Result<i32> {
    let store = session.store();
    if !store.path().exists() {
        session.log.info(&format!(
            "no state recorded yet ({} does not exist)",
            store.path().display()
        ));
        return Ok(0);
    }
    let doc = store.load()?;
    for line in render(&doc, store.path()) {
        println!("{line}");
    }
    Ok(0)
}

/// Human-readable report of `doc`.
#[must_use]
pub fn render(doc: &StateDocument, path: &Path) -> Vec<String> {
    let phases = if doc.completed_phases.is_empty() {
        "none".to_string()
    } else {
        doc.completed_phases
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut lines = vec![
        format!("state:     {}", path.display()),
        format!("version:   {}", doc.version),
        format!("created:   {}", doc.created),
        format!("last run:  {}", doc.last_run),
        format!("completed: {phases}"),
        format!("next:      phase {}", doc.current_phase),
    ];
    if let Some(tool) = &doc.current_tool {
        lines.push(format!("resume:    interrupted while installing {tool}"));
    }
    lines.push(format!(
        "tools:     {} installed, {} failed",
        doc.count_installed(),
        doc.count_failed()
    ));
    for (id, record) in &doc.tools {
        lines.push(match record {
            ToolRecord::Installed {
                version, method, ..
            } => format!("  ✓ {id} {version} ({method})"),
            ToolRecord::Failed { error, failed_at } => {
                format!("  ✗ {id}: {error} ({failed_at})")
            }
        });
    }
    lines
}
