//! Shared styling utilities for terminal output.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use console::Style;

use mergewatch_core::models::short_sha;
use mergewatch_core::report::{self, Tone};
use mergewatch_core::session::PathState;
use mergewatch_core::ProblemReport;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Coloured rendering of a problem report, same layout as
/// [`mergewatch_core::report::render_text`].
pub fn render_report(report: &ProblemReport) -> String {
    report::render_with(report, |tone, text| match tone {
        Tone::Plain => text.to_string(),
        Tone::Success => success(text),
        Tone::Warning => warn(text),
        Tone::Muted => dim(text),
        Tone::Added => Style::new().green().apply_to(text).to_string(),
        Tone::Deleted => Style::new().red().apply_to(text).to_string(),
    })
}

/// Table of tracked paths with their local and remote hashes.
pub fn status_table(states: &[PathState]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Path", "Local", "Remote", "State"]);

    let hash = |h: &Option<String>| {
        h.as_deref()
            .map(|h| short_sha(h).to_string())
            .unwrap_or_else(|| "—".to_string())
    };

    for state in states {
        let status = if state.remote.is_none() {
            Cell::new("missing").fg(Color::Red)
        } else if state.local == state.remote {
            Cell::new("✓ in sync").fg(Color::Green)
        } else {
            Cell::new("differs").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(&state.path),
            Cell::new(hash(&state.local)),
            Cell::new(hash(&state.remote)),
            status,
        ]);
    }

    table
}
