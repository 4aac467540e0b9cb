//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use wgctl_core::LifecycleAction;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// `--color auto` colors only a terminal, and never with `NO_COLOR` set.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Lifecycle action, green for a first enable, yellow otherwise.
pub fn paint_action(action: LifecycleAction, color: bool) -> String {
    let text = action.to_string();
    if !color {
        return text;
    }
    match action {
        LifecycleAction::Enabled => text.green().to_string(),
        LifecycleAction::Started | LifecycleAction::Restarted => text.yellow().to_string(),
    }
}

/// Comma-joined names, or `-` when empty.
pub fn names(list: &[String]) -> String {
    if list.is_empty() {
        "-".into()
    } else {
        list.join(", ")
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Devices, clients, run reports and exported files for `--output`.
///
/// `plain` prints one id per line so results can feed the next command.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
        structured => render_structured(structured, data),
    }
}

/// One device or client; the table format is the aligned `detail` text.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail(data),
        OutputFormat::Plain => id_fn(data),
        structured => render_structured(structured, data),
    }
}

/// Write to stdout unless `--quiet` or there is nothing to show.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// JSON (pretty or compact) and YAML.
fn render_structured<T: serde::Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    let json = match format {
        OutputFormat::Yaml => {
            return serde_yaml::to_string(data)
                .unwrap_or_else(|e| format!("error: serialization failed: {e}"));
        }
        OutputFormat::JsonCompact => serde_json::to_string(data),
        _ => serde_json::to_string_pretty(data),
    };
    json.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}
