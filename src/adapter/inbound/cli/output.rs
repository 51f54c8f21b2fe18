//! CLI output formatting.
//!
//! Human-readable output uses dimmed labels and colored status symbols.
//! With `--json` every command prints exactly one JSON document on stdout
//! instead, so the output can be piped into other tools.

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde::Serialize;

/// Output settings taken from the global CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Apply output settings. Call once, early in the entry point.
pub fn configure(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

fn suppressed() -> bool {
    let config = read_config();
    config.json || config.quiet
}

/// Print `value` as a single JSON document.
pub fn json<T: Serialize>(value: &T) -> crate::error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn section(title: &str) {
    if suppressed() {
        return;
    }
    println!();
    println!("{}", title.bold());
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    if suppressed() {
        return;
    }
    println!("  {:<16} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    if suppressed() {
        return;
    }
    println!("  {} {}", "✓".green(), message);
}

/// Errors always go to stderr, even in quiet mode.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", serde_json::json!({ "error": message }));
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}
