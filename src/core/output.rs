//! Colored terminal output for btget
//!
//! Uses owo-colors for terminal colors. Progress bars live in
//! `helpers::internal::progress`.

use owo_colors::OwoColorize;

use crate::transparency::{Level, Verdict};

/// Print an action header (blue, bold)
/// Example: "==> Fetching https://example.com/tool.bin"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print a sub-action (cyan arrow)
/// Example: "  -> verify"
pub fn sub_action(stage: &str) {
    println!("  {} {}", "->".cyan(), stage);
}

/// Print a detail line (dimmed prefix)
/// Example: "     sha256 9f86d08..."
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print the verdict line, colored by level.
///
/// Error verdicts go to stderr like other errors.
pub fn verdict(verdict: &Verdict) {
    let label = verdict.level.to_string();
    match verdict.level {
        Level::Ok => println!("{} {}", format!("{}:", label).green().bold(), verdict.message),
        Level::Warning => println!(
            "{} {}",
            format!("{}:", label).yellow().bold(),
            verdict.message.yellow()
        ),
        Level::Error => eprintln!(
            "{} {}",
            format!("{}:", label).red().bold(),
            verdict.message.red()
        ),
    }
}
