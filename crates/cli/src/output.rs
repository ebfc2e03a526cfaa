//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use nearby_core::Error;
use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a structured error with its code and suggestion
    pub fn failure(error: &Error) {
        eprintln!(
            "{} {} {}",
            "✗".red(),
            format!("[{}]", error.code).dimmed(),
            error.message
        );
        if let Some(context) = &error.context {
            eprintln!("  {} {}", "context:".dimmed(), context);
        }
        if let Some(suggestion) = &error.suggestion {
            eprintln!("  {} {}", "hint:".cyan(), suggestion);
        }
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print a labelled counter line
    pub fn counter(label: &str, value: usize) {
        println!("  {:<12} {}", label.dimmed(), value.bold());
    }
}

/// Format a distance for display
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{:.2} km", km)
    }
}

/// Format one result line: name and distance
pub fn format_result_line(name: &str, km: f64) -> String {
    format!("{}  |  {}", name, format_distance(km))
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
