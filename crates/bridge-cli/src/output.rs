//! Terminal output helpers.

use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a labelled value.
pub fn print_row(label: &str, value: impl std::fmt::Display) {
    println!("  {:<24} {}", format!("{}:", label), value);
}

pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}
