//! Output formatting for the Cadence CLI.
//!
//! Tables go to stdout for people; `--output json|yaml` emits a single
//! document for scripts. Status lines go to stderr in machine formats so they
//! never corrupt the document.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    fn is_machine(self) -> bool {
        !matches!(self, OutputFormat::Table)
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// Note that stays out of the way of machine-readable output.
pub fn print_note(msg: &str, format: OutputFormat) {
    if format.is_machine() {
        eprintln!("{}", msg.dimmed());
    } else {
        println!("{}", msg.dimmed());
    }
}

/// Serialize `item` as a JSON or YAML document.
pub fn render<T: Serialize + ?Sized>(item: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(item)?,
        OutputFormat::Table | OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(item)?;
            json.push('\n');
            json
        }
    })
}

/// Print job rows as a table, or as a document in machine formats.
pub fn print_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    if format.is_machine() {
        print!("{}", render(rows, format)?);
        return Ok(());
    }
    if rows.is_empty() {
        print_note("No jobs.", format);
        return Ok(());
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{}", table);
    Ok(())
}

pub fn print_item<T: Serialize + ?Sized>(item: &T, format: OutputFormat) -> Result<()> {
    print!("{}", render(item, format)?);
    Ok(())
}

/// Print a titled block of `key: value` lines.
pub fn print_summary(title: &str, entries: &[(&str, String)]) {
    println!();
    println!("{}", title.bold().underline());
    for (key, value) in entries {
        println!("  {}: {}", key.cyan(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        id: &'static str,
        status: &'static str,
    }

    #[test]
    fn test_render_json_and_yaml() {
        let rows = [Row {
            id: "job-0",
            status: "FINISHED",
        }];

        let json = render(&rows[..], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["status"], "FINISHED");

        let yaml = render(&rows[..], OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("id: job-0"));
    }
}
