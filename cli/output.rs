use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use std::io::{self, Write};
use std::path::Path;
use xsnap_core::{ProjectProfile, SnapshotReport};

pub fn print_snapshot_report(report: &SnapshotReport, quiet: bool, verbose: u8) {
    println!(
        "{} Total tokens: {}",
        "Processing complete.".green().bold(),
        report.total_tokens.to_string().cyan()
    );
    if quiet {
        return;
    }

    println!(
        "{:<12} {}",
        "Output:".green(),
        report.output_path.display().to_string().blue()
    );
    if report.notebooks_converted > 0 {
        println!(
            "{:<12} {}",
            "Notebooks:".green(),
            format!("{} converted to markdown", report.notebooks_converted).cyan()
        );
    }
    if report.errors > 0 {
        println!(
            "{:<12} {}",
            "Errors:".yellow(),
            format!("{} entries could not be processed (see log)", report.errors).yellow()
        );
    }

    if !report.ignored.is_empty() {
        println!("{}", "Ignored paths:".green());
        for ignored in &report.ignored {
            println!("- {}", ignored.dimmed());
        }
    }

    if verbose > 0 && !report.excluded.is_empty() {
        print_excluded_table(report);
    }

    if report.exceeds_threshold() {
        println!(
            "{} Output exceeds split threshold ({} > {} tokens). Split into {} files:",
            "⚠".yellow(),
            report.total_tokens,
            report.split_threshold,
            report.split_written.len()
        );
        for segment in &report.split_written {
            println!("  {}", segment.display().to_string().blue());
        }
    }
}

fn human_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

fn print_excluded_table(report: &SnapshotReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Excluded file").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
        Cell::new("Reason").fg(Color::Green),
    ]);
    for excluded in &report.excluded {
        table.add_row(vec![
            Cell::new(&excluded.rel_path).fg(Color::Cyan),
            Cell::new(human_size(excluded.size))
                .set_alignment(comfy_table::CellAlignment::Right)
                .fg(Color::DarkGrey),
            Cell::new(excluded.reason.as_str()),
        ]);
    }
    println!("{table}");
}

pub fn print_profile_pretty(profile: &ProjectProfile, root: &Path, quiet: bool) -> Result<()> {
    if !quiet {
        println!();
        println!("{}", " Project Profile ".green().bold().underline());
        println!("{:<12} {}", "Root:".green(), root.display().to_string().blue());
    }
    write_to_stdout(&profile.to_string())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
