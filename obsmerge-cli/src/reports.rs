use anyhow::Result;
use colored::Colorize;
use obsmerge_core::AggregateReport;
use serde::Serialize;
use std::io::Write;

use crate::util::scalar_text;

pub fn generate_json_report<W: Write, T: Serialize>(
    out: &mut W,
    report: &T,
    pretty: bool,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, report)?;
    } else {
        serde_json::to_writer(&mut *out, report)?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    report: &AggregateReport,
    observation_files: usize,
) -> Result<()> {
    writeln!(out, "{}", "📊 Merged Observation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;
    writeln!(out, "Observation files: {observation_files}")?;
    writeln!(out)?;

    writeln!(out, "{}", "Config".bright_yellow().bold())?;
    for (key, value) in &report.features.config {
        writeln!(out, "  {key:30} {}", scalar_text(value))?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "Features".bright_yellow().bold())?;
    if report.features.means.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (name, mean) in &report.features.means {
        writeln!(out, "  {name:30} {mean:>14.4}")?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "Payoffs".bright_yellow().bold())?;
    for (role, strategy, summary) in report.strategies() {
        let true_stddev = summary
            .true_sample_stddev
            .map_or_else(|| "n/a".dimmed().to_string(), |sd| format!("{sd:.4}"));
        writeln!(out, "  {} / {}", role.bold(), strategy.green())?;
        writeln!(
            out,
            "     mean {:>12.4}   egta σ {:>10.4}   true σ {:>10}",
            summary.mean, summary.egta_sample_stddev, true_stddev
        )?;
        for (feature, mean) in &summary.features {
            writeln!(out, "     • {feature:26} {mean:>14.4}")?;
        }
    }
    Ok(())
}

pub fn generate_markdown_report<W: Write>(out: &mut W, report: &AggregateReport) -> Result<()> {
    writeln!(out, "# Merged Observation Report\n")?;

    writeln!(out, "## Config\n")?;
    writeln!(out, "| Key | Value |")?;
    writeln!(out, "| --- | --- |")?;
    for (key, value) in &report.features.config {
        writeln!(out, "| {key} | {} |", scalar_text(value))?;
    }

    writeln!(out, "\n## Features\n")?;
    writeln!(out, "| Feature | Mean |")?;
    writeln!(out, "| --- | ---: |")?;
    for (name, mean) in &report.features.means {
        writeln!(out, "| {name} | {mean:.4} |")?;
    }

    writeln!(out, "\n## Payoffs\n")?;
    writeln!(out, "| Role | Strategy | Mean | egta σ | true σ |")?;
    writeln!(out, "| --- | --- | ---: | ---: | ---: |")?;
    for (role, strategy, summary) in report.strategies() {
        let true_stddev = summary
            .true_sample_stddev
            .map_or_else(|| "n/a".to_string(), |sd| format!("{sd:.4}"));
        writeln!(
            out,
            "| {role} | {strategy} | {:.4} | {:.4} | {true_stddev} |",
            summary.mean, summary.egta_sample_stddev
        )?;
    }
    Ok(())
}
