//! Console rendering and JSON persistence

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use mailcheck_common::FindingStatus;
use mailcheck_core::AuditReport;
use std::io::Write;
use std::path::{Path, PathBuf};

fn status_icon(status: FindingStatus) -> &'static str {
    match status {
        FindingStatus::Pass => "✅",
        FindingStatus::Warn => "⚠️",
        FindingStatus::Fail => "❌",
        FindingStatus::Info => "ℹ️",
    }
}

/// Write the human readable report
pub fn render_console<W: Write>(out: &mut W, report: &AuditReport) -> std::io::Result<()> {
    let profile = &report.profile;

    writeln!(out, "Domain Info:")?;
    writeln!(out, "Domain: {}", profile.domain)?;
    writeln!(out, "Checked at: {}", profile.query_time)?;

    writeln!(out, "\nDNSSEC Info:")?;
    match &profile.dnssec_info {
        Some(info) => writeln!(out, "DNSSEC Enabled: {}", info.enabled)?,
        None => writeln!(out, "DNSSEC Info: Not available")?,
    }

    writeln!(out, "\nMX Records:")?;
    if profile.mx_records().is_empty() {
        writeln!(out, "No MX records found")?;
    }
    for mx in profile.mx_records() {
        writeln!(out, "Host: {}, Priority: {}", mx.host, mx.priority)?;
    }

    writeln!(out, "\nRule Check Results:")?;
    for finding in &report.findings {
        writeln!(
            out,
            "{} - {}: {}",
            status_icon(finding.status),
            finding.description,
            finding.message
        )?;
    }

    writeln!(
        out,
        "\nSummary: {} passed, {} warnings, {} failed, {} info",
        report.count(FindingStatus::Pass),
        report.count(FindingStatus::Warn),
        report.count(FindingStatus::Fail),
        report.count(FindingStatus::Info)
    )?;

    Ok(())
}

/// `<YYYYMMDDHHMMSS>-<domain>.json`
pub fn report_file_name(domain: &str, at: NaiveDateTime) -> String {
    format!("{}-{}.json", at.format("%Y%m%d%H%M%S"), domain)
}

/// Save `json` under `dir`, creating the directory when needed
pub fn write_json_report(dir: &Path, domain: &str, json: &str, at: NaiveDateTime) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(report_file_name(domain, at));
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(path)
}
