// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report generation module

pub mod formatter;
pub mod generator;
pub mod output;

use crate::types::*;
use anyhow::Result;
use std::path::Path;

pub use formatter::ReportFormatter;
pub use generator::ReportGenerator;
pub use output::ReportOutputFormat;

/// Save report to file in the given format
pub fn save_report<P: AsRef<Path>>(
    report: &ScanReport,
    path: P,
    format: ReportOutputFormat,
) -> Result<()> {
    let formatter = ReportFormatter::new();
    formatter.save(report, path, format)
}

/// Print report to console
pub fn print_report(report: &ScanReport) {
    let formatter = ReportFormatter::new();
    formatter.print(report);
}
