//! Display formatting for CLI output
//!
//! Reports go to stderr so stdout carries only the mapped manifest.

use console::style;
use mapkubeapis_core::{DocumentStatus, MapReport};

/// Print applied and skipped mappings and document failures
pub fn print_report(report: &MapReport) {
    for applied in &report.applied {
        eprintln!(
            "  {} {} {} {} (deprecated or removed in {})",
            style("✓").green(),
            style(api_summary(&applied.deprecated_api)).yellow(),
            style("→").blue(),
            style(api_summary(&applied.new_api)).cyan(),
            applied.threshold
        );
    }

    for skipped in &report.skipped {
        eprintln!(
            "  {} {} kept, cluster is older than {}",
            style("-").dim(),
            style(api_summary(&skipped.deprecated_api)).dim(),
            skipped.threshold
        );
    }

    for outcome in report.failures() {
        if let DocumentStatus::Failed(err) = &outcome.status {
            eprintln!(
                "  {} document {} ({}) left unnormalized: {}",
                style("⚠").yellow(),
                outcome.index,
                outcome.display_name(),
                err
            );
        }
    }
}

/// One-line form of a mapping API, `apiVersion: apps/v1\nkind: Deployment\n` -> `apps/v1 Deployment`
pub fn api_summary(api: &str) -> String {
    api.lines()
        .filter_map(|line| line.split_once(':').map(|(_, v)| v.trim()))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
