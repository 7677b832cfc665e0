//! `preprocess`: filter and clean the raw complaint export.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::corpus::{self, FilterReport, ProductCategory};

pub fn run(config: &Config, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<FilterReport> {
    let input = input.unwrap_or_else(|| config.raw_data_path.clone());
    let output = output.unwrap_or_else(|| config.processed_data_path.clone());

    let report = corpus::preprocess(&input, &output)
        .with_context(|| format!("preprocessing {} failed", input.display()))?;

    println!("{}", summary(&report));
    println!("Saved cleaned data to {}", output.display());
    Ok(report)
}

/// Human-readable preprocessing summary.
pub fn summary(report: &FilterReport) -> String {
    let mut out = format!(
        "Rows read: {}\nWithout narrative: {} ({:.1}%)\nOutside product scope: {}\nKept: {}\n",
        report.total_rows,
        report.missing_narrative,
        report.missing_ratio() * 100.0,
        report.unmapped_product,
        report.kept
    );

    out.push_str("Distribution:\n");
    for category in ProductCategory::ALL {
        let count = report.distribution.get(&category).copied().unwrap_or(0);
        out.push_str(&format!("  {:<16} {}\n", category.as_str(), count));
    }
    out.push_str(&format!(
        "Average narrative length: {:.1} words",
        report.average_word_count
    ));
    out
}
