//! Complaint records and CSV input/output.

use std::fs::{self, File};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::category::ProductCategory;
use super::normalizer::clean_text;
use crate::error::{Error, Result};

/// One row of the raw CFPB export (only the columns the pipeline reads).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    #[serde(rename = "Date received", default)]
    pub date_received: Option<String>,
    #[serde(rename = "Product", default)]
    pub product: Option<String>,
    #[serde(rename = "Sub-product", default)]
    pub sub_product: Option<String>,
    #[serde(rename = "Issue", default)]
    pub issue: Option<String>,
    #[serde(rename = "Sub-issue", default)]
    pub sub_issue: Option<String>,
    #[serde(rename = "Consumer complaint narrative", default)]
    pub narrative: Option<String>,
    #[serde(rename = "Company", default)]
    pub company: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
    #[serde(rename = "Complaint ID", default)]
    pub complaint_id: Option<String>,
}

impl ComplaintRecord {
    /// Narrative text when present and not blank.
    pub fn narrative_text(&self) -> Option<&str> {
        self.narrative.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// A record that survived filtering, with its category and cleaned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedComplaint {
    #[serde(rename = "Date received", default)]
    pub date_received: Option<String>,
    #[serde(rename = "Product", default)]
    pub product: Option<String>,
    #[serde(rename = "Sub-product", default)]
    pub sub_product: Option<String>,
    #[serde(rename = "Issue", default)]
    pub issue: Option<String>,
    #[serde(rename = "Sub-issue", default)]
    pub sub_issue: Option<String>,
    #[serde(rename = "Consumer complaint narrative", default)]
    pub narrative: Option<String>,
    #[serde(rename = "Company", default)]
    pub company: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
    #[serde(rename = "Complaint ID", default)]
    pub complaint_id: Option<String>,
    #[serde(rename = "Standardized_Product")]
    pub standardized_product: ProductCategory,
    #[serde(rename = "cleaned_narrative", default)]
    pub cleaned_narrative: String,
}

impl ProcessedComplaint {
    /// Map, clean and keep a raw record; `None` if it has no narrative or
    /// its product is outside the taxonomy.
    pub fn from_record(record: ComplaintRecord) -> Option<Self> {
        let narrative = record.narrative_text()?;
        let category = ProductCategory::from_raw(record.product.as_deref()?)?;
        let cleaned_narrative = clean_text(narrative);

        Some(Self {
            date_received: record.date_received,
            product: record.product,
            sub_product: record.sub_product,
            issue: record.issue,
            sub_issue: record.sub_issue,
            narrative: record.narrative,
            company: record.company,
            state: record.state,
            complaint_id: record.complaint_id,
            standardized_product: category,
            cleaned_narrative,
        })
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.display().to_string()));
    }
    Ok(())
}

/// Read the raw complaint export.
pub fn read_raw_complaints(path: &Path) -> Result<Vec<ComplaintRecord>> {
    ensure_exists(path)?;
    let mut reader = csv::Reader::from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }

    debug!("Read {} raw records from {}", records.len(), path.display());
    Ok(records)
}

/// Read the processed (filtered + cleaned) complaints.
pub fn read_processed(path: &Path) -> Result<Vec<ProcessedComplaint>> {
    ensure_exists(path)?;
    let mut reader = csv::Reader::from_path(path)?;

    let mut complaints = Vec::new();
    for row in reader.deserialize() {
        complaints.push(row?);
    }

    debug!(
        "Read {} processed complaints from {}",
        complaints.len(),
        path.display()
    );
    Ok(complaints)
}

/// Write processed complaints, creating parent directories as needed.
pub fn write_processed(path: &Path, complaints: &[ProcessedComplaint]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for complaint in complaints {
        writer.serialize(complaint)?;
    }
    writer.flush()?;
    Ok(())
}
