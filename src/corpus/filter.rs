//! Corpus filtering: drop incomplete and out-of-taxonomy complaints.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use super::category::ProductCategory;
use super::normalizer::word_count;
use super::record::{read_raw_complaints, write_processed, ComplaintRecord, ProcessedComplaint};
use crate::error::Result;

/// Counts gathered while filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    pub total_rows: usize,
    pub missing_narrative: usize,
    pub unmapped_product: usize,
    pub kept: usize,
    pub distribution: BTreeMap<ProductCategory, usize>,
    /// Mean word count of the raw narratives that were kept.
    pub average_word_count: f64,
}

impl FilterReport {
    /// Share of rows (0.0..=1.0) that had no narrative.
    pub fn missing_ratio(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.missing_narrative as f64 / self.total_rows as f64
    }
}

/// Keep records with a narrative and a mapped product, cleaning each one.
pub fn filter_records(records: Vec<ComplaintRecord>) -> (Vec<ProcessedComplaint>, FilterReport) {
    let mut report = FilterReport {
        total_rows: records.len(),
        ..Default::default()
    };
    let mut kept = Vec::new();
    let mut words_total = 0usize;

    for record in records {
        let Some(narrative) = record.narrative_text() else {
            report.missing_narrative += 1;
            continue;
        };
        let words = word_count(narrative);

        match ProcessedComplaint::from_record(record) {
            Some(complaint) => {
                words_total += words;
                *report
                    .distribution
                    .entry(complaint.standardized_product)
                    .or_default() += 1;
                kept.push(complaint);
            }
            None => report.unmapped_product += 1,
        }
    }

    report.kept = kept.len();
    if report.kept > 0 {
        report.average_word_count = words_total as f64 / report.kept as f64;
    }

    (kept, report)
}

/// Read the raw export, filter it, and write the processed CSV.
pub fn preprocess(input: &Path, output: &Path) -> Result<FilterReport> {
    let records = read_raw_complaints(input)?;
    info!("Loaded {} complaints from {}", records.len(), input.display());

    let (kept, report) = filter_records(records);
    write_processed(output, &kept)?;

    info!(
        "Kept {} of {} complaints ({} without narrative, {} out of scope)",
        report.kept, report.total_rows, report.missing_narrative, report.unmapped_product
    );
    info!("Wrote processed corpus to {}", output.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(product: &str, narrative: Option<&str>) -> ComplaintRecord {
        ComplaintRecord {
            product: Some(product.to_string()),
            narrative: narrative.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn drops_unmapped_and_missing_rows() {
        let records = vec![
            record("Prepaid card", Some("Card fees were hidden")),
            record("Auto loan", Some("Car repossessed")),
            record("Personal loan", None),
            record("Money transfers", Some("Wire never arrived at all")),
        ];

        let (kept, report) = filter_records(records);

        assert_eq!(kept.len(), 2);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.missing_narrative, 1);
        assert_eq!(report.unmapped_product, 1);
        assert_eq!(report.kept, 2);
        assert_eq!(report.distribution[&ProductCategory::CreditCard], 1);
        assert_eq!(report.distribution[&ProductCategory::MoneyTransfers], 1);
        assert!(!report.distribution.contains_key(&ProductCategory::PersonalLoan));
    }

    #[test]
    fn average_word_count_covers_kept_rows_only() {
        let records = vec![
            record("Credit card", Some("one two")),
            record("Credit card", Some("one two three four")),
            record("Mortgage", Some("this long narrative is not counted at all")),
        ];

        let (_, report) = filter_records(records);
        assert!((report.average_word_count - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let (kept, report) = filter_records(Vec::new());
        assert!(kept.is_empty());
        assert_eq!(report.kept, 0);
        assert_eq!(report.average_word_count, 0.0);
        assert_eq!(report.missing_ratio(), 0.0);
    }

    #[test]
    fn preprocess_writes_processed_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        std::fs::write(
            &input,
            "Product,Consumer complaint narrative,Issue,Company,Complaint ID\n\
             Checking or savings account,Overdraft fee XXXX charged twice!,Fees,Bank A,7\n\
             Student loan,Servicer lost my paperwork,Servicing,Loan Co,8\n",
        )
        .unwrap();
        let output = dir.path().join("out").join("filtered.csv");

        let report = preprocess(&input, &output).unwrap();
        assert_eq!(report.kept, 1);

        let processed = crate::corpus::record::read_processed(&output).unwrap();
        assert_eq!(processed.len(), 1);
        assert_eq!(
            processed[0].standardized_product,
            ProductCategory::SavingsAccount
        );
        assert_eq!(
            processed[0].cleaned_narrative,
            "overdraft fee charged twice!"
        );
    }
}
