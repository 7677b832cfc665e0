//! Tests for preprocess and stats commands

use std::fs;

use complaint_rag::commands::{preprocess, stats};
use complaint_rag::corpus::ProductCategory;

use crate::{build_corpus, local_config, RAW_CSV};

#[test]
fn test_preprocess_uses_configured_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");
    fs::write(&config.raw_data_path, RAW_CSV).unwrap();

    let report = preprocess::run(&config, None, None).unwrap();

    assert_eq!(report.kept, 3);
    assert!(config.processed_data_path.exists());
}

#[test]
fn test_preprocess_output_override() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");
    fs::write(&config.raw_data_path, RAW_CSV).unwrap();
    let output = dir.path().join("nested").join("clean.csv");

    preprocess::run(&config, None, Some(output.clone())).unwrap();

    assert!(output.exists());
    assert!(!config.processed_data_path.exists());
}

#[test]
fn test_preprocess_reports_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");

    let err = preprocess::run(&config, None, None).unwrap_err();
    assert!(format!("{:#}", err).contains("raw.csv"));
}

#[tokio::test]
async fn test_stats_counts_chunks_per_category() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");
    build_corpus(&config).await;

    let stats = stats::run(&config).await.unwrap();

    assert_eq!(stats.points_count, 3);
    assert_eq!(stats.dimension, 64);
    assert_eq!(stats.per_category[&ProductCategory::CreditCard], 1);
    assert_eq!(stats.per_category[&ProductCategory::PersonalLoan], 1);
    assert_eq!(stats.per_category[&ProductCategory::SavingsAccount], 1);
}

#[tokio::test]
async fn test_stats_without_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");

    assert!(stats::run(&config).await.is_err());
}
