use std::fmt::Write as _;
use std::path::Path;

use phishguard::config::Config;
use phishguard::ml::{
    MemorySink, ModelStore, ProbabilisticClassifier, RiskLevel, TrainingPhase, TrainingPipeline,
    UrlScanner, Verdict,
};
use phishguard::PipelineError;
use tempfile::tempdir;

/// Benign rows are plain HTTPS pages; phishing rows are keyword-heavy,
/// hyphenated, non-HTTPS hosts. Phishing is the majority class so balancing
/// has work to do, and a few dirty rows exercise cleaning.
fn write_dataset(path: &Path) {
    let mut csv = String::from("url,label,source\n");
    for i in 0..40 {
        writeln!(csv, "https://www.site{}.org/docs/page{},0,crawl", i, i % 4).unwrap();
    }
    for i in 0..60 {
        if i % 3 == 0 {
            writeln!(csv, "http://10.0.{}.{}/login/verify,1,feed", i % 7, i).unwrap();
        } else {
            writeln!(
                csv,
                "http://secure-login.bank{}-update.com/account/verify?id={},1,feed",
                i, i
            )
            .unwrap();
        }
    }
    // Duplicate, incomplete and unlabeled rows
    csv.push_str("https://www.site1.org/docs/page1,1,dup\n");
    csv.push_str(",1,empty\n");
    csv.push_str("https://www.unlabeled.org,,none\n");
    std::fs::write(path, csv).unwrap();
}

fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.dataset = dir.join("urls.csv");
    config.paths.model = dir.join("model").join("phishing_model.bin");
    config.training.random_forest.n_estimators = 30;
    config.training.gradient_boosting.n_estimators = 30;
    config
}

#[test]
fn test_train_then_serve() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    write_dataset(&config.paths.dataset);

    let mut pipeline = TrainingPipeline::new(config.clone());
    assert_eq!(pipeline.phase(), TrainingPhase::Idle);
    let outcome = pipeline.run().unwrap();
    assert_eq!(pipeline.phase(), TrainingPhase::Complete);

    let report = &outcome.report;
    assert_eq!(report.dataset.total_rows, 103);
    assert_eq!(report.dataset.duplicates_removed, 1);
    assert_eq!(report.dataset.dropped_incomplete, 2);
    assert_eq!(report.dataset.after.get(&0), Some(&40));
    assert_eq!(report.dataset.after.get(&1), Some(&60));
    assert_eq!(report.balanced_per_class, 40);
    assert_eq!(report.train_size + report.test_size, 80);
    assert_eq!(report.candidates.len(), 3);

    let store = ModelStore::new(&config.paths.model);
    assert!(store.exists());
    assert_eq!(store.load_report().unwrap().winner, report.winner);

    let scanner = UrlScanner::from_config(&config).unwrap();
    assert!(scanner.is_available());

    let sink = MemorySink::new();
    let phishing = scanner
        .scan_and_report("http://secure-login.bank77-update.com/account/verify?id=77", &sink)
        .unwrap();
    assert_eq!(phishing.label, Verdict::Phishing);
    assert_eq!(phishing.risk_level, RiskLevel::High);
    assert!(phishing
        .risk_factors
        .contains(&"Website does not use HTTPS".to_string()));

    let benign = scanner
        .scan_and_report("https://www.site99.org/docs/page2", &sink)
        .unwrap();
    assert_eq!(benign.label, Verdict::Legitimate);
    assert_eq!(benign.risk_level, RiskLevel::Low);
    assert!(benign.risk_factors.is_empty());

    assert_eq!(sink.len(), 2);
}

#[test]
fn test_artifact_round_trip_is_bit_identical() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    write_dataset(&config.paths.dataset);

    let outcome = TrainingPipeline::new(config.clone()).run().unwrap();
    let loaded = ModelStore::new(&config.paths.model).load().unwrap();

    assert_eq!(loaded.name(), outcome.model.name());
    let extractor = phishguard::FeatureExtractor::new(&config.features);
    for url in [
        "https://example.com",
        "http://192.168.0.1/login",
        "http://secure-login.bank-update.com/verify",
        "",
    ] {
        let fv = extractor.extract(url);
        assert_eq!(
            loaded.predict_proba(&fv).to_bits(),
            outcome.model.predict_proba(&fv).to_bits()
        );
    }
}

#[test]
fn test_winner_stable_across_runs() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    write_dataset(&config.paths.dataset);

    let first = TrainingPipeline::new(config.clone()).run().unwrap();
    config.paths.model = dir.path().join("second.bin");
    let second = TrainingPipeline::new(config).run().unwrap();

    assert_eq!(first.report.winner, second.report.winner);
    for (a, b) in first.report.candidates.iter().zip(&second.report.candidates) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.metrics, b.metrics);
    }
}

#[test]
fn test_missing_dataset_leaves_no_artifact() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let err = TrainingPipeline::new(config.clone()).run().unwrap_err();
    assert!(matches!(err, PipelineError::DatasetNotFound(_)));
    assert!(!config.paths.model.exists());
}

#[test]
fn test_single_class_dataset_fails() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(
        &config.paths.dataset,
        "url,label\nhttps://a.example.com,0\nhttps://b.example.com,0\n",
    )
    .unwrap();

    let err = TrainingPipeline::new(config).run().unwrap_err();
    assert!(matches!(err, PipelineError::EmptyClass { class: 1 }));
}

#[test]
fn test_scanner_unavailable_without_artifact() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let scanner = UrlScanner::from_config(&config).unwrap();
    assert!(!scanner.is_available());
    assert!(matches!(
        scanner.scan("https://example.com"),
        Err(PipelineError::ServingUnavailable)
    ));
}
