use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use phishguard::config::Config;
use phishguard::ml::{
    validate_url, FeatureExtractor, RiskLevel, ScanResult, TracingSink, TrainingPipeline, UrlScanner,
    Verdict,
};

#[derive(Parser)]
#[command(name = "phishguard")]
#[command(author, version, about = "URL phishing classifier")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train candidate models on a labeled CSV and save the best
    Train {
        /// Labeled dataset (columns: url, label)
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Where to write the model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Seed for balancing, splitting and model fitting
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Classify a URL with the trained model
    Check {
        /// URL to classify (must start with http:// or https://)
        url: String,

        /// Model artifact to load
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the feature vector and risk factors for a URL
    Features {
        /// URL to inspect
        url: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Generate default configuration file
    GenConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1: String,
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Value")]
    value: f64,
}

pub fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Train {
            dataset,
            model,
            seed,
        } => cmd_train(config, dataset, model, seed),
        Commands::Check { url, model, json } => cmd_check(config, url, model, json),
        Commands::Features { url, json } => cmd_features(config, url, json),
        Commands::GenConfig { output } => cmd_gen_config(output),
    }
}

fn cmd_train(
    mut config: Config,
    dataset: Option<PathBuf>,
    model: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<()> {
    if let Some(dataset) = dataset {
        config.paths.dataset = dataset;
    }
    if let Some(model) = model {
        config.paths.model = model;
    }
    if let Some(seed) = seed {
        config.training.seed = seed;
    }

    println!("Training on {}...", config.paths.dataset.display());

    let mut pipeline = TrainingPipeline::new(config);
    let outcome = pipeline.run().context("Training failed")?;
    let report = &outcome.report;

    let stats = &report.dataset;
    println!(
        "Rows: {} read, {} incomplete, {} duplicate, {} skipped; {} per class after balancing",
        stats.total_rows,
        stats.dropped_incomplete,
        stats.duplicates_removed,
        stats.skipped_rows,
        report.balanced_per_class
    );
    println!("Split: {} train / {} test", report.train_size, report.test_size);

    let rows: Vec<CandidateRow> = report
        .candidates
        .iter()
        .map(|c| CandidateRow {
            name: c.name.clone(),
            accuracy: format!("{:.4}", c.metrics.accuracy),
            precision: format!("{:.4}", c.metrics.precision),
            recall: format!("{:.4}", c.metrics.recall),
            f1: format!("{:.4}", c.metrics.f1),
        })
        .collect();
    println!("{}", Table::new(rows));

    println!("{} {}", "Best model:".green().bold(), report.winner);
    if !report.top_features.is_empty() {
        let top: Vec<String> = report
            .top_features
            .iter()
            .map(|(name, weight)| format!("{} ({:.2})", name, weight))
            .collect();
        println!("Top features: {}", top.join(", "));
    }
    println!(
        "Model saved to {}",
        pipeline.config().paths.model.display()
    );

    Ok(())
}

fn cmd_check(mut config: Config, url: String, model: Option<PathBuf>, json: bool) -> Result<()> {
    let url = validate_url(&url)?;
    if let Some(model) = model {
        config.paths.model = model;
    }

    let scanner = UrlScanner::new(FeatureExtractor::new(&config.features), config.thresholds)?;
    scanner
        .reload(&config.paths.model)
        .context("Model not loaded; run `phishguard train` first")?;

    let result = scanner.scan_and_report(url, &TracingSink)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_scan(&result);
    }

    Ok(())
}

fn print_scan(result: &ScanResult) {
    let label = match result.label {
        Verdict::Phishing => result.label.as_str().red().bold(),
        Verdict::Suspicious => result.label.as_str().yellow().bold(),
        Verdict::Legitimate => result.label.as_str().green().bold(),
    };
    let risk = match result.risk_level {
        RiskLevel::High => result.risk_level.as_str().red(),
        RiskLevel::Medium => result.risk_level.as_str().yellow(),
        RiskLevel::Low => result.risk_level.as_str().green(),
    };

    println!("{}", result.url.bold());
    println!("  {:<12} {}", "Verdict:", label);
    println!(
        "  {:<12} {:.2}%",
        "Phishing:",
        result.phishing_probability * 100.0
    );
    println!("  {:<12} {}", "Risk:", risk);

    if result.risk_factors.is_empty() {
        println!("  No risk factors detected");
    } else {
        println!("  Risk factors:");
        for factor in &result.risk_factors {
            println!("    - {}", factor);
        }
    }
}

fn cmd_features(config: Config, url: String, json: bool) -> Result<()> {
    let extractor = FeatureExtractor::new(&config.features);
    let features = extractor.extract(&url);
    let factors = extractor.explain(&url);

    if json {
        let named: serde_json::Map<String, serde_json::Value> = features
            .named()
            .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
            .collect();
        let out = serde_json::json!({
            "url": url,
            "features": named,
            "risk_factors": factors,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let rows: Vec<FeatureRow> = features
        .named()
        .enumerate()
        .map(|(index, (name, value))| FeatureRow {
            index,
            name: name.to_string(),
            value,
        })
        .collect();
    println!("{}", Table::new(rows));

    if factors.is_empty() {
        println!("{}", "No risk factors detected".green());
    } else {
        for factor in &factors {
            println!("{} {}", "!".yellow().bold(), factor);
        }
    }

    Ok(())
}

fn cmd_gen_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &toml_str)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", toml_str);
        }
    }

    Ok(())
}
