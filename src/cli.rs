//! Command-line front end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::info;

use crate::categorize::{group_baskets, Categorizer};
use crate::config::{EmptyTransactionPolicy, Metric, MiningConfig};
use crate::membership::Representation;
use crate::pipeline::{mine, MiningReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// JSON array of arrays of item names.
    Baskets,
    /// JSON array of `{"key": ..., "item": ...}` objects grouped by key.
    Records,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "rulemine", author, version, about = "Mine frequent itemsets and association rules from basket data", long_about = None)]
pub struct Args {
    /// JSON input file
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = InputFormat::Baskets)]
    pub format: InputFormat,

    /// TOML config file with optional [mining] and [categories] tables
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub min_support: Option<f64>,

    #[arg(long)]
    pub min_threshold: Option<f64>,

    /// support, confidence, lift, leverage or conviction
    #[arg(long)]
    pub metric: Option<Metric>,

    #[arg(long)]
    pub max_len: Option<usize>,

    /// auto, dense or sparse
    #[arg(long)]
    pub representation: Option<Representation>,

    /// Count empty baskets in the support denominator instead of failing
    #[arg(long)]
    pub keep_empty: bool,

    /// Report only the N highest-ranked rules
    #[arg(long)]
    pub top: Option<usize>,
}

/// `[mining]` table; every key may also come from a flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiningOverrides {
    pub min_support: Option<f64>,
    pub min_threshold: Option<f64>,
    pub metric: Option<Metric>,
    pub max_len: Option<usize>,
    pub representation: Option<Representation>,
    pub empty_transactions: Option<EmptyTransactionPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mining: MiningOverrides,
    pub categories: Option<Categorizer>,
}

#[derive(Debug, Deserialize)]
struct Record {
    key: String,
    item: String,
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

/// Flags take precedence over the config file.
pub fn resolve_config(args: &Args, file: &MiningOverrides) -> Result<MiningConfig> {
    let min_support = args
        .min_support
        .or(file.min_support)
        .context("min_support is required (--min-support or [mining] min_support)")?;
    let min_threshold = args
        .min_threshold
        .or(file.min_threshold)
        .context("min_threshold is required (--min-threshold or [mining] min_threshold)")?;

    let mut config = MiningConfig::new(min_support, min_threshold)
        .with_metric(args.metric.or(file.metric).unwrap_or_default())
        .with_representation(args.representation.or(file.representation).unwrap_or_default());
    if let Some(max_len) = args.max_len.or(file.max_len) {
        config = config.with_max_len(max_len);
    }
    let policy = if args.keep_empty {
        EmptyTransactionPolicy::Keep
    } else {
        file.empty_transactions.unwrap_or_default()
    };
    Ok(config.with_empty_transactions(policy))
}

pub fn read_transactions(
    path: &Path,
    format: InputFormat,
    categorizer: Option<&Categorizer>,
) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    let label = |name: String| match categorizer {
        Some(c) => c.categorize(&name).to_string(),
        None => name,
    };
    let baskets = match format {
        InputFormat::Baskets => {
            let raw: Vec<Vec<String>> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of baskets", path.display()))?;
            raw.into_iter()
                .map(|basket| basket.into_iter().map(label).collect())
                .collect()
        }
        InputFormat::Records => {
            let records: Vec<Record> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
            group_baskets(records.into_iter().map(|r| (r.key, label(r.item))))
        }
    };
    Ok(baskets)
}

pub fn run(args: &Args) -> Result<MiningReport<String>> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let config = resolve_config(args, &file.mining)?;
    let transactions = read_transactions(&args.input, args.format, file.categories.as_ref())?;
    info!(baskets = transactions.len(), input = %args.input.display(), "loaded transactions");

    let mut report = mine(transactions, &config)?;
    if let Some(n) = args.top {
        report.truncate_rules(n);
    }
    Ok(report)
}

pub fn write_report<W: Write>(mut out: W, report: &MiningReport<String>) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, report).context("failed to serialize report")?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["rulemine"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    const BASKETS: &str = r#"[["A","B"],["A","B","C"],["A","B"],["A","C"],["B","C"]]"#;

    #[test]
    fn mines_baskets_from_flags() {
        let input = write_temp(BASKETS);
        let path = input.path().to_str().unwrap();
        let report = run(&args(&["-i", path, "--min-support", "0.4", "--min-threshold", "0.9"])).unwrap();
        assert_eq!(report.n_transactions, 5);
        assert_eq!(report.frequent_itemsets.len(), 6);
        assert_eq!(report.rules.len(), 2);

        let mut out = Vec::new();
        write_report(&mut out, &report).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["rules"][0]["antecedent"], serde_json::json!(["A"]));
        assert_eq!(json["rules"][0]["consequent"], serde_json::json!(["B"]));
        assert!(json["rules"][0]["lift"].as_f64().is_some());
    }

    #[test]
    fn config_file_supplies_settings_and_categories() {
        let input = write_temp(
            r#"[
                {"key": "c1-2024-01", "item": "Fanta Naranja"},
                {"key": "c1-2024-01", "item": "Sprite Lata"},
                {"key": "c2-2024-01", "item": "FANTA uva"},
                {"key": "c2-2024-01", "item": "Sprite 2L"},
                {"key": "c3-2024-01", "item": "Papas"}
            ]"#,
        );
        let config = write_temp(
            r#"
            [mining]
            min_support = 0.5
            min_threshold = 0.5
            metric = "confidence"

            [categories]
            fallback = "Otros"

            [[categories.rules]]
            category = "Fanta"
            patterns = ["fanta"]

            [[categories.rules]]
            category = "Sprite"
            patterns = ["sprite"]
            "#,
        );
        let report = run(&args(&[
            "-i",
            input.path().to_str().unwrap(),
            "--format",
            "records",
            "-c",
            config.path().to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(report.n_transactions, 3);
        assert_eq!(report.n_items, 3);
        assert_eq!(report.rules.len(), 2);
        assert_eq!(report.rules[0].antecedent.items(), &["Fanta".to_string()]);
    }

    #[test]
    fn flags_override_file_and_top_truncates() {
        let input = write_temp(BASKETS);
        let config = write_temp("[mining]\nmin_support = 0.9\nmin_threshold = 5.0\n");
        let report = run(&args(&[
            "-i",
            input.path().to_str().unwrap(),
            "-c",
            config.path().to_str().unwrap(),
            "--min-support",
            "0.2",
            "--min-threshold",
            "0",
            "--metric",
            "confidence",
            "--top",
            "3",
        ]))
        .unwrap();
        assert_eq!(report.rules.len(), 3);
    }

    #[test]
    fn missing_min_support_is_reported() {
        let input = write_temp(BASKETS);
        let err = run(&args(&["-i", input.path().to_str().unwrap(), "--min-threshold", "1"])).unwrap_err();
        assert!(err.to_string().contains("min_support is required"));
    }

    #[test]
    fn empty_basket_needs_keep_empty() {
        let input = write_temp(r#"[["A"],[]]"#);
        let path = input.path().to_str().unwrap();
        let err = run(&args(&["-i", path, "--min-support", "0.5", "--min-threshold", "0"])).unwrap_err();
        assert!(err.to_string().contains("transaction 1 is empty"));

        let report = run(&args(&[
            "-i",
            path,
            "--min-support",
            "0.5",
            "--min-threshold",
            "0",
            "--keep-empty",
        ]))
        .unwrap();
        assert_eq!(report.n_transactions, 2);
    }

    #[test]
    fn unknown_metric_flag_is_rejected_by_parser() {
        let parsed = Args::try_parse_from(["rulemine", "-i", "x.json", "--metric", "gain"]);
        assert!(parsed.is_err());
    }
}
