//! CLI Commands - train / detect / inspect
//!
//! Thin wrappers: read files, hand batches to the `Detector`, write results.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::constants;
use crate::logic::dataset::{export_csv, export_json, load_csv, ConfusionMatrix, ExtraColumn};
use crate::logic::features::MinMaxScaler;
use crate::logic::store;
use crate::logic::{Architecture, CalibrationPolicy, Detector, DetectorConfig, TrainConfig};

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = constants::APP_NAME)]
#[command(version = constants::APP_VERSION)]
#[command(about = "Reconstruction-based anomaly detection for service metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchKind {
    Dense,
    Lstm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train on normal metric rows and save the model
    Train {
        /// Input CSV with a header row
        #[arg(short, long)]
        input: PathBuf,

        /// Feature columns (default: every numeric column)
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Use only the first N rows
        #[arg(long)]
        rows: Option<usize>,

        /// Model directory (default: ANOMALY_MODEL_DIR or the user data dir)
        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        /// Default: ANOMALY_EPOCHS or 20
        #[arg(long, default_value_t = constants::get_epochs())]
        epochs: usize,

        /// Default: ANOMALY_BATCH_SIZE or 8
        #[arg(long, default_value_t = constants::get_batch_size())]
        batch_size: usize,

        /// Default: ANOMALY_LEARNING_RATE or 0.001
        #[arg(long, default_value_t = constants::get_learning_rate())]
        learning_rate: f32,

        /// Expected fraction of normal rows (default: ANOMALY_NEGATIVE_RATIO or 0.9)
        #[arg(long, default_value_t = constants::get_negative_ratio())]
        ratio: f32,

        /// Use `mean + k * std` instead of the quantile
        #[arg(long)]
        mean_std: Option<f32>,

        #[arg(long, value_enum, default_value = "dense")]
        arch: ArchKind,

        /// Dense encoder widths, or the single LSTM width
        #[arg(long, value_delimiter = ',')]
        hidden: Option<Vec<usize>>,

        /// Rows per LSTM window
        #[arg(long, default_value_t = constants::DEFAULT_WINDOW)]
        window: usize,

        #[arg(long, default_value_t = constants::DEFAULT_VALIDATION_SPLIT)]
        validation_split: f32,

        #[arg(long, default_value_t = constants::DEFAULT_SEED)]
        seed: u64,
    },

    /// Score rows against a saved model
    Detect {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        #[arg(long)]
        rows: Option<usize>,

        /// Ground-truth column; prints precision / recall / F1
        #[arg(long)]
        labels: Option<String>,

        /// Raw column copied into the CSV export next to the scores
        #[arg(long)]
        extra: Option<String>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: JSON on stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a saved model's manifest
    Inspect {
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },
}

fn model_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(store::get_default_model_dir)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// HANDLERS
// ============================================================================

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Train {
            input,
            columns,
            rows,
            model_dir: dir,
            epochs,
            batch_size,
            learning_rate,
            ratio,
            mean_std,
            arch,
            hidden,
            window,
            validation_split,
            seed,
        } => {
            let architecture = match arch {
                ArchKind::Dense => Architecture::Dense {
                    hidden_sizes: hidden
                        .unwrap_or_else(|| constants::DEFAULT_HIDDEN_SIZES.to_vec()),
                    activation: Default::default(),
                },
                ArchKind::Lstm => Architecture::Recurrent {
                    hidden_size: hidden
                        .and_then(|h| h.first().copied())
                        .unwrap_or(constants::DEFAULT_RECURRENT_HIDDEN),
                    window,
                },
            };
            let policy = match mean_std {
                Some(k) => CalibrationPolicy::MeanStd { k },
                None => CalibrationPolicy::Quantile,
            };
            let train = TrainConfig {
                epochs,
                learning_rate,
                batch_size,
                validation_split,
                seed,
            };
            cmd_train(
                &input,
                columns.as_deref(),
                rows,
                &model_dir(dir),
                architecture,
                policy,
                ratio,
                &train,
            )
        }
        Command::Detect {
            input,
            model_dir: dir,
            rows,
            labels,
            extra,
            format,
            output,
        } => cmd_detect(
            &input,
            &model_dir(dir),
            rows,
            labels.as_deref(),
            extra.as_deref(),
            format,
            output.as_deref(),
        ),
        Command::Inspect { model_dir: dir } => {
            let dir = model_dir(dir);
            let manifest = store::read_manifest(&dir)
                .with_context(|| format!("reading model at {}", dir.display()))?;
            print_json(&manifest)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_train(
    input: &Path,
    columns: Option<&[String]>,
    rows: Option<usize>,
    dir: &Path,
    architecture: Architecture,
    policy: CalibrationPolicy,
    ratio: f32,
    train: &TrainConfig,
) -> anyhow::Result<()> {
    let mut table = load_csv(input, columns, None)
        .with_context(|| format!("loading {}", input.display()))?;
    if let Some(n) = rows {
        table.truncate(n);
    }
    if table.is_empty() {
        bail!("{} has no data rows", input.display());
    }

    let (scaler, scaled) = MinMaxScaler::fit_transform(&table.rows)?;

    let config = DetectorConfig::new(table.layout.dimensionality())
        .with_architecture(architecture)
        .with_policy(policy)
        .with_negative_ratio(ratio);
    let mut detector = Detector::new(config)?.with_layout(table.layout)?;
    detector.set_scaler(scaler)?;

    let report = detector.fit(&scaled, train)?;
    detector
        .save(dir)
        .with_context(|| format!("saving model to {}", dir.display()))?;

    print_json(&report)
}

#[derive(Serialize)]
struct Evaluation {
    confusion: ConfusionMatrix,
    precision: f32,
    recall: f32,
    f1: f32,
    accuracy: f32,
}

fn cmd_detect(
    input: &Path,
    dir: &Path,
    rows: Option<usize>,
    labels: Option<&str>,
    extra: Option<&str>,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let detector =
        Detector::load(dir).with_context(|| format!("loading model from {}", dir.display()))?;

    // Columns in the order the model was trained on
    let columns = detector.layout().names.clone();
    let mut table = load_csv(input, Some(columns.as_slice()), labels)
        .with_context(|| format!("loading {}", input.display()))?;
    if let Some(n) = rows {
        table.truncate(n);
    }

    let batch = match detector.scaler() {
        Some(scaler) => MinMaxScaler::transform(&table.rows, scaler)?,
        None => table.rows.clone(),
    };
    let report = detector.score(&batch)?;
    log::info!(
        "{} of {} rows above threshold {:.6}",
        report.anomaly_count(),
        report.records.len(),
        report.threshold
    );

    if let Some(truth) = &table.labels {
        let confusion = ConfusionMatrix::evaluate(&report.records, truth)?;
        let evaluation = Evaluation {
            confusion,
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            accuracy: confusion.accuracy(),
        };
        eprintln!("{}", serde_json::to_string_pretty(&evaluation)?);
    }

    let extra = match extra {
        Some(name) => {
            let names = vec![name.to_string()];
            let mut column = load_csv(input, Some(names.as_slice()), None)?;
            if let Some(n) = rows {
                column.truncate(n);
            }
            Some(ExtraColumn {
                name: name.to_string(),
                values: column.rows.into_iter().map(|r| r[0]).collect(),
            })
        }
        None => None,
    };

    match (format, output) {
        (OutputFormat::Json, Some(path)) => export_json(&report, path)?,
        (OutputFormat::Csv, Some(path)) => export_csv(&report, path, extra.as_ref())?,
        (OutputFormat::Json, None) => print_json(&report)?,
        (OutputFormat::Csv, None) => bail!("--format csv needs --output"),
    }
    Ok(())
}
