//! twotube command-line interface.
//!
//! Runs coincidence extraction over the orientation × energy grid and writes
//! per-configuration feature tables, histograms and a summary.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use twotube_algorithms::{
    delta_time_histogram, energy_histogram, extract_runs, ExtractionAlgorithm, Histogram1D,
    RunFeatures,
};
use twotube_core::{extract, EventFeatureTable, HitTable};
use twotube_io::{
    write_summary_json, AnalysisLayout, FeatureFileWriter, LabeledSubset, RunFileReader, RunKey,
    RunSummary,
};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    TwotubeIo(#[from] twotube_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] twotube_core::Error),

    #[error("{failed} of {total} runs failed")]
    RunsFailed { failed: usize, total: usize },
}

/// Extraction implementation selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Bulk masking over the whole run (default)
    Bulk,
    /// Per-event reference implementation
    Scalar,
}

impl From<Algorithm> for ExtractionAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Bulk => ExtractionAlgorithm::Bulk,
            Algorithm::Scalar => ExtractionAlgorithm::Scalar,
        }
    }
}

/// Feature table output format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Bin,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Bin => "bin",
        }
    }
}

/// Coincidence analysis for two-detector simulations.
#[derive(Parser)]
#[command(name = "twotube")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Grid overrides applied on top of the layout file.
#[derive(Args)]
struct LayoutArgs {
    /// Layout configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the run files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Relative orientations in degrees (comma separated)
    #[arg(long, value_delimiter = ',')]
    orientations: Option<Vec<u32>>,

    /// Source energies in keV (comma separated)
    #[arg(long, value_delimiter = ',')]
    energies: Option<Vec<u32>>,

    /// Subset labels to concatenate, in order (comma separated)
    #[arg(long, value_delimiter = ',')]
    subsets: Option<Vec<String>>,

    /// First detector of interest
    #[arg(long)]
    detector_a: Option<i32>,

    /// Second detector of interest
    #[arg(long)]
    detector_b: Option<i32>,

    /// Skip timing features
    #[arg(long)]
    energy_only: bool,
}

impl LayoutArgs {
    fn resolve(self) -> Result<AnalysisLayout> {
        let mut layout = match &self.config {
            Some(path) => AnalysisLayout::from_file(path)?,
            None => AnalysisLayout::default(),
        };

        if let Some(dir) = self.data_dir {
            layout.data_dir = dir;
        }
        if let Some(orientations) = self.orientations {
            layout.orientations_deg = orientations;
        }
        if let Some(energies) = self.energies {
            layout.source_energies_kev = energies;
        }
        if let Some(subsets) = self.subsets {
            layout.subset_labels = subsets;
        }
        if let Some(a) = self.detector_a {
            layout.detectors[0] = a;
        }
        if let Some(b) = self.detector_b {
            layout.detectors[1] = b;
        }
        if self.energy_only {
            layout.with_timing = false;
        }

        layout.validate()?;
        Ok(layout)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract coincidence features for every configuration of the grid
    Process {
        #[command(flatten)]
        layout: LayoutArgs,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Extraction implementation
        #[arg(short, long, value_enum, default_value = "bulk")]
        algorithm: Algorithm,

        /// Feature table format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,
    },

    /// Show subsets, event counts and coincidences of a run file
    Info {
        /// Input run file
        input: PathBuf,

        /// First detector of interest
        #[arg(long, default_value = "0")]
        detector_a: i32,

        /// Second detector of interest
        #[arg(long, default_value = "1")]
        detector_b: i32,
    },
}

/// Identity of one loaded run, carried through parallel extraction.
struct LoadedRun {
    key: RunKey,
    subsets: Vec<String>,
    events: usize,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli.command) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Process {
            layout,
            output,
            algorithm,
            format,
        } => process(&layout.resolve()?, &output, algorithm.into(), format),
        Commands::Info {
            input,
            detector_a,
            detector_b,
        } => show_info(&input, detector_a, detector_b),
    }
}

fn process(
    layout: &AnalysisLayout,
    output: &Path,
    algorithm: ExtractionAlgorithm,
    format: OutputFormat,
) -> Result<()> {
    // Processing pipeline:
    // 1. Locate run files for every grid cell (missing files are skipped)
    // 2. Load the selected subsets of each file
    // 3. Extract and concatenate features per run, runs in parallel
    // 4. Write feature tables, histograms and the summary
    let start = Instant::now();
    let keys = layout.run_keys();
    debug!("Layout: {:?}", layout);
    info!(
        "Processing {} configurations with {:?} extraction",
        keys.len(),
        algorithm
    );

    fs::create_dir_all(output)?;

    let located: Vec<(RunKey, PathBuf)> = keys
        .into_iter()
        .filter_map(|key| match layout.locate(key) {
            Some(path) => Some((key, path)),
            None => {
                warn!(
                    "File not found: {}. Skipping this configuration.",
                    layout.path_for(key).display()
                );
                None
            }
        })
        .collect();

    let loaded: Vec<(RunKey, twotube_io::Result<Vec<LabeledSubset>>)> = located
        .par_iter()
        .map(|(key, path)| (*key, load_subsets(path, &layout.subset_labels)))
        .collect();

    let mut failed = 0usize;
    let mut runs = Vec::with_capacity(loaded.len());
    for (key, subsets) in loaded {
        match subsets {
            Ok(subsets) => {
                let labels = subsets.iter().map(|s| s.label.clone()).collect();
                let tables: Vec<HitTable> = subsets.into_iter().map(|s| s.table).collect();
                let events = tables.iter().map(HitTable::num_events).sum();
                runs.push((
                    LoadedRun {
                        key,
                        subsets: labels,
                        events,
                    },
                    tables,
                ));
            }
            Err(err) => {
                error!("{key}: {err}");
                failed += 1;
            }
        }
    }

    let extractor = algorithm.extractor(layout.extraction_config());
    let results = extract_runs(extractor.as_ref(), runs);

    let mut summaries = Vec::with_capacity(results.len());
    for RunFeatures { key: run, features } in results {
        let features = match features {
            Ok(features) => features,
            Err(err) => {
                error!("{}: {err}", run.key);
                failed += 1;
                continue;
            }
        };

        write_run_outputs(output, run.key, &features, format)?;
        println!(
            "{}, number of coincidence: {} ({} events, subsets: {})",
            run.key,
            features.len(),
            run.events,
            run.subsets.join(", ")
        );

        summaries.push(RunSummary {
            key: run.key,
            subsets: run.subsets,
            events: run.events,
            coincidences: features.len(),
        });
    }

    let summary_path = output.join("summary.json");
    write_summary_json(&summary_path, &summaries)?;
    info!("Summary written to: {}", summary_path.display());

    println!(
        "Processed {} configurations in {:.2}s",
        summaries.len(),
        start.elapsed().as_secs_f64()
    );

    let total = located.len();
    if failed > 0 {
        return Err(CliError::RunsFailed { failed, total });
    }
    Ok(())
}

fn load_subsets(path: &Path, labels: &[String]) -> twotube_io::Result<Vec<LabeledSubset>> {
    info!("Processing file: {}", path.display());
    let reader = RunFileReader::open(path)?;
    if labels.is_empty() {
        reader.read_all()
    } else {
        reader.read_subsets(labels)
    }
}

fn write_run_outputs(
    output: &Path,
    key: RunKey,
    features: &EventFeatureTable,
    format: OutputFormat,
) -> Result<()> {
    let tag = key.tag();

    let features_path = output.join(format!("features_{}.{}", tag, format.extension()));
    let mut writer = FeatureFileWriter::create(&features_path)?;
    match format {
        OutputFormat::Csv => writer.write_features_csv(features, true)?,
        OutputFormat::Bin => writer.write_features_binary(features)?,
    }
    debug!("Wrote {}", features_path.display());

    let mut energy_a = energy_histogram(key.source_energy_kev)?;
    energy_a.fill_all(features.sum_energy_a());
    write_histogram(&output.join(format!("energy_a_{tag}.csv")), &energy_a)?;

    let mut energy_b = energy_histogram(key.source_energy_kev)?;
    energy_b.fill_all(features.sum_energy_b());
    write_histogram(&output.join(format!("energy_b_{tag}.csv")), &energy_b)?;

    if let Some(delta_time) = features.delta_time() {
        let mut histogram = delta_time_histogram();
        histogram.fill_all(delta_time);
        write_histogram(&output.join(format!("delta_time_{tag}.csv")), &histogram)?;
    }

    Ok(())
}

fn write_histogram(path: &Path, histogram: &Histogram1D) -> Result<()> {
    let mut writer = FeatureFileWriter::create(path)?;
    writer.write_histogram_csv(histogram)?;
    Ok(())
}

fn show_info(input: &Path, detector_a: i32, detector_b: i32) -> Result<()> {
    let reader = RunFileReader::open(input)?;
    let file_size = reader.file_size();

    println!("File: {}", input.display());
    println!(
        "Size: {} bytes ({:.2} MB)",
        file_size,
        file_size as f64 / 1_000_000.0
    );
    println!("Subsets: {}", reader.subset_labels().len());

    for subset in reader.read_all()? {
        let features = extract(&subset.table, detector_a, detector_b, false)?;
        println!(
            "  {:<12} events: {:<8} hits: {:<10} coincidences ({}, {}): {}",
            subset.label,
            subset.table.num_events(),
            subset.table.num_hits(),
            detector_a,
            detector_b,
            features.len()
        );
    }

    Ok(())
}
