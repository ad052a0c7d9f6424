//! Bitumen mix analysis command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a workbook with the default profile
//! mixvol analyze data/mix.xlsx --gb 1.03 --gsb 2.65
//!
//! # Native workbook charts, PNGs written next to the report
//! mixvol analyze data/mix.csv --gb 1.03 --gsb 2.65 \
//!     --profile gsb-bitumen --output out/report.xlsx --charts-dir out/charts
//!
//! # List built-in profiles
//! mixvol profiles
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: info)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mixvol::config::AnalysisConfig;
use mixvol::io::loaders::MixTableLoader;
use mixvol::services::analysis::{MixAnalyzer, RunOutput};

#[derive(Debug, Parser)]
#[command(name = "mixvol", version, about = "Volumetric analysis of bitumen mix designs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a mix table and write the xlsx report
    Analyze {
        /// Input table (.xlsx, .xlsm or .csv)
        input: PathBuf,

        /// Specific gravity of the binder
        #[arg(long)]
        gb: f64,

        /// Bulk specific gravity of the aggregate
        #[arg(long)]
        gsb: f64,

        /// TOML configuration file
        #[arg(long, conflicts_with = "profile")]
        config: Option<PathBuf>,

        /// Built-in profile (see `mixvol profiles`)
        #[arg(long)]
        profile: Option<String>,

        /// Worksheet to read (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Report path (default: the configured report file name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write chart PNGs into this directory
        #[arg(long)]
        charts_dir: Option<PathBuf>,

        /// Print the result table and summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List built-in analysis profiles
    Profiles,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Profiles => {
            for (name, description) in AnalysisConfig::profiles() {
                println!("{:<12} {}", name, description);
            }
            Ok(())
        }
        Command::Analyze {
            input,
            gb,
            gsb,
            config,
            profile,
            sheet,
            output,
            charts_dir,
            json,
        } => {
            let analyzer = build_analyzer(config.as_deref(), profile.as_deref())?;

            let loaded = MixTableLoader::load_from_file(&input, sheet.as_deref())
                .with_context(|| format!("Failed to load {}", input.display()))?;
            info!("Loaded {} row(s) from {}", loaded.num_rows, loaded.source_name);

            let run = analyzer
                .run_loaded(loaded, gb, gsb)
                .context("Analysis failed")?;

            let report_path =
                output.unwrap_or_else(|| PathBuf::from(&run.report.file_name));
            write_file(&report_path, &run.report.bytes)?;
            info!("Report written to {}", report_path.display());

            if let Some(dir) = charts_dir {
                write_charts(&dir, &run)?;
            }

            if json {
                print_json(&run)?;
            } else {
                print_summary(&run);
            }
            Ok(())
        }
    }
}

fn build_analyzer(config: Option<&Path>, profile: Option<&str>) -> Result<MixAnalyzer> {
    if let Some(path) = config {
        let config = AnalysisConfig::from_file(path)?;
        return Ok(MixAnalyzer::new(config)?);
    }
    if let Some(name) = profile {
        return Ok(MixAnalyzer::with_profile(name)?);
    }
    match AnalysisConfig::from_default_location()? {
        Some(config) => Ok(MixAnalyzer::new(config)?),
        None => Ok(MixAnalyzer::default()),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_charts(dir: &Path, run: &RunOutput) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    for chart in &run.charts {
        let path = dir.join(chart.file_name());
        write_file(&path, &chart.png)?;
    }
    info!("{} chart(s) written to {}", run.charts.len(), dir.display());
    Ok(())
}

fn print_json(run: &RunOutput) -> Result<()> {
    let payload = serde_json::json!({
        "columns": run.columns(),
        "records": run.table_records()?,
        "summary": run.summary,
        "warnings": run.validation.warnings,
        "charts": run.charts,
        "report": run.report,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_summary(run: &RunOutput) {
    println!(
        "{} sample(s), {} within all limits",
        run.summary.total_samples, run.summary.all_pass
    );
    for property in &run.summary.properties {
        println!(
            "  {:<28} pass {:>3}  fail {:>3}  undefined {:>3}",
            property.rule,
            property.pass,
            property.fail,
            property.undefined
        );
    }
    for warning in &run.validation.warnings {
        println!("  warning: {}", warning);
    }
}
