//! ipolens CLI: IPO return study commands.
//!
//! Commands:
//! - `inspect`: show the columns and first rows of input files
//! - `analyze`: run the study, print the summary, write study.json and the processed CSV
//! - `charts`: run the study and write the SVG charts
//! - `report`: run the study and write every artifact plus the chosen documents
//! - `verify`: check a finished output directory
//! - `synth`: write a seeded synthetic dataset and matching config

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ipolens_runner::config::StudyConfig;
use ipolens_runner::data_loader::inspect_table;
use ipolens_runner::reporting::{ArtifactManager, ArtifactPaths, ReportFormat};
use ipolens_runner::{generate_dataset, print_study, run_study, verify_artifacts};

const DEFAULT_CONFIG: &str = "study.toml";

#[derive(Parser)]
#[command(
    name = "ipolens",
    version,
    about = "ipolens: SPAC vs traditional IPO returns and index inclusion study"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the columns and first rows of input files.
    Inspect {
        /// Study config (TOML); its inputs are inspected when no files are given.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV or spreadsheet files to inspect.
        files: Vec<PathBuf>,

        /// Number of data rows to show.
        #[arg(long, default_value_t = 1)]
        rows: usize,
    },
    /// Run the study, print the summary and write study.json and the processed CSV.
    Analyze {
        /// Study config (TOML). Defaults to ./study.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory, overriding the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the study and write the SVG charts.
    Charts {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the full pipeline: exports, charts and documents.
    Report {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Document formats: md, deck, docx, pdf or all. Repeat or comma-separate.
        /// Defaults to the config's `output.formats`.
        #[arg(long, value_delimiter = ',')]
        format: Vec<String>,
    },
    /// Check the artifacts in an output directory.
    Verify {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory. Defaults to the config's output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write a synthetic dataset with a matching study.toml.
    Synth {
        #[arg(long, default_value_t = 1000)]
        rows: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "demo")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { config, files, rows } => run_inspect(config, files, rows),
        Commands::Analyze { config, output_dir } => run_analyze(config, output_dir),
        Commands::Charts { config, output_dir } => run_charts(config, output_dir),
        Commands::Report {
            config,
            output_dir,
            format,
        } => run_report(config, output_dir, &format),
        Commands::Verify { config, output_dir } => run_verify(config, output_dir),
        Commands::Synth { rows, seed, out } => run_synth(rows, seed, &out),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Explicit config, else ./study.toml, else defaults.
fn load_config(path: Option<PathBuf>, out: Option<PathBuf>) -> Result<StudyConfig> {
    let mut config = match path {
        Some(p) => StudyConfig::from_file(&p)
            .with_context(|| format!("failed to load config {}", p.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!(path = DEFAULT_CONFIG, "using config from working directory");
            StudyConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => {
            warn!("no config given; using default input names");
            StudyConfig::default()
        }
    };
    if let Some(out) = out {
        config.output.dir = out;
    }
    Ok(config)
}

fn parse_formats(raw: &[String]) -> Result<Vec<ReportFormat>> {
    let mut formats = Vec::new();
    for part in raw.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if part.eq_ignore_ascii_case("all") {
            return Ok(ReportFormat::ALL.to_vec());
        }
        let format: ReportFormat = part.parse().map_err(anyhow::Error::msg)?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        bail!("no report format given");
    }
    Ok(formats)
}

/// `--format` replaces the configured formats only when given.
fn apply_formats(config: &mut StudyConfig, raw: &[String]) -> Result<()> {
    if !raw.is_empty() {
        config.output.formats = parse_formats(raw)?;
    }
    Ok(())
}

fn run_inspect(config: Option<PathBuf>, files: Vec<PathBuf>, rows: usize) -> Result<()> {
    let files = if files.is_empty() {
        let inputs = load_config(config, None)?.inputs;
        vec![inputs.ipos, inputs.spacs, inputs.sp500, inputs.russell1000]
    } else {
        files
    };

    let mut failed = 0;
    for path in &files {
        match inspect_table(path, rows) {
            Ok(preview) => {
                println!();
                println!("=== {} ===", preview.path.display());
                println!("Columns ({}):", preview.columns.len());
                for (i, column) in preview.columns.iter().enumerate() {
                    println!("  {:>3}  {column}", i + 1);
                }
                if preview.rows.is_empty() {
                    println!("(no data rows)");
                    continue;
                }
                println!("First {} row(s):", preview.rows.len());
                for row in &preview.rows {
                    println!("  {}", row.join(" | "));
                }
            }
            Err(err) => {
                failed += 1;
                println!();
                println!("=== {} ===", path.display());
                println!("ERROR: {err}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} input(s) could not be read", files.len());
    }
    Ok(())
}

fn run_analyze(config: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(config, output_dir)?;
    let study = run_study(&config)?;
    print_study(&study.result);

    let manager = ArtifactManager::new(&config.output.dir)?;
    let json = manager.write_study_json(&study.result)?;
    println!("Study JSON:     {}", json.display());
    if config.output.processed_csv {
        let csv = manager.write_processed_csv(&study.rows)?;
        println!("Processed CSV:  {}", csv.display());
    }
    Ok(())
}

fn run_charts(config: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(config, output_dir)?;
    let study = run_study(&config)?;
    let manager = ArtifactManager::new(&config.output.dir)?;
    let charts = manager.write_charts(&study, &config.analysis)?;
    println!("Wrote {} chart(s):", charts.len());
    for chart in &charts {
        println!("  {:<28} {}  {}", chart.name, chart.path.display(), chart.png.display());
    }
    Ok(())
}

fn run_report(config: Option<PathBuf>, output_dir: Option<PathBuf>, format: &[String]) -> Result<()> {
    let mut config = load_config(config, output_dir)?;
    apply_formats(&mut config, format)?;
    let study = run_study(&config)?;
    print_study(&study.result);

    let manager = ArtifactManager::new(&config.output.dir)?;
    let paths = manager.save_all(&study, &config)?;
    print_artifacts(&paths);
    Ok(())
}

fn print_artifacts(paths: &ArtifactPaths) {
    println!("=== Artifacts ===");
    println!("Manifest:       {}", paths.manifest.display());
    println!("Study JSON:     {}", paths.study_json.display());
    if let Some(csv) = &paths.processed_csv {
        println!("Processed CSV:  {}", csv.display());
    }
    println!("Charts:         {}", paths.charts.len());
    for (format, path) in &paths.documents {
        println!("{:<15} {}", format!("{format}:"), path.display());
    }
}

fn run_verify(config: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<()> {
    let dir = match output_dir {
        Some(dir) => dir,
        None => load_config(config, None)?.output.dir,
    };
    let report = verify_artifacts(&dir)?;
    print!("{report}");
    if !report.is_ok() {
        bail!("{} problem(s) in {}", report.problem_count(), dir.display());
    }
    Ok(())
}

fn run_synth(rows: usize, seed: u64, out: &Path) -> Result<()> {
    if rows == 0 {
        bail!("--rows must be at least 1");
    }
    let ds = generate_dataset(rows, seed, out)?;
    println!("Synthetic dataset ({} rows, seed {seed}):", ds.rows);
    println!("  IPOs:          {}", ds.ipos.display());
    println!("  SPACs:         {}", ds.spacs.display());
    println!("  S&P 500:       {}", ds.sp500.display());
    println!("  Russell 1000:  {}", ds.russell1000.display());
    println!("  Config:        {}", ds.config.display());
    println!();
    println!("Next: ipolens report --config {}", ds.config.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn format_lists() {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(parse_formats(&list(&["all"])).unwrap(), ReportFormat::ALL.to_vec());
        assert_eq!(
            parse_formats(&list(&["md", " pdf", "md"])).unwrap(),
            vec![ReportFormat::Markdown, ReportFormat::Pdf]
        );
        assert!(parse_formats(&list(&["pptx"])).is_err());
        assert!(parse_formats(&list(&[" "])).is_err());
    }

    #[test]
    fn report_accepts_repeated_and_comma_formats() {
        let cli = Cli::parse_from(["ipolens", "report", "--format", "md,deck", "--format", "pdf"]);
        match cli.command {
            Commands::Report { format, .. } => assert_eq!(format, vec!["md", "deck", "pdf"]),
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn report_keeps_config_formats_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(&path, "[output]\nformats = [\"pdf\"]\n").unwrap();
        let cfg = path.to_string_lossy().to_string();

        let cli = Cli::parse_from(["ipolens", "report", "--config", cfg.as_str()]);
        let Commands::Report { config, format, .. } = cli.command else {
            panic!("expected report");
        };
        assert!(format.is_empty());
        let mut config = load_config(config, None).unwrap();
        apply_formats(&mut config, &format).unwrap();
        assert_eq!(config.output.formats, vec![ReportFormat::Pdf]);

        apply_formats(&mut config, &["md".to_string()]).unwrap();
        assert_eq!(config.output.formats, vec![ReportFormat::Markdown]);
    }

    #[test]
    fn verbose_flag_counts() {
        let cli = Cli::parse_from(["ipolens", "-vv", "verify", "--output-dir", "out"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Verify { output_dir: Some(_), .. }));
    }
}
