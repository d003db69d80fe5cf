//! cellgate command-line interface.
//!
//! Inspects and edits gate tables of a gating project without the viewer.
#![allow(clippy::uninlined_format_args, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::fs;
use std::path::{Path, PathBuf};

use cellgate_core::{GateEvent, GateTable, IntensityHistogram, Session};
use cellgate_io::{CsvGateStorage, ProjectConfig};
use clap::{Parser, Subcommand};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    CellgateIo(#[from] cellgate_io::Error),

    #[error("{0}")]
    Core(#[from] cellgate_core::Error),

    #[error("validation error: {0}")]
    Validation(#[from] cellgate_core::ValidationError),

    #[error("{0}")]
    Usage(String),
}

/// Manual gating of multiplexed tissue image quantifications.
#[derive(Parser)]
#[command(name = "cellgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project file (JSON)
    #[arg(short, long, global = true, default_value = "project.json")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a fresh gate table with every gate unset
    Init {
        /// Output gate CSV (defaults to the project's gates file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a gate table against the project and summarize it
    Check {
        /// Gate CSV
        gates: PathBuf,
    },

    /// Print one gate
    Get {
        /// Gate CSV
        gates: PathBuf,

        #[arg(short, long)]
        sample: String,

        #[arg(short, long)]
        marker: String,
    },

    /// Set one gate and save the table in place
    Set {
        /// Gate CSV
        gates: PathBuf,

        #[arg(short, long)]
        sample: String,

        #[arg(short, long)]
        marker: String,

        /// Gate value; 0 means unset and is refused
        #[arg(short, long, allow_negative_numbers = true)]
        value: f64,
    },

    /// List the cells above a gate
    Positives {
        #[arg(short, long)]
        sample: String,

        #[arg(short, long)]
        marker: String,

        /// Take the threshold from this gate CSV
        #[arg(long, conflicts_with = "threshold", required_unless_present = "threshold")]
        gates: Option<PathBuf>,

        /// Explicit threshold
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<f64>,

        /// Output CSV (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List samples in natural order with their cell counts
    Samples,

    /// Print the intensity histogram of a marker within a sample
    Histogram {
        #[arg(short, long)]
        sample: String,

        #[arg(short, long)]
        marker: String,

        /// Number of bins
        #[arg(short, long, default_value = "20")]
        bins: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ProjectConfig::load(&cli.project)?;
    // Each command reads the gate file it names.
    let mut session = config.open_session_without_gates()?;
    log::debug!("opened project {}", cli.project.display());

    match cli.command {
        Commands::Init { output } => {
            let output = output
                .or_else(|| config.gates.clone())
                .ok_or_else(|| CliError::Usage("no output path and no gates file in project".into()))?;
            let fresh = GateTable::initialize(
                &session.quantification().sample_ids(),
                &session.markers().name_list(),
            );
            cellgate_io::write_gates_file(&output, &fresh)?;
            println!("Wrote {} gates to {}", fresh.len(), output.display());
        }

        Commands::Check { gates } => {
            let table = load_table(&session, &gates)?;
            print_summary(&session, &table);
        }

        Commands::Get {
            gates,
            sample,
            marker,
        } => {
            println!("{}", lookup_gate(&session, &gates, &sample, &marker)?);
        }

        Commands::Set {
            gates,
            sample,
            marker,
            value,
        } => {
            let mut storage = CsvGateStorage;
            let events = [
                GateEvent::LoadRequested(gates),
                GateEvent::SampleChanged(sample),
                GateEvent::MarkerChanged(marker),
                GateEvent::GateAdjusted(value),
                GateEvent::GateCommitted,
            ];
            for event in events {
                match session.dispatch(event, &mut storage) {
                    Ok(outcome) => {
                        if let Some(message) = outcome.notification {
                            println!("{message}");
                        }
                    }
                    Err(err) if err.is_informational() => {
                        println!("{err}");
                        return Ok(());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Commands::Positives {
            sample,
            marker,
            gates,
            threshold,
            output,
        } => {
            let threshold = match (threshold, gates) {
                (Some(t), _) => t,
                (None, Some(path)) => lookup_gate(&session, &path, &sample, &marker)?,
                (None, None) => return Err(CliError::Usage("pass --gates or --threshold".into())),
            };
            let mut storage = CsvGateStorage;
            session.dispatch(GateEvent::SampleChanged(sample.clone()), &mut storage)?;
            session.dispatch(GateEvent::MarkerChanged(marker.clone()), &mut storage)?;
            let cells = session.positive_cells(threshold)?;
            let summary = session.summary(threshold)?;
            let csv = cellgate_io::cells_to_csv(&cells)?;
            match output {
                Some(path) => {
                    fs::write(&path, csv)?;
                    eprintln!(
                        "{}: {} of {} cells above {} written to {}",
                        cellgate_core::plot::points_layer_name(threshold, &sample, &marker),
                        summary.positive,
                        summary.total,
                        threshold,
                        path.display()
                    );
                }
                None => print!("{}", String::from_utf8_lossy(&csv)),
            }
        }

        Commands::Samples => {
            for sample in session.samples() {
                println!(
                    "{}\t{}",
                    sample,
                    session.quantification().cell_count(sample)
                );
            }
        }

        Commands::Histogram {
            sample,
            marker,
            bins,
        } => {
            let mut storage = CsvGateStorage;
            session.dispatch(GateEvent::SampleChanged(sample), &mut storage)?;
            session.dispatch(GateEvent::MarkerChanged(marker), &mut storage)?;
            print_histogram(&session.histogram(bins)?);
        }
    }

    Ok(())
}

/// Reads a gate CSV and checks it against the project's samples and markers.
fn load_table(session: &Session, path: &Path) -> Result<GateTable> {
    let table = cellgate_io::read_gates_file(path)?;
    table.validate_key_space(session.samples(), &session.markers().name_list())?;
    Ok(table)
}

fn lookup_gate(session: &Session, path: &Path, sample: &str, marker: &str) -> Result<f64> {
    Ok(load_table(session, path)?.lookup(sample, marker)?)
}

fn print_summary(session: &Session, table: &GateTable) {
    println!(
        "{} gates ({} samples x {} markers), {} set",
        table.len(),
        session.samples().len(),
        session.markers().len(),
        table.set_count()
    );
    for sample in session.samples() {
        let set = table
            .iter()
            .filter(|r| r.sample_id == *sample && r.is_set())
            .count();
        println!("  {}: {}/{} set", sample, set, session.markers().len());
    }
}

const BAR_WIDTH: f64 = 40.0;

#[allow(clippy::cast_precision_loss)]
fn print_histogram(hist: &IntensityHistogram) {
    let peak = hist.counts().iter().copied().max().unwrap_or(0).max(1) as f64;
    for (center, &count) in hist.bin_centers().iter().zip(hist.counts()) {
        let width = (count as f64 / peak * BAR_WIDTH).round() as usize;
        println!("{:>12.2} {:>8} {}", center, count, "#".repeat(width));
    }
    println!("{} cells, bin width {:.2}", hist.total(), hist.bin_width());
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clap::CommandFactory;
    use tempfile::TempDir;

    /// Project with samples S1 and S2, markers DNA1 and CD3.
    fn project(dir: &Path) -> PathBuf {
        fs::write(
            dir.join("quant.csv"),
            "sample_id,DNA1,CD3,X_centroid,Y_centroid\nS1,1,5,0,0\nS1,2,50,1,1\nS2,3,20,2,2\n",
        )
        .unwrap();
        fs::write(dir.join("markers.csv"), "marker_name\nDNA1\nCD3\n").unwrap();
        let path = dir.join("project.json");
        fs::write(
            &path,
            r#"{"quantification": "quant.csv", "markers": "markers.csv", "gates": "gates.csv"}"#,
        )
        .unwrap();
        path
    }

    fn run_args(project: &Path, args: &[&str]) -> Result<()> {
        let head = ["cellgate", "--project", project.to_str().unwrap()];
        run(Cli::try_parse_from(head.iter().chain(args)).unwrap())
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positives_needs_a_threshold_source() {
        let parsed = Cli::try_parse_from(["cellgate", "positives", "-s", "S1", "-m", "CD3"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from([
            "cellgate", "positives", "-s", "S1", "-m", "CD3", "-t", "-1.5",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_init_set_get() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path());
        let gates = dir.path().join("gates.csv");
        let gates_arg = gates.to_str().unwrap();

        run_args(&project, &["init"]).unwrap();
        assert_eq!(cellgate_io::read_gates_file(&gates).unwrap().len(), 4);

        run_args(&project, &["set", gates_arg, "-s", "S1", "-m", "CD3", "-v", "12.5"]).unwrap();
        let session = ProjectConfig::load(&project).unwrap().open_session().unwrap();
        assert_relative_eq!(lookup_gate(&session, &gates, "S1", "CD3").unwrap(), 12.5);
        run_args(&project, &["get", gates_arg, "-s", "S1", "-m", "CD3"]).unwrap();
        run_args(&project, &["check", gates_arg]).unwrap();

        let out = dir.path().join("pos.csv");
        run_args(
            &project,
            &["positives", "-s", "S1", "-m", "CD3", "--gates", gates_arg, "-o", out.to_str().unwrap()],
        )
        .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 2);
        run_args(&project, &["histogram", "-s", "S1", "-m", "CD3", "-b", "4"]).unwrap();
    }

    #[test]
    fn test_set_unset_value_leaves_file() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path());
        let gates = dir.path().join("gates.csv");
        run_args(&project, &["init"]).unwrap();
        let before = fs::read(&gates).unwrap();

        run_args(
            &project,
            &["set", gates.to_str().unwrap(), "-s", "S1", "-m", "CD3", "-v", "0"],
        )
        .unwrap();
        assert_eq!(fs::read(&gates).unwrap(), before);
    }

    #[test]
    fn test_check_rejects_mismatching_file() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path());
        let other = dir.path().join("other.csv");
        fs::write(&other, "sample_id,marker_id,gate_value\nS1,DNA1,1\nS1,CD3,2\n").unwrap();

        let err = run_args(&project, &["check", other.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn test_stale_project_gates_do_not_block_commands() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path());
        let gates = dir.path().join("gates.csv");
        fs::write(&gates, "sample_id,marker_id,gate_value\nS1,DNA1,1\nS1,CD3,2\n").unwrap();

        run_args(&project, &["samples"]).unwrap();
        let fresh = dir.path().join("fresh.csv");
        run_args(&project, &["init", "-o", fresh.to_str().unwrap()]).unwrap();
        assert_eq!(cellgate_io::read_gates_file(&fresh).unwrap().len(), 4);

        run_args(&project, &["init"]).unwrap();
        let rebuilt = cellgate_io::read_gates_file(&gates).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert_eq!(rebuilt.set_count(), 0);
    }
}
