//! Command-line conversion and inspection for metatab files.
//!
//! `metatab convert` reads a delimited file with a metadata preamble,
//! projects it to a labeled dataset, and writes JSON or YAML depending on
//! the output extension. `metatab version` prints the reserved `version`
//! attribute and fails when the file does not carry one.

use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use metatab::{read_csv, Header, ReadOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "metatab")]
#[command(about = "Convert and inspect tabular files with metadata preambles")]
struct Args {
    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project a delimited file to a labeled dataset (JSON or YAML)
    Convert {
        /// Input file with an optional metadata preamble
        input: PathBuf,

        /// Output path; `.yml`/`.yaml` selects YAML, anything else JSON
        output: PathBuf,

        /// Columns to move into the index, overriding the declared coordinates
        #[arg(long, value_delimiter = ',')]
        index_cols: Option<Vec<String>>,

        /// Parse "description [unit]" variable strings
        #[arg(long)]
        parse_vars: bool,

        /// Separate file supplying the metadata preamble
        #[arg(long)]
        header_file: Option<PathBuf>,
    },
    /// Print the reserved `version` attribute of a file
    Version {
        /// Input file with a metadata preamble
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Convert {
            input,
            output,
            index_cols,
            parse_vars,
            header_file,
        } => convert(&input, &output, index_cols, parse_vars, header_file),
        Command::Version { input } => version(&input),
    }
}

fn convert(
    input: &Path,
    output: &Path,
    index_cols: Option<Vec<String>>,
    parse_vars: bool,
    header_file: Option<PathBuf>,
) -> Result<()> {
    let options = ReadOptions {
        index_cols,
        parse_vars,
        header_file,
        ..ReadOptions::default()
    };
    let container = read_csv(input, options)
        .with_context(|| format!("failed to read {}", input.display()))?;
    info!(shape = ?container.shape(), "read container");

    let dataset = container
        .to_dataset()
        .context("projection to a labeled dataset failed")?;

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    match output.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => serde_yaml::to_writer(file, &dataset)?,
        _ => serde_json::to_writer_pretty(file, &dataset)?,
    }
    info!(output = %output.display(), "wrote dataset");
    Ok(())
}

fn version(input: &Path) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let (header, _) = Header::parse(&text)?;
    match header.version() {
        Some(version) => {
            println!("{version}");
            Ok(())
        }
        None => bail!("{} carries no version attribute", input.display()),
    }
}
