//! voxfx: run effect chains over WAV files from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};

use voxfx_core::chain::{parse_chain, render_parse_error, ChainProcessor, EffectStep};
use voxfx_core::{registry, wav, ChainError, VoxError, WavError};

#[derive(Parser)]
#[command(name = "voxfx", version, about = "Speech post-processing effect chains")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply an effect chain to a WAV file
    Apply(ApplyArgs),
    /// Convert any PCM or float WAV to 16-bit mono
    Portable {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Resample to this rate in Hz
        #[arg(long)]
        resample: Option<u32>,
    },
    /// Print the effect registry as JSON
    List,
}

#[derive(Args)]
struct ApplyArgs {
    /// Input WAV (mono 16-bit unless --portable)
    input: PathBuf,

    /// Output WAV
    #[arg(short, long)]
    output: PathBuf,

    /// Chain as inline JSON
    #[arg(long, conflicts_with = "chain_file", required_unless_present = "chain_file")]
    chain: Option<String>,

    /// Chain read from a JSON file
    #[arg(long)]
    chain_file: Option<PathBuf>,

    /// Seed for random effects
    #[arg(long)]
    seed: Option<u64>,

    /// Accept any channel count and sample format on input
    #[arg(long)]
    portable: bool,

    /// With --portable, resample the input to this rate in Hz first
    #[arg(long, requires = "portable")]
    resample: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.cmd {
        Command::Apply(args) => apply(args),
        Command::Portable { input, output, resample } => portable(&input, &output, resample),
        Command::List => list(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Report(report)) => {
            eprint!("{report}");
            ExitCode::FAILURE
        }
        Err(CliError::Vox(e)) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

enum CliError {
    /// Pre-rendered diagnostic, printed as-is.
    Report(String),
    Vox(VoxError),
}

macro_rules! into_vox_error {
    ($($ty:ty),*) => {
        $(impl From<$ty> for CliError {
            fn from(e: $ty) -> Self {
                CliError::Vox(e.into())
            }
        })*
    };
}

into_vox_error!(VoxError, ChainError, WavError, std::io::Error, serde_json::Error);

fn load_chain(args: &ApplyArgs) -> Result<Vec<EffectStep>, CliError> {
    let (source_name, json) = match (&args.chain, &args.chain_file) {
        (Some(inline), _) => ("<chain>".to_string(), inline.clone()),
        (None, Some(path)) => (path.display().to_string(), fs::read_to_string(path)?),
        (None, None) => return Ok(Vec::new()),
    };
    parse_chain(&json).map_err(|e| CliError::Report(render_parse_error(&source_name, &json, &e)))
}

fn apply(args: ApplyArgs) -> Result<(), CliError> {
    let steps = load_chain(&args)?;
    let input = if args.portable {
        wav::read_portable(&args.input, args.resample)?
    } else {
        wav::read_wav(&args.input)?
    };
    info!(
        "read {} ({} samples, {} Hz)",
        args.input.display(),
        input.len(),
        input.sample_rate
    );

    let processor = match args.seed {
        Some(seed) => ChainProcessor::with_seed(seed),
        None => ChainProcessor::new(),
    };
    let output = processor.apply_chain(&input, &steps)?;
    wav::write_wav(&args.output, &output)?;
    println!(
        "{} -> {} ({} effect(s), {:.2} s)",
        args.input.display(),
        args.output.display(),
        steps.len(),
        output.duration()
    );
    Ok(())
}

fn portable(input: &Path, output: &Path, resample: Option<u32>) -> Result<(), CliError> {
    let buffer = wav::to_portable_file(input, output, resample)?;
    println!(
        "{} -> {} (mono 16-bit, {} Hz, {:.2} s)",
        input.display(),
        output.display(),
        buffer.sample_rate,
        buffer.duration()
    );
    Ok(())
}

fn list() -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&registry::describe())?);
    Ok(())
}
