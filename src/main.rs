use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::{info, LevelFilter};

use std::path::PathBuf;
use std::process::ExitCode;

use anchortrim::*;

/// Trim the adapter anchor from the start of FASTQ reads.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log less (repeat to silence warnings)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trim single-end reads
    Single(SingleArgs),
    /// Trim paired reads, cutting only the first read of each pair
    Paired(PairedArgs),
}

#[derive(Args, Debug)]
struct SingleArgs {
    /// Input FASTQ file (gzipped if it ends in .gz)
    #[arg(short, long)]
    input: PathBuf,

    /// Output FASTQ file (gzipped if it ends in .gz)
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Args, Debug)]
struct PairedArgs {
    /// First read input
    #[arg(long)]
    in1: PathBuf,

    /// Second read input
    #[arg(long)]
    in2: PathBuf,

    /// First read output
    #[arg(long)]
    out1: PathBuf,

    /// Second read output
    #[arg(long)]
    out2: PathBuf,

    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Args, Debug)]
struct Tuning {
    /// Number of worker threads [default: all CPUs for single, 1 for paired]
    #[arg(short, long)]
    threads: Option<usize>,

    /// YAML file with pipeline settings; command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write records in input order
    #[arg(long)]
    ordered: bool,
}

impl Tuning {
    fn settings(&self, mode: Mode) -> Result<Settings> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)?,
            None => PipelineConfig::default(),
        };

        if self.threads.is_some() {
            config.threads = self.threads;
        }
        config.ordered |= self.ordered;

        config.resolve(mode)
    }
}

fn log_level(verbose: u8, quiet: u8) -> LevelFilter {
    match 2 + verbose as i16 - quiet as i16 {
        i16::MIN..=0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn single(args: &SingleArgs) -> Result<()> {
    let settings = args.tuning.settings(Mode::Single)?;

    info!(
        "Reading {} and writing {}",
        args.input.display(),
        args.output.display()
    );
    let source = iter_fastq1(
        open_input(&args.input)?,
        Origin::file(&args.input),
        settings.max_line_len,
    );
    let mut writer = create_output(&args.output)?;

    run_single(source, &mut writer, &Adapter::default(), &settings)?;
    writer.finish()
}

fn paired(args: &PairedArgs) -> Result<()> {
    let settings = args.tuning.settings(Mode::Paired)?;

    info!(
        "Reading {} and {}, writing {} and {}",
        args.in1.display(),
        args.in2.display(),
        args.out1.display(),
        args.out2.display()
    );
    let source = iter_fastq2(
        open_input(&args.in1)?,
        Origin::file(&args.in1),
        open_input(&args.in2)?,
        Origin::file(&args.in2),
        settings.max_line_len,
    );
    let mut writer1 = create_output(&args.out1)?;
    let mut writer2 = create_output(&args.out2)?;

    run_paired(
        source,
        &mut writer1,
        &mut writer2,
        &Adapter::default(),
        &settings,
    )?;
    writer1.finish()?;
    writer2.finish()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let res = match &cli.command {
        Commands::Single(args) => single(args),
        Commands::Paired(args) => paired(args),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
