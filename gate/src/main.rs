mod cli;
mod logging;

use clap::{Parser, Subcommand};
use gate_core::{config, git::CliGitProvider};
use std::{io, path::PathBuf, process::ExitCode};

use crate::cli::{ApplyArgs, CaptureArgs, CliError, CliResult};

#[derive(Parser)]
#[command(
    name = "gate",
    version,
    about = "Capture and restore git repository state",
    long_about = "Capture the layout of git repositories and worktrees as JSON, and restore it on another system."
)]
struct Cli {
    /// Override path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory to capture from or apply into (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    root: Option<PathBuf>,

    /// Level for the log file in the cache directory (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = logging::DEFAULT_LOG_LEVEL)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories above, at and below the root for git repositories and print their state as JSON
    Capture {
        /// Write the state to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read a JSON state from stdin and set up the repositories and worktrees it lists
    Apply {
        /// Read the state from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Print what would be created without cloning anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log_level != log::LevelFilter::Off
        && let Err(error) = logging::setup_logging(cli.log_level)
    {
        eprintln!("warning: logging disabled: {error}");
    }

    match run(cli) {
        Ok(()) => ExitCode::from(0),
        Err(error) => {
            log::error!("{error}");
            crate::cli::print_error(&error);
            ExitCode::from(u8::try_from(error.code()).unwrap_or(2))
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = config::load_config(cli.config.as_deref()).map_err(CliError::from)?;
    let root = crate::cli::resolve_root(cli.root.as_deref())?;
    let git = CliGitProvider;

    match cli.command {
        Commands::Capture { output } => crate::cli::cmd_capture(
            &root,
            &config,
            &git,
            &CaptureArgs { output },
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        ),
        Commands::Apply { input, dry_run } => {
            let summary = crate::cli::cmd_apply(
                &root,
                &git,
                &ApplyArgs { input, dry_run },
                &mut io::stdin().lock(),
                &mut io::stderr().lock(),
            )?;
            log::info!(
                "apply: {} created, {} skipped, {} failed",
                summary.created,
                summary.skipped,
                summary.failed
            );
            Ok(())
        }
    }
}
