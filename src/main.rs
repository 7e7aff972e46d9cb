//! Binary entry point for chatdedup.
//!
//! This binary provides the CLI interface over an exported chat archive.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chatdedup::cli::{DownloadCommand, ScanCommand};
use chatdedup::config::{DedupSettings, expand_path};
use chatdedup::observability;
use chatdedup::source::{ArchiveResolver, SessionState};
use chatdedup::{Error, Result};
use clap::{Args, Parser, Subcommand};

/// chatdedup - find and remove duplicate media in chat archives.
#[derive(Parser)]
#[command(name = "chatdedup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that opens a channel.
#[derive(Args)]
struct SourceArgs {
    /// Exported chat archive directory (containing `result.json`).
    #[arg(long, env = "CHATDEDUP_ARCHIVE", default_value = ".")]
    archive: String,

    /// Session state file.
    #[arg(short = 'f', long)]
    state: Option<String>,

    /// Do not persist a session.
    #[arg(long)]
    no_state: bool,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Find duplicates in a channel or group and delete all but the original.
    Scan {
        /// Channel or group name.
        name: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Report only; do not delete anything.
        #[arg(short, long)]
        dry: bool,

        /// Write duplicates (and the text log) to this directory.
        #[arg(short, long)]
        output: Option<String>,

        /// Also find duplicate text messages.
        #[arg(short, long)]
        text: bool,

        /// Only match content posted by the same author.
        #[arg(short = 'a', long)]
        scope_by_author: bool,

        /// Ignore media messages.
        #[arg(short = 'm', long)]
        skip_media: bool,
    },

    /// Download every distinct media item of a channel or group.
    Download {
        /// Channel or group name.
        name: String,

        /// Output directory.
        output: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match DedupSettings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&settings.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, settings: &DedupSettings) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Scan {
            name,
            source,
            dry,
            output,
            text,
            scope_by_author,
            skip_media,
        } => {
            let archive = expand_path(&source.archive)?;
            let cmd = ScanCommand {
                channel: name,
                session: session_state(&source, settings)?,
                output,
                dry_run: dry,
                text,
                scope_by_author,
                skip_media,
            };
            let summary =
                cmd.run(settings, |session| open_archive(&archive, session), &mut out)?;
            if let Some(e) = summary.text_log_error {
                eprintln!("Failed to write text duplicate log: {e}");
            }
        },

        Commands::Download {
            name,
            output,
            source,
        } => {
            let archive = expand_path(&source.archive)?;
            let cmd = DownloadCommand {
                channel: name,
                output,
                session: session_state(&source, settings)?,
            };
            cmd.run(settings, |session| open_archive(&archive, session), &mut out)?;
        },
    }

    out.flush().map_err(|e| Error::OperationFailed {
        operation: "flush_stdout".to_string(),
        cause: e.to_string(),
    })
}

/// Resolves `--state` / `--no-state` against the configured state file.
fn session_state(args: &SourceArgs, settings: &DedupSettings) -> Result<SessionState> {
    let state = args
        .state
        .as_deref()
        .or(settings.state_file.as_deref())
        .map(expand_path)
        .transpose()?;
    Ok(SessionState::from_flags(state, args.no_state))
}

fn open_archive(root: &Path, session: &SessionState) -> Result<ArchiveResolver> {
    ArchiveResolver::open(root, session)
}
