// SPDX-License-Identifier: AGPL-3.0-or-later
//! LockIn CLI
//!
//! Browse and edit the LockIn note folder from a terminal.

mod commands;

use clap::{Parser, Subcommand};
use console::style;
use lockin_core::{LockInConfig, LockInResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lockin")]
#[command(author, version, about = "LockIn - notes and folders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the LockIn folder, overriding the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the LockIn folder and its README on first run
    Init,

    /// Forget that the folder was initialised
    Reset,

    /// List folder contents
    #[command(alias = "dir")]
    Ls {
        /// Folder to list (defaults to the root)
        #[arg(default_value = "")]
        path: String,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// Print a note
    Cat {
        path: String,
    },

    /// Replace a note's text
    Write {
        path: String,

        /// New text; read from stdin when omitted
        text: Option<String>,
    },

    /// Append a line to a note
    Append {
        path: String,
        text: String,
    },

    /// Create folders, including missing parents
    Mkdir {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Remove notes or folders
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Move or rename a note or folder
    Mv {
        source: String,
        dest: String,
    },

    /// Create a note from the template
    NewNote {
        /// Folder to create it in
        #[arg(default_value = "")]
        dir: String,

        /// Note name; `.txt` is added when missing
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Create an empty folder
    NewFolder {
        #[arg(default_value = "")]
        dir: String,

        #[arg(short, long)]
        name: Option<String>,
    },

    /// Character, word and line counts
    Stats {
        path: String,
    },

    /// Hand a note to an external program
    Share {
        path: String,

        /// Program to run with the note's file path
        #[arg(long = "with")]
        program: Option<String>,

        /// Argument passed to the program before the path (repeatable)
        #[arg(long = "arg", requires = "program", allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> LockInResult<LockInConfig> {
    let path = cli.config.clone().or_else(|| {
        directories::ProjectDirs::from("dev", "hyperpolymath", "lockin")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.is_file())
    });

    let mut config = match path {
        Some(path) => {
            tracing::debug!("Loading configuration from {}", path.display());
            LockInConfig::load(path)?
        }
        None => LockInConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> LockInResult<()> {
    let config = load_config(&cli)?;
    let ctx = commands::Context::new(config);

    match cli.command {
        Commands::Init => commands::init(&ctx).await,
        Commands::Reset => commands::reset(&ctx).await,
        Commands::Ls { path, long, human } => commands::ls(&ctx, &path, long, human).await,
        Commands::Cat { path } => commands::cat(&ctx, &path).await,
        Commands::Write { path, text } => commands::write(&ctx, &path, text).await,
        Commands::Append { path, text } => commands::append(&ctx, &path, &text).await,
        Commands::Mkdir { paths } => commands::mkdir(&ctx, &paths).await,
        Commands::Rm { paths } => commands::rm(&ctx, &paths).await,
        Commands::Mv { source, dest } => commands::mv(&ctx, &source, &dest).await,
        Commands::NewNote { dir, name } => commands::new_note(&ctx, &dir, name.as_deref()).await,
        Commands::NewFolder { dir, name } => commands::new_folder(&ctx, &dir, name.as_deref()).await,
        Commands::Stats { path } => commands::stats(&ctx, &path).await,
        Commands::Share { path, program, args } => {
            commands::share(&ctx, &path, program.as_deref(), &args).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
