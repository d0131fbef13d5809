mod config;
mod discovery;
mod terminal;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use config::Config;
use log::error;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "rawc", version, about = "Compiles Dwarf Fortress-style raw mods into a merged object graph")]
struct CliArgs {
    /// Increases logging verbosity. Pass twice for trace-level output.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Loads configuration from this path instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skips loading any config file, using built-in defaults only.
    #[arg(long, global = true)]
    no_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discovers mods, compiles them, and writes the compiled raw files.
    Compile {
        /// The directory containing mod subdirectories. Defaults to the
        /// configured mods directory, or `./mods`.
        #[arg(long)]
        mods: Option<PathBuf>,

        /// The directory to write compiled output files to. Defaults to the
        /// configured output directory, or `./compiled`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>, no_config: bool) {
    if no_config {
        return;
    }
    let result = match path {
        Some(path) => Config::get().load_from(path),
        None => Config::get().load(),
    };
    if let Err(e) = result {
        error!("Failed to load the config file: {:#}", e);
    }
}

fn run_compile(mods: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let config = Config::get();
    let mods_dir = mods.unwrap_or_else(|| {
        let configured = &config.settings.mods_dir;
        if configured.is_empty() { PathBuf::from("mods") } else { PathBuf::from(configured) }
    });
    let output_dir = output.unwrap_or_else(|| {
        let configured = &config.settings.output_dir;
        if configured.is_empty() { PathBuf::from("compiled") } else { PathBuf::from(configured) }
    });
    drop(config);

    let descriptors = discovery::discover_mods(&mods_dir)?;
    log::info!("discovered {} mod(s) in {}", descriptors.len(), mods_dir.display());
    std::fs::create_dir_all(&output_dir)?;
    rawc::compile(&descriptors, &output_dir)?;
    log::info!("compiled output written to {}", output_dir.display());
    Ok(())
}

fn run_app() -> Result<()> {
    let args = CliArgs::parse();
    terminal::init_logging(args.verbose as u64);
    load_config(args.config, args.no_config);

    match args.command {
        Command::Compile { mods, output } => run_compile(mods, output),
    }
}

fn main() {
    process::exit(match run_app() {
        Ok(()) => 0,
        Err(err) => {
            error!("Fatal: {:#}", err);
            1
        }
    });
}
