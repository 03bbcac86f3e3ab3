//! mapkubeapis CLI - map deprecated or removed Kubernetes APIs in Helm releases

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;
mod logging;

use commands::GlobalArgs;
use error::Result;

#[derive(Parser)]
#[command(name = "mapkubeapis")]
#[command(version)]
#[command(
    about = "Map deprecated or removed Kubernetes APIs in Helm releases to supported ones",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Map the latest deployed revision of a release
    Release {
        /// Release name
        name: String,

        /// Print the mapped manifest instead of writing a new revision
        #[arg(long)]
        dry_run: bool,
    },

    /// Map a manifest file, or stdin with `-`
    Manifest {
        /// Manifest path
        path: PathBuf,

        /// Write the mapped manifest here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the mappings in effect
    Mappings {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();

    logging::init(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Release { name, dry_run } => {
            commands::release::run(&name, dry_run, &cli.global).await
        }
        Commands::Manifest { path, output } => {
            commands::manifest::run(&path, output.as_deref(), &cli.global).await
        }
        Commands::Mappings { json } => commands::mappings::run(json, &cli.global),
    }
}
