//! BrainAtlas CLI - manage locally cached atlases.
//!
//! A thin surface over the library facade: every subcommand maps to one
//! `AtlasLibrary` call.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use brainatlas::{AtlasError, AtlasLibrary, AtlasVersion};

#[derive(Parser)]
#[command(name = "brainatlas", version, about = "Manage locally cached neuroanatomical atlases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List installed and available atlases.
    List,

    /// Install an atlas (no-op when already installed).
    Install {
        /// Symbolic atlas name, e.g. allen_mouse_25um.
        name: String,

        /// Install this exact version instead of the latest.
        #[arg(long)]
        version: Option<AtlasVersion>,
    },

    /// Update an atlas to the latest published version.
    Update {
        /// Symbolic atlas name.
        name: String,
    },

    /// Remove an installed atlas.
    Remove {
        /// Symbolic atlas name.
        name: String,
    },

    /// Show metadata and taxonomy summary of an atlas.
    Info {
        /// Symbolic atlas name.
        name: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let library = AtlasLibrary::with_user_config();

    let result: Result<(), AtlasError> = match cli.command {
        Command::List => commands::list(&library),
        Command::Install { name, version } => commands::install(&library, &name, version),
        Command::Update { name } => commands::update(&library, &name),
        Command::Remove { name } => commands::remove(&library, &name),
        Command::Info { name } => commands::info(&library, &name),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
