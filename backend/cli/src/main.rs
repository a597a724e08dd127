mod config;
mod doctor_cmd;
mod run_cmd;
mod sounds_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rocket-mango")]
#[command(about = "rocket-mango: a Discord soundboard bot")]
#[command(version)]
struct Cli {
    /// Config file (default: $MANGO_CONFIG, ./rocket-mango.yaml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve commands
    Run {
        /// Bot token; overrides DISCORD_TOKEN, the config file, and the secret file
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Load the sound library and print its commands
    List,
    /// Decode a DCA file and print frame statistics
    Inspect {
        file: PathBuf,
    },
    /// Convert an audio file into the output directory
    Encode {
        input: PathBuf,
        /// Target directory (default: the configured output directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the token, tools, and directories
    Doctor {
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = mango_config::config_file_path(cli.config.as_deref());

    match cli.command {
        Commands::Run { token } => run_cmd::run(&path, token.as_deref()).await,
        Commands::List => sounds_cmd::list(&path).await,
        Commands::Inspect { file } => sounds_cmd::inspect(&file).await,
        Commands::Encode { input, out_dir } => sounds_cmd::encode(&path, &input, out_dir.as_deref()).await,
        Commands::Init { force } => config::init(&path, force).await,
        Commands::Doctor { token } => doctor_cmd::run(&path, token.as_deref()).await,
    }
}
