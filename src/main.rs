use clap::{Parser, Subcommand};
use pnd_assistant::Result;
use pnd_assistant::commands::{ask, chat, show_status};
use pnd_assistant::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pnd-assistant")]
#[command(about = "Answers citizen questions about Colombia's National Development Plan, citing its pages")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the cited answer
    Ask {
        /// Question about the development plan
        question: String,
    },
    /// Start a turn-based chat session
    Chat,
    /// Configure the embedding and generation services
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Show configuration, models and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = get_config_dir(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Ask { question } => {
            ask(&config_dir, &question).await?;
        }
        Commands::Chat => {
            chat(&config_dir).await?;
        }
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Status => {
            show_status(&config_dir).await?;
        }
    }

    Ok(())
}
