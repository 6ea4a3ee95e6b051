//! Stepwise CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Write the default config
//! - `run`    — Plan and run one task
//! - `state`  — Inspect, reset or delete a conversation's plan state

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise — a plan-guided, bounded tool-use agent loop",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Run one task through the planner and the agent loop
    Run {
        /// The task to run
        #[arg(short, long)]
        message: String,

        /// Continue an existing conversation instead of starting a new one
        #[arg(short, long)]
        conversation: Option<String>,
    },

    /// Inspect or manage stored plan state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Print a conversation's state as JSON
    Show { conversation: String },
    /// Return a conversation to idle, wiping its plan and findings
    Reset { conversation: String },
    /// Delete a conversation's state
    Delete { conversation: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Run {
            message,
            conversation,
        } => commands::run::run(message, conversation).await?,
        Commands::State { action } => match action {
            StateAction::Show { conversation } => commands::state::show(conversation).await?,
            StateAction::Reset { conversation } => commands::state::reset(conversation).await?,
            StateAction::Delete { conversation } => commands::state::delete(conversation).await?,
        },
    }

    Ok(())
}
