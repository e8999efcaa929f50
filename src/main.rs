use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use compass_genie::config::Config;
use compass_genie::{server, terminal};

#[derive(Parser, Debug)]
#[command(name = "compass-genie", about = "Map assistant chat client and dev backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the assistant from the terminal
    Chat,
    /// Run the mock chat backend
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compass_genie=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenv::dotenv().ok();
    let config = Config::from_env().expect("Failed to load configuration");

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            if let Err(e) = terminal::run_chat(config).await {
                error!("Chat session failed: {}", e);
                std::process::exit(1);
            }
        }
        Command::Serve => {
            info!("Starting CompassGenie dev backend");
            if let Err(e) = server::serve(&config).await {
                error!("Server failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
