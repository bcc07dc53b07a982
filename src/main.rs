//! nightbot-sr CLI binary entry point.

use clap::Parser;
use nightbot_sr::cli::context::Context;
use nightbot_sr::cli::{AuthCommands, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login => nightbot_sr::cli::auth::handle_login(&ctx).await,
            AuthCommands::Status => nightbot_sr::cli::auth::handle_status(&ctx).await,
            AuthCommands::Logout => nightbot_sr::cli::auth::handle_logout(&ctx).await,
        },
        Commands::Queue(args) => nightbot_sr::cli::queue::handle_queue(&ctx, args.command).await,
        Commands::Requests(args) => {
            nightbot_sr::cli::queue::handle_requests(&ctx, args.command).await
        }
        Commands::Watch(args) => nightbot_sr::cli::queue::handle_watch(&ctx, args.interval).await,
        Commands::Settings(args) => {
            nightbot_sr::cli::queue::handle_settings(&ctx, args.command).await
        }
    }
}
