mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::{Cli, Commands, EnvCommands};
use commands::{
    client, config_path, handle_apply, handle_delete, handle_describe, handle_env_add,
    handle_env_list, handle_env_remove, handle_env_use, handle_list, handle_wait, handle_watch,
};
use error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never mix with the rendered views.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Apply { files } => handle_apply(&client(&cli)?, &files.files).await,
        Commands::Delete { files } => handle_delete(&client(&cli)?, &files.files).await,
        Commands::Wait { files, timeout } => {
            handle_wait(&client(&cli)?, &files.files, *timeout).await
        }
        Commands::List { kind } => handle_list(&client(&cli)?, kind).await,
        Commands::Describe { kind, name } => handle_describe(&client(&cli)?, kind, name).await,
        Commands::Watch { name } => handle_watch(&client(&cli)?, name).await,
        Commands::Env { command } => {
            let path = config_path(&cli)?;
            match command {
                EnvCommands::List => handle_env_list(&path),
                EnvCommands::Use { name } => handle_env_use(&path, name),
                EnvCommands::Add { environment } => handle_env_add(&path, environment.clone().into()),
                EnvCommands::Remove { name } => handle_env_remove(&path, name),
            }
        }
    };

    if let Err(ref e) = result {
        tracing::error!("Error: {}", e);
    }

    result
}
