use std::sync::Arc;

use clap::Parser;
use tracing::{error, Level};

use campaign_push::{
    cli::{self, Cli, Commands},
    configuration::{AppState, State},
    error::Error,
    migration,
    provider::DatabasePool,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(Level::INFO)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Migrate { status } => cli::run_migrate(status).await,
        Commands::Records { user_id } => cli::run_records(&user_id).await,
        Commands::Prune {
            user_id,
            keep_endpoint,
            dry_run,
        } => cli::run_prune(&user_id, &keep_endpoint, dry_run).await,
    }
}

async fn serve() -> Result<(), Error> {
    let config = match cli::init_config() {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let database = DatabasePool::new(&config).await?;
    migration::run_migrations(database.get_pool()).await?;

    let store = Arc::new(database.push_subscription.clone());
    let app_state = AppState::new(State::new(config, store));

    tokio::select! {
        result = server::server_task(&app_state) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        },
    }
}
