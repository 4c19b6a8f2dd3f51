//! CLI module for the push subscription service
//!
//! Runs the HTTP service, migrations and diagnostic reads of the persisted
//! subscription table.

use clap::{Parser, Subcommand};

use crate::{
    configuration::{get_configuration, set_configuration, Config},
    error::Error,
    migration,
    provider::DatabasePool,
    push::{stale_ids, StaleSubscriptionCleaner},
};
use std::sync::Arc;

/// Campaign push subscription service
#[derive(Parser)]
#[command(name = "campaign-push")]
#[command(
    about = "Web-push subscription store and maintenance",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default if no command specified)
    Serve,

    /// Run database migrations
    Migrate {
        /// Show pending migrations without running them
        #[arg(long)]
        status: bool,
    },

    /// List the persisted subscriptions of a user
    Records {
        #[arg(long)]
        user_id: String,
    },

    /// Delete a user's subscriptions whose endpoint differs from the given one
    Prune {
        #[arg(long)]
        user_id: String,

        /// Endpoint of the device that stays registered
        #[arg(long)]
        keep_endpoint: String,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

pub async fn run_migrate(status_only: bool) -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;

    if status_only {
        let pending = migration::pending_migrations(database.get_pool()).await?;
        if pending.is_empty() {
            tracing::info!("Database is up to date");
        }
        for (version, description) in pending {
            tracing::info!("Pending migration: {:04}_{}", version, description);
        }
        return Ok(());
    }

    migration::run_migrations(database.get_pool()).await
}

pub async fn run_records(user_id: &str) -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;

    let rows = database.push_subscription.get_by_user(user_id).await?;
    tracing::info!("{} subscription(s) for {}", rows.len(), user_id);

    for row in rows {
        println!(
            "{}\t{}\t{}\t{}",
            row.id,
            row.last_used_at.to_rfc3339(),
            row.user_agent.as_deref().unwrap_or("-"),
            row.endpoint
        );
    }

    Ok(())
}

pub async fn run_prune(
    user_id: &str,
    keep_endpoint: &str,
    dry_run: bool,
) -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;

    if dry_run {
        let rows = database.push_subscription.get_by_user(user_id).await?;
        let ids = stale_ids(&rows, keep_endpoint);
        tracing::info!("Would delete {} subscription(s): {:?}", ids.len(), ids);
        return Ok(());
    }

    let cleaner =
        StaleSubscriptionCleaner::new(Arc::new(database.push_subscription));
    let deleted = cleaner.prune(user_id, keep_endpoint).await?;
    tracing::info!("Deleted {} stale subscription(s)", deleted);

    Ok(())
}
