//! Database migration module using sqlx
//!
//! Migrations under `migrations/` are embedded at compile time and tracked
//! in the `_sqlx_migrations` table.

use sqlx::migrate::{Migrate, Migrator};

use crate::{dao::PoolType, error::Error};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run all pending database migrations, each in its own transaction.
pub async fn run_migrations(pool: &PoolType) -> Result<(), Error> {
    tracing::info!("Running database migrations...");

    let pending = pending_migrations(pool).await?;
    MIGRATOR.run(pool).await?;

    if pending.is_empty() {
        tracing::info!("No new migrations to apply");
    } else {
        for (version, description) in &pending {
            tracing::info!("Applied migration: {:04}_{}", version, description);
        }
        tracing::info!("Successfully applied {} migration(s)", pending.len());
    }

    Ok(())
}

/// Versions and descriptions of embedded migrations not yet applied.
pub async fn pending_migrations(
    pool: &PoolType,
) -> Result<Vec<(i64, String)>, Error> {
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;

    let applied = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|migration| migration.version)
        .collect::<Vec<i64>>();

    let pending = MIGRATOR
        .iter()
        .filter(|migration| !applied.contains(&migration.version))
        .map(|migration| (migration.version, migration.description.to_string()))
        .collect();

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded() {
        let mut versions: Vec<i64> =
            MIGRATOR.iter().map(|migration| migration.version).collect();
        assert!(!versions.is_empty(), "No migrations found");

        versions.sort();
        let mut prev_version = 0;
        for version in &versions {
            assert!(
                *version > prev_version,
                "Migrations must have unique ascending version numbers"
            );
            prev_version = *version;
        }

        assert_eq!(
            versions.first(),
            Some(&1),
            "First migration should be 0001"
        );
    }

    #[test]
    fn test_subscription_table_is_scoped_per_user() {
        let migration = MIGRATOR
            .iter()
            .find(|migration| migration.version == 1)
            .expect("0001 migration");

        assert!(migration.sql.contains("UNIQUE (user_id, endpoint)"));
    }
}
