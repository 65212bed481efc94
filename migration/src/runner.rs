use std::collections::{HashMap, HashSet};

use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use sea_orm_migration::SchemaManager;
use tracing::{error, info};

use crate::error::MigrationError;
use crate::ledger;
use crate::Migration;

/// Applied state of one registered unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub id: &'static str,
    pub applied_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Runs `up` for every unit absent from the ledger, in slice order, and
/// returns the ids applied by this call.
///
/// Each unit's `up` and its ledger row share one transaction. A failure aborts
/// the run; units committed before it stay applied and recorded.
pub(crate) async fn apply_pending(
    db: &DatabaseConnection,
    migrations: &[Migration],
) -> Result<Vec<&'static str>, MigrationError> {
    ledger::ensure(db).await?;

    let applied: HashSet<String> = ledger::entries(db)
        .await?
        .into_iter()
        .map(|entry| entry.id)
        .collect();

    let mut newly_applied = Vec::new();
    for migration in migrations {
        if applied.contains(migration.id) {
            continue;
        }

        info!(migration = migration.id, "Running migration");
        if let Err(source) = apply_one(db, migration).await {
            error!(migration = migration.id, error = %source, "Migration failed");
            return Err(MigrationError::Unit {
                id: migration.id,
                source,
            });
        }
        info!(migration = migration.id, "Successfully applied migration");
        newly_applied.push(migration.id);
    }

    if newly_applied.is_empty() {
        info!("Schema is up to date");
    }

    Ok(newly_applied)
}

async fn apply_one(db: &DatabaseConnection, migration: &Migration) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    {
        let manager = SchemaManager::new(&txn);
        (migration.up)(&manager).await?;
    }
    ledger::record(&txn, migration.id).await?;

    txn.commit().await
}

pub(crate) async fn status(
    db: &DatabaseConnection,
    migrations: &[Migration],
) -> Result<Vec<MigrationStatus>, MigrationError> {
    ledger::ensure(db).await?;

    let applied: HashMap<String, _> = ledger::entries(db)
        .await?
        .into_iter()
        .map(|entry| (entry.id, entry.applied_at))
        .collect();

    Ok(migrations
        .iter()
        .map(|migration| MigrationStatus {
            id: migration.id,
            applied_at: applied.get(migration.id).copied(),
        })
        .collect())
}

/// Reverts the last unit in slice order that the ledger marks as applied.
pub(crate) async fn rollback_last(
    db: &DatabaseConnection,
    migrations: &[Migration],
) -> Result<Option<&'static str>, MigrationError> {
    ledger::ensure(db).await?;

    let applied: HashSet<String> = ledger::entries(db)
        .await?
        .into_iter()
        .map(|entry| entry.id)
        .collect();

    let Some(migration) = migrations
        .iter()
        .rev()
        .find(|migration| applied.contains(migration.id))
    else {
        info!("No applied migrations to roll back");
        return Ok(None);
    };

    info!(migration = migration.id, "Rolling back migration");
    revert_one(db, migration)
        .await
        .map_err(|source| MigrationError::Unit {
            id: migration.id,
            source,
        })?;
    info!(migration = migration.id, "Rolled back migration");

    Ok(Some(migration.id))
}

async fn revert_one(db: &DatabaseConnection, migration: &Migration) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    {
        let manager = SchemaManager::new(&txn);
        (migration.down)(&manager).await?;
    }
    ledger::remove(&txn, migration.id).await?;

    txn.commit().await
}
