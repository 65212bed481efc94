pub use sea_orm_migration::prelude::*;

use std::future::Future;
use std::pin::Pin;

mod error;
mod ledger;
mod m001_initial_schema;
mod m002_add_user_group_tables;
mod runner;

pub use error::MigrationError;
pub use ledger::LedgerEntry;
pub use runner::MigrationStatus;

/// Future returned by a unit's `up` or `down`.
pub type SchemaFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DbErr>> + 'a>>;

/// One direction of a unit, run against a manager bound to the unit's transaction.
pub type SchemaOp = for<'a, 'c> fn(&'a SchemaManager<'c>) -> SchemaFuture<'a>;

/// A named, ordered schema change. The id is permanent once released.
#[derive(Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub up: SchemaOp,
    pub down: SchemaOp,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration").field("id", &self.id).finish()
    }
}

/// Declaration order is apply order. Never sort, never reorder, only append.
const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "001_initial_schema",
        up: m001_initial_schema::up,
        down: m001_initial_schema::down,
    },
    Migration {
        id: "002_add_user_group_tables",
        up: m002_add_user_group_tables::up,
        down: m002_add_user_group_tables::down,
    },
];

pub struct Migrator;

impl Migrator {
    pub fn migrations() -> &'static [Migration] {
        MIGRATIONS
    }

    /// Applies every pending unit in registration order, recording each one in
    /// the ledger as it commits. Stops at the first failure.
    pub async fn run(db: &sea_orm::DatabaseConnection) -> Result<(), MigrationError> {
        runner::apply_pending(db, MIGRATIONS).await.map(|_| ())
    }

    /// Applied/pending state of every registered unit, in registration order.
    pub async fn status(
        db: &sea_orm::DatabaseConnection,
    ) -> Result<Vec<MigrationStatus>, MigrationError> {
        runner::status(db, MIGRATIONS).await
    }

    /// Runs `down` for the most recently registered applied unit and forgets
    /// it in the ledger. Never called automatically.
    pub async fn rollback_last(
        db: &sea_orm::DatabaseConnection,
    ) -> Result<Option<&'static str>, MigrationError> {
        runner::rollback_last(db, MIGRATIONS).await
    }
}
