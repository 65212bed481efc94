//! The `schema_migrations` table: one row per unit whose `up` has committed.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use sea_orm_migration::{prelude::*, schema::*};

pub use self::schema_migration::Model as LedgerEntry;

mod schema_migration {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "schema_migrations")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub applied_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Creates the ledger table if it is absent. Safe to call on every start.
pub(crate) async fn ensure(db: &DatabaseConnection) -> Result<(), DbErr> {
    SchemaManager::new(db)
        .create_table(
            Table::create()
                .table(SchemaMigrations::Table)
                .if_not_exists()
                .col(string(SchemaMigrations::Id).primary_key())
                .col(
                    timestamp_with_time_zone(SchemaMigrations::AppliedAt)
                        .default(Expr::current_timestamp()),
                )
                .to_owned(),
        )
        .await
}

/// All ledger entries, oldest first.
pub(crate) async fn entries<C>(conn: &C) -> Result<Vec<LedgerEntry>, DbErr>
where
    C: ConnectionTrait,
{
    schema_migration::Entity::find()
        .order_by_asc(schema_migration::Column::AppliedAt)
        .order_by_asc(schema_migration::Column::Id)
        .all(conn)
        .await
}

pub(crate) async fn record<C>(conn: &C, id: &str) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    schema_migration::ActiveModel {
        id: Set(id.to_owned()),
        applied_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

pub(crate) async fn remove<C>(conn: &C, id: &str) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    schema_migration::Entity::delete_by_id(id.to_owned())
        .exec(conn)
        .await?;

    Ok(())
}

#[derive(DeriveIden)]
enum SchemaMigrations {
    Table,
    Id,
    AppliedAt,
}
