use sea_orm::DbBackend;
use sea_orm_migration::{prelude::*, schema::*};
use tracing::debug;

use crate::SchemaFuture;

const FK_LOCATIONS_USER_ID: &str = "fk_locations_user_id";

pub fn up<'a>(manager: &'a SchemaManager<'_>) -> SchemaFuture<'a> {
    Box::pin(async move {
        manager
            .create_table(
                Table::create()
                    .table(Group::Table)
                    .if_not_exists()
                    .col(uuid(Group::Id).primary_key())
                    .col(string_len(Group::Name, 255))
                    .col(
                        timestamp_with_time_zone(Group::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Group::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(uuid(User::GroupId))
                    .col(string_len_uniq(User::Username, 100))
                    .col(string_len_null(User::Email, 255))
                    .col(string_len(User::PasswordHash, 255))
                    .col(string_len(User::Role, 50).default("member"))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_group_id")
                            .from(User::Table, User::GroupId)
                            .to(Group::Table, Group::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // A half-completed earlier run may already have added the column.
        if manager.has_column("locations", "user_id").await? {
            return Ok(());
        }

        manager
            .alter_table(
                Table::alter()
                    .table(Location::Table)
                    .add_column(ColumnDef::new(Location::UserId).uuid().null())
                    .to_owned(),
            )
            .await?;

        if supports_altering_constraints(manager) {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name(FK_LOCATIONS_USER_ID)
                        .from(Location::Table, Location::UserId)
                        .to(User::Table, User::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                        .to_owned(),
                )
                .await?;
        } else {
            debug!(
                constraint = FK_LOCATIONS_USER_ID,
                "Skipping foreign key, backend cannot alter constraints"
            );
        }

        Ok(())
    })
}

pub fn down<'a>(manager: &'a SchemaManager<'_>) -> SchemaFuture<'a> {
    Box::pin(async move {
        if supports_altering_constraints(manager) {
            manager
                .drop_foreign_key(
                    ForeignKey::drop()
                        .name(FK_LOCATIONS_USER_ID)
                        .table(Location::Table)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .alter_table(
                Table::alter()
                    .table(Location::Table)
                    .drop_column(Location::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Group::Table).to_owned())
            .await?;

        Ok(())
    })
}

/// SQLite can only declare foreign keys when a table is created.
fn supports_altering_constraints(manager: &SchemaManager<'_>) -> bool {
    manager.get_database_backend() != DbBackend::Sqlite
}

#[derive(DeriveIden)]
enum Group {
    #[sea_orm(iden = "groups")]
    Table,
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    GroupId,
    Username,
    Email,
    PasswordHash,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Location {
    #[sea_orm(iden = "locations")]
    Table,
    UserId,
}
