use sea_orm_migration::{prelude::*, schema::*};

use crate::SchemaFuture;

pub fn up<'a>(manager: &'a SchemaManager<'_>) -> SchemaFuture<'a> {
    Box::pin(async move {
        manager
            .create_table(
                Table::create()
                    .table(Location::Table)
                    .if_not_exists()
                    .col(pk_auto(Location::Id))
                    .col(double(Location::Latitude))
                    .col(double(Location::Longitude))
                    .col(
                        timestamp_with_time_zone(Location::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_locations_created_at")
                    .table(Location::Table)
                    .col(Location::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    })
}

pub fn down<'a>(manager: &'a SchemaManager<'_>) -> SchemaFuture<'a> {
    Box::pin(async move {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_locations_created_at")
                    .table(Location::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Location::Table).to_owned())
            .await?;

        Ok(())
    })
}

#[derive(DeriveIden)]
enum Location {
    #[sea_orm(iden = "locations")]
    Table,
    Id,
    Latitude,
    Longitude,
    CreatedAt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    #[tokio::test]
    async fn test_down_restores_empty_schema() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let manager = SchemaManager::new(&db);

        up(&manager).await.unwrap();
        assert!(manager.has_table("locations").await.unwrap());
        assert!(manager.has_index("locations", "idx_locations_created_at").await.unwrap());

        down(&manager).await.unwrap();
        assert!(!manager.has_table("locations").await.unwrap());
    }
}
