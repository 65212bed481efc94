use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, QuerySelect, Set};
use thiserror::Error;

use crate::entity::location;

/// Number of locations returned by a listing when no limit is given.
pub const DEFAULT_LIST_LIMIT: u64 = 10;

pub type LocationId = i32;

/// Any persistence failure. Callers do not distinguish sub-kinds.
#[derive(Error, Debug)]
#[error("location store error: {0}")]
pub struct StoreError(#[from] DbErr);

#[derive(Debug, Clone)]
pub struct LocationStore {
    db: DatabaseConnection,
}

impl LocationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, latitude: f64, longitude: f64) -> Result<LocationId, StoreError> {
        let new_location = location::ActiveModel {
            latitude: Set(latitude),
            longitude: Set(longitude),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let saved = new_location.insert(&self.db).await?;
        Ok(saved.id)
    }

    /// Most recent first, at most `limit` rows.
    pub async fn list_latest(&self, limit: u64) -> Result<Vec<location::Model>, StoreError> {
        let locations = location::Entity::find()
            .order_by_desc(location::Column::CreatedAt)
            .order_by_desc(location::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(locations)
    }
}
