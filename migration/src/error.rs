use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    /// The ledger table could not be created, read or written.
    #[error("migration ledger error: {0}")]
    Ledger(#[from] DbErr),

    /// A unit's `up` (or `down`, when rolled back by an operator) failed.
    #[error("migration {id} failed: {source}")]
    Unit {
        id: &'static str,
        #[source]
        source: DbErr,
    },
}

impl MigrationError {
    /// Id of the unit that failed, if the failure belongs to one.
    pub fn unit_id(&self) -> Option<&'static str> {
        match self {
            MigrationError::Unit { id, .. } => Some(id),
            MigrationError::Ledger(_) => None,
        }
    }
}
