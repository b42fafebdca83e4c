/// Storage setup errors
use thiserror::Error;

/// Errors opening or migrating the database
///
/// Query-level failures use `clinic_core::ClinicError` instead.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for clinic_core::ClinicError {
    fn from(err: StorageError) -> Self {
        clinic_core::ClinicError::Database(err.to_string())
    }
}
