//! Clinic Scheduler Storage
//!
//! `SQLite` persistence for users and appointments.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each feature owns its own queries (`users`, `appointments`)
//! - **Constraint-backed invariants**: The `(doctor_id, scheduled_at)` unique constraint
//!   is the authoritative double-booking guard
//! - **Transactional writes**: Appointment create/update run the scheduling rules and
//!   the write in one transaction
//!
//! # Example
//!
//! ```rust,no_run
//! use clinic_storage::{appointments, connect};
//! use clinic_core::types::{AppointmentQuery, AppointmentFilters, Pagination, Scope};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("sqlite://clinic.db").await?;
//!
//! let page = appointments::list(
//!     &pool,
//!     AppointmentQuery {
//!         scope: Scope::All,
//!         filters: AppointmentFilters::default(),
//!         pagination: Pagination { limit: 10, offset: 0 },
//!     },
//! )
//! .await?;
//! println!("{} appointments", page.count);
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod appointments;
pub mod users;

pub use error::StorageError;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://clinic.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!("Creating pool with URL: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // Appointments cascade on user delete
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::info!("Database pool ready");

    Ok(pool)
}

/// Create a pool and bring the schema up to date
pub async fn connect(database_url: &str) -> Result<SqlitePool, StorageError> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
