/// Core error types for the clinic scheduler
use thiserror::Error;

/// Result type alias using `ClinicError`
pub type Result<T> = std::result::Result<T, ClinicError>;

/// A proposed appointment was rejected by the scheduling rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field required on create was absent
    #[error("This field is required.")]
    MissingField(&'static str),

    /// `doctor_id` does not reference a user with the doctor role
    #[error("Only doctors can have appointments.")]
    InvalidDoctor,

    /// `patient_id` does not reference an existing user
    #[error("Patient not found.")]
    InvalidPatient,

    /// The doctor already has an appointment at that exact time
    #[error("Doctor already has an appointment at this time.")]
    SchedulingConflict,
}

impl ValidationError {
    /// Request field the error is reported against
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidDoctor => "doctor_id",
            Self::InvalidPatient => "patient_id",
            Self::SchedulingConflict => "scheduled_at",
        }
    }
}

/// Core error type for the clinic scheduler
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Scheduling rule violation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed list or report filter
    #[error("Invalid filter {field}: {message}")]
    InvalidFilter { field: String, message: String },

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Caller is authenticated but not permitted
    #[error("Permission denied")]
    Forbidden,

    /// Invalid input outside the scheduling rules (unknown role, bad id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A storage constraint or write lock rejected the write
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Database errors (for storage implementations)
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ClinicError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid filter error
    pub fn invalid_filter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.code().is_some_and(|code| is_lock_contention(&code))
            {
                return Self::Integrity(db_err.message().to_string());
            }
        }
        Self::Database(err.to_string())
    }
}

/// SQLite `BUSY` (5) or `LOCKED` (6), including their extended codes
#[cfg(feature = "sqlx-support")]
fn is_lock_contention(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|code| matches!(code & 0xff, 5 | 6))
}
