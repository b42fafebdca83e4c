//! Clinic Scheduler Core
//!
//! Storage-agnostic types, rules, and error handling for the clinic scheduling backend.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `User`, `Identity`, `Appointment`, query and report structs
//! - **Access Control**: [`policy::authorize`], a pure `(identity, operation, target)` decision
//! - **Scheduling Rules**: [`scheduling::validate`], run against a [`SchedulingDirectory`]
//! - **Error Handling**: Unified `ClinicError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use clinic_core::policy::{authorize, Decision, Operation};
//! use clinic_core::types::{Identity, Role, UserId};
//!
//! let patient = Identity::new(UserId::new(7), Role::Patient, false);
//!
//! // Anyone signed in may list, only superusers may create
//! assert_eq!(authorize(&patient, Operation::List, None), Decision::Allow);
//! assert_eq!(authorize(&patient, Operation::Create, None), Decision::Forbidden);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod policy;
pub mod scheduling;
pub mod types;

// Re-export commonly used types
pub use error::{ClinicError, Result, ValidationError};
pub use policy::{authorize, Decision, Operation};
pub use scheduling::{validate, SchedulingDirectory};

pub use types::{
    // Accounts
    CreateUser, Identity, Role, User, UserSummary,
    // Appointments
    Appointment, ProposedAppointment, ValidatedAppointment,
    // Queries
    AppointmentFilters, AppointmentQuery, DateCount, Page, Pagination, ReportFilters, Scope,
    // Ids
    AppointmentId, UserId,
};
