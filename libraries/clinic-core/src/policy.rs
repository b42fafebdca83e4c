//! Appointment access control
//!
//! Two predicates make up the policy. The collection-level one covers operations
//! with no target row (list, create, report). The object-level one covers
//! operations on one appointment (retrieve, update, delete).
//!
//! A missing row answers `NotFound` only to superusers. Everyone else gets
//! `Forbidden`, so the response never reveals whether an id exists.

use crate::error::{ClinicError, Result};
use crate::types::{Appointment, Identity};

/// What the caller is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Report,
    Retrieve,
    Update,
    Delete,
}

impl Operation {
    /// Operations that act on the collection rather than one row
    pub fn is_collection(self) -> bool {
        matches!(self, Operation::List | Operation::Create | Operation::Report)
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbidden,
    NotFound,
}

impl Decision {
    /// Turn a denial into the matching error
    pub fn into_result(self, entity: &str, id: impl ToString) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Forbidden => Err(ClinicError::Forbidden),
            Decision::NotFound => Err(ClinicError::not_found(entity, id.to_string())),
        }
    }
}

/// Decide whether `identity` may perform `operation` on `target`
///
/// For object operations `target` is the looked-up row, `None` when it does not exist.
/// Collection operations ignore `target`.
pub fn authorize(
    identity: &Identity,
    operation: Operation,
    target: Option<&Appointment>,
) -> Decision {
    if operation.is_collection() {
        return if collection_allows(identity, operation) {
            Decision::Allow
        } else {
            Decision::Forbidden
        };
    }

    match target {
        Some(appointment) if object_allows(identity, operation, appointment) => Decision::Allow,
        Some(_) => Decision::Forbidden,
        None if identity.is_superuser => Decision::NotFound,
        None => Decision::Forbidden,
    }
}

fn collection_allows(identity: &Identity, operation: Operation) -> bool {
    match operation {
        Operation::List => true,
        _ => identity.is_superuser,
    }
}

fn object_allows(identity: &Identity, operation: Operation, appointment: &Appointment) -> bool {
    match operation {
        Operation::Retrieve => identity.is_superuser || appointment.involves(identity.id),
        _ => identity.is_superuser,
    }
}
