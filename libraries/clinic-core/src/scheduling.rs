//! Scheduling rules for creating and updating appointments
//!
//! [`validate`] is storage-agnostic: it asks a [`SchedulingDirectory`] about user
//! roles and booked slots. Storage runs it inside the same transaction as the write,
//! and the `(doctor, scheduled_at)` unique constraint remains the final guard against
//! concurrent inserts.

use crate::error::{Result, ValidationError};
use crate::types::{
    Appointment, AppointmentId, ProposedAppointment, Role, UserId, ValidatedAppointment,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Lookups the scheduling rules need
#[async_trait]
pub trait SchedulingDirectory: Send {
    /// Role of an existing user, `None` if the user does not exist
    async fn role_of(&mut self, user: UserId) -> Result<Option<Role>>;

    /// Whether `doctor` already has an appointment at `at`, ignoring `exclude`
    async fn slot_taken(
        &mut self,
        doctor: UserId,
        at: DateTime<Utc>,
        exclude: Option<AppointmentId>,
    ) -> Result<bool>;
}

/// Check a proposed appointment against the scheduling rules
///
/// `existing` is `None` on create. On update, fields absent from `proposed` keep
/// their current values and only the changed references are re-checked.
pub async fn validate<D>(
    directory: &mut D,
    proposed: &ProposedAppointment,
    existing: Option<&Appointment>,
) -> Result<ValidatedAppointment>
where
    D: SchedulingDirectory + ?Sized,
{
    let doctor_id = proposed
        .doctor_id
        .or(existing.map(|a| a.doctor.id))
        .ok_or(ValidationError::MissingField("doctor_id"))?;
    let patient_id = proposed
        .patient_id
        .or(existing.map(|a| a.patient.id))
        .ok_or(ValidationError::MissingField("patient_id"))?;
    let scheduled_at = proposed
        .scheduled_at
        .map(truncate_to_seconds)
        .or(existing.map(|a| a.scheduled_at))
        .ok_or(ValidationError::MissingField("scheduled_at"))?;
    let is_completed = proposed
        .is_completed
        .or(existing.map(|a| a.is_completed))
        .unwrap_or(false);

    if (existing.is_none() || proposed.doctor_id.is_some())
        && directory.role_of(doctor_id).await? != Some(Role::Doctor)
    {
        return Err(ValidationError::InvalidDoctor.into());
    }

    if (existing.is_none() || proposed.patient_id.is_some())
        && directory.role_of(patient_id).await?.is_none()
    {
        return Err(ValidationError::InvalidPatient.into());
    }

    let slot_changed =
        existing.map_or(true, |a| a.doctor.id != doctor_id || a.scheduled_at != scheduled_at);
    if slot_changed
        && directory
            .slot_taken(doctor_id, scheduled_at, existing.map(|a| a.id))
            .await?
    {
        return Err(ValidationError::SchedulingConflict.into());
    }

    Ok(ValidatedAppointment {
        doctor_id,
        patient_id,
        scheduled_at,
        is_completed,
    })
}

/// Drop sub-second precision; slots are stored as whole seconds
pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
