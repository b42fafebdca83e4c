/// Appointment domain types
use crate::types::{AppointmentId, UserId, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled visit between a doctor and a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub doctor: UserSummary,
    pub patient: UserSummary,
    pub scheduled_at: DateTime<Utc>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether `user` is this appointment's doctor or patient
    pub fn involves(&self, user: UserId) -> bool {
        self.doctor.id == user || self.patient.id == user
    }
}

/// Create or update request body; absent fields are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProposedAppointment {
    #[serde(default)]
    pub doctor_id: Option<UserId>,
    #[serde(default)]
    pub patient_id: Option<UserId>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

/// Appointment fields that passed the scheduling rules, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAppointment {
    pub doctor_id: UserId,
    pub patient_id: UserId,
    /// Whole seconds, matching storage precision
    pub scheduled_at: DateTime<Utc>,
    pub is_completed: bool,
}
