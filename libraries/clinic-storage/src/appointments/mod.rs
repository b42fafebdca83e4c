//! Appointment store
//!
//! Create and update open an immediate transaction, run the scheduling rules against
//! it, write, and commit. Taking the write lock up front serializes concurrent writers
//! behind the pool's busy timeout, so the rules always see committed bookings. A write
//! that still loses the race hits the `(doctor_id, scheduled_at)` unique constraint or
//! the lock and surfaces as `ClinicError::Integrity`.

mod query;

pub use query::{list, report};

use crate::users::timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_core::{
    error::{ClinicError, Result},
    scheduling::{self, SchedulingDirectory},
    types::{Appointment, AppointmentId, ProposedAppointment, Role, UserId, UserSummary},
};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, SqliteConnection, SqlitePool};

pub(crate) const SELECT_APPOINTMENTS: &str = r#"
    SELECT a.id, a.scheduled_at, a.is_completed, a.created_at, a.updated_at,
           a.doctor_id, d.first_name AS doctor_first_name, d.last_name AS doctor_last_name,
           a.patient_id, p.first_name AS patient_first_name, p.last_name AS patient_last_name
    FROM appointments a
    INNER JOIN users d ON d.id = a.doctor_id
    INNER JOIN users p ON p.id = a.patient_id
"#;

/// Write lock is taken before the scheduling reads
const WRITE_TRANSACTION: &str = "BEGIN IMMEDIATE";

/// Get appointment by ID
///
/// Accepts a pool or an open transaction.
pub async fn get_by_id<'e, E>(executor: E, id: AppointmentId) -> Result<Option<Appointment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!("{SELECT_APPOINTMENTS} WHERE a.id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(appointment_from_row).transpose()
}

/// Validate and insert a new appointment
pub async fn create(pool: &SqlitePool, proposed: &ProposedAppointment) -> Result<Appointment> {
    let mut tx = pool.begin_with(WRITE_TRANSACTION).await?;

    let validated = {
        let mut directory = ConnectionDirectory { conn: &mut *tx };
        scheduling::validate(&mut directory, proposed, None).await?
    };

    let now = Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        INSERT INTO appointments
            (doctor_id, patient_id, scheduled_at, is_completed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(validated.doctor_id)
    .bind(validated.patient_id)
    .bind(validated.scheduled_at.timestamp())
    .bind(validated.is_completed)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let id = AppointmentId::new(result.last_insert_rowid());
    let appointment = get_by_id(&mut *tx, id).await?.ok_or_else(|| {
        ClinicError::Database("Failed to retrieve created appointment".to_string())
    })?;

    tx.commit().await?;

    tracing::info!(
        appointment_id = %id,
        doctor_id = %validated.doctor_id,
        scheduled_at = %validated.scheduled_at,
        "Created appointment"
    );
    Ok(appointment)
}

/// Apply the fields present in `proposed` to an existing appointment
pub async fn update(
    pool: &SqlitePool,
    id: AppointmentId,
    proposed: &ProposedAppointment,
) -> Result<Appointment> {
    let mut tx = pool.begin_with(WRITE_TRANSACTION).await?;

    let existing = get_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("Appointment", id.to_string()))?;

    let validated = {
        let mut directory = ConnectionDirectory { conn: &mut *tx };
        scheduling::validate(&mut directory, proposed, Some(&existing)).await?
    };

    sqlx::query(
        r#"
        UPDATE appointments
        SET doctor_id = ?, patient_id = ?, scheduled_at = ?, is_completed = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(validated.doctor_id)
    .bind(validated.patient_id)
    .bind(validated.scheduled_at.timestamp())
    .bind(validated.is_completed)
    .bind(Utc::now().timestamp())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let appointment = get_by_id(&mut *tx, id).await?.ok_or_else(|| {
        ClinicError::Database("Failed to retrieve updated appointment".to_string())
    })?;

    tx.commit().await?;

    tracing::info!(appointment_id = %id, "Updated appointment");
    Ok(appointment)
}

/// Delete an appointment
pub async fn delete(pool: &SqlitePool, id: AppointmentId) -> Result<()> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("Appointment", id.to_string()));
    }

    tracing::info!(appointment_id = %id, "Deleted appointment");
    Ok(())
}

/// Scheduling lookups bound to the open write transaction
struct ConnectionDirectory<'c> {
    conn: &'c mut SqliteConnection,
}

#[async_trait]
impl SchedulingDirectory for ConnectionDirectory<'_> {
    async fn role_of(&mut self, user: UserId) -> Result<Option<Role>> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(user)
            .fetch_optional(&mut *self.conn)
            .await?;

        role.map(|r| r.parse::<Role>()).transpose()
    }

    async fn slot_taken(
        &mut self,
        doctor: UserId,
        at: DateTime<Utc>,
        exclude: Option<AppointmentId>,
    ) -> Result<bool> {
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE doctor_id = ? AND scheduled_at = ? AND (? IS NULL OR id != ?)
            )
            "#,
        )
        .bind(doctor)
        .bind(at.timestamp())
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(taken != 0)
    }
}

pub(crate) fn appointment_from_row(row: &SqliteRow) -> Result<Appointment> {
    Ok(Appointment {
        id: row.try_get("id")?,
        doctor: UserSummary {
            id: row.try_get("doctor_id")?,
            first_name: row.try_get("doctor_first_name")?,
            last_name: row.try_get("doctor_last_name")?,
        },
        patient: UserSummary {
            id: row.try_get("patient_id")?,
            first_name: row.try_get("patient_first_name")?,
            last_name: row.try_get("patient_last_name")?,
        },
        scheduled_at: timestamp(row.try_get("scheduled_at")?)?,
        is_completed: row.try_get("is_completed")?,
        created_at: timestamp(row.try_get("created_at")?)?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
    })
}
