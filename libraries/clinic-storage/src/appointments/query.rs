//! Appointment listing and date-grouped reporting

use super::{appointment_from_row, SELECT_APPOINTMENTS};
use chrono::NaiveDate;
use clinic_core::{
    error::{ClinicError, Result},
    types::{Appointment, AppointmentQuery, DateCount, Page, ReportFilters, Scope},
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const COUNT_APPOINTMENTS: &str = r#"
    SELECT COUNT(a.id)
    FROM appointments a
    INNER JOIN users d ON d.id = a.doctor_id
"#;

const REPORT_APPOINTMENTS: &str = r#"
    SELECT date(a.scheduled_at, 'unixepoch') AS day, COUNT(a.id) AS count
    FROM appointments a
    INNER JOIN users d ON d.id = a.doctor_id
"#;

/// Calendar date (UTC) of the stored unix timestamp
const SCHEDULED_DATE: &str = "date(a.scheduled_at, 'unixepoch')";

/// List one page of appointments visible under the query's scope
///
/// Results are ordered by id. `count` covers every match, not just this page.
pub async fn list(pool: &SqlitePool, query: AppointmentQuery) -> Result<Page<Appointment>> {
    let mut count_query = QueryBuilder::<Sqlite>::new(COUNT_APPOINTMENTS);
    push_list_conditions(&mut count_query, &query);
    let count: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(SELECT_APPOINTMENTS);
    push_list_conditions(&mut select, &query);
    select
        .push(" ORDER BY a.id LIMIT ")
        .push_bind(i64::from(query.pagination.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(query.pagination.offset));

    let rows = select.build().fetch_all(pool).await?;
    let results = rows
        .iter()
        .map(appointment_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(Page {
        count: count as u64,
        limit: query.pagination.limit,
        offset: query.pagination.offset,
        results,
    })
}

/// Count appointments per calendar date, oldest first
pub async fn report(pool: &SqlitePool, filters: &ReportFilters) -> Result<Vec<DateCount>> {
    let mut report = QueryBuilder::<Sqlite>::new(REPORT_APPOINTMENTS);
    report.push(" WHERE 1 = 1");

    if let Some(start) = filters.start_date {
        report
            .push(format!(" AND {SCHEDULED_DATE} >= "))
            .push_bind(iso_date(start));
    }
    if let Some(end) = filters.end_date {
        report
            .push(format!(" AND {SCHEDULED_DATE} <= "))
            .push_bind(iso_date(end));
    }
    push_shared_filters(
        &mut report,
        filters.doctor_name.as_deref(),
        filters.is_completed,
    );
    report.push(" GROUP BY day ORDER BY day");

    let rows = report.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            let day: String = row.try_get("day")?;
            let count: i64 = row.try_get("count")?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|e| ClinicError::Database(format!("Invalid report date {day}: {e}")))?;
            Ok(DateCount {
                date,
                count: count as u64,
            })
        })
        .collect()
}

fn push_list_conditions(builder: &mut QueryBuilder<'_, Sqlite>, query: &AppointmentQuery) {
    builder.push(" WHERE 1 = 1");

    if let Scope::Participant(user) = query.scope {
        builder
            .push(" AND (a.doctor_id = ")
            .push_bind(user)
            .push(" OR a.patient_id = ")
            .push_bind(user)
            .push(")");
    }

    if let Some(date) = query.filters.date {
        builder
            .push(format!(" AND {SCHEDULED_DATE} = "))
            .push_bind(iso_date(date));
    }

    push_shared_filters(
        builder,
        query.filters.doctor_name.as_deref(),
        query.filters.is_completed,
    );
}

fn push_shared_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    doctor_name: Option<&str>,
    is_completed: Option<bool>,
) {
    if let Some(name) = doctor_name {
        // SQLite LIKE is case-insensitive for ASCII
        let pattern = format!("%{}%", escape_like(name));
        builder
            .push(" AND (d.first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR d.last_name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(completed) = is_completed {
        builder.push(" AND a.is_completed = ").push_bind(completed);
    }
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
