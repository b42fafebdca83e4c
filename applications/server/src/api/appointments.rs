/// Appointments API routes
use crate::{
    error::{Result, ServerError},
    middleware::AuthenticatedUser,
    state::AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use clinic_core::{
    authorize, Appointment, AppointmentFilters, AppointmentId, AppointmentQuery, ClinicError,
    Operation, Pagination, ProposedAppointment, ReportFilters, Scope,
};
use serde::{Deserialize, Serialize};

const LIST_PATH: &str = "/api/appointments/list/";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub date: Option<String>,
    pub doctor_name: Option<String>,
    pub is_completed: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub doctor_name: Option<String>,
    pub is_completed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub date: NaiveDate,
    pub count: u64,
    /// Listing of that day's appointments under the same filters
    pub url: String,
    pub filters: ReportFilterEcho,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportFilterEcho {
    pub doctor_name: Option<String>,
    pub is_completed: Option<bool>,
}

/// GET /api/appointments/list/
/// Appointments visible to the caller, optionally filtered
pub async fn list_appointments(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Response> {
    let identity = auth.identity();
    authorize(identity, Operation::List, None).into_result("Appointment", "")?;

    let Query(params) = params?;
    let settings = &app_state.config.pagination;
    let query = AppointmentQuery {
        scope: Scope::for_identity(identity),
        filters: AppointmentFilters::parse(
            params.date.as_deref(),
            params.doctor_name.as_deref(),
            params.is_completed.as_deref(),
        )?,
        pagination: Pagination::parse(
            params.limit.as_deref(),
            params.offset.as_deref(),
            settings.default_limit,
            settings.max_limit,
        )?,
    };

    let page = app_state.scheduling.list(query).await?;
    Ok(Json(page.as_ref()).into_response())
}

/// POST /api/appointments/create/
/// Book a new appointment (superusers only)
pub async fn create_appointment(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    payload: std::result::Result<Json<ProposedAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>)> {
    authorize(auth.identity(), Operation::Create, None).into_result("Appointment", "")?;

    let Json(proposed) = payload?;
    let appointment = app_state.scheduling.create(&proposed).await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// GET /api/appointments/:id/
/// Single appointment, visible to its doctor, its patient and superusers
pub async fn get_appointment(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    id: std::result::Result<Path<AppointmentId>, PathRejection>,
) -> Result<Json<Appointment>> {
    let Path(id) = id?;
    let appointment = load_authorized(&app_state, &auth, Operation::Retrieve, id).await?;
    Ok(Json(appointment))
}

/// PUT|PATCH /api/appointments/:id/
/// Change the fields present in the body (superusers only)
pub async fn update_appointment(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    id: std::result::Result<Path<AppointmentId>, PathRejection>,
    payload: std::result::Result<Json<ProposedAppointment>, JsonRejection>,
) -> Result<Json<Appointment>> {
    let Path(id) = id?;
    load_authorized(&app_state, &auth, Operation::Update, id).await?;

    let Json(proposed) = payload?;
    let appointment = app_state.scheduling.update(id, &proposed).await?;
    Ok(Json(appointment))
}

/// DELETE /api/appointments/:id/
/// Cancel an appointment (superusers only)
pub async fn delete_appointment(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    id: std::result::Result<Path<AppointmentId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    load_authorized(&app_state, &auth, Operation::Delete, id).await?;

    app_state.scheduling.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/appointments/report/
/// Appointment counts per day with links to the matching listings (superusers only)
pub async fn appointment_report(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    headers: HeaderMap,
    params: std::result::Result<Query<ReportParams>, QueryRejection>,
) -> Result<Json<Vec<ReportEntry>>> {
    authorize(auth.identity(), Operation::Report, None).into_result("Appointment", "")?;

    let Query(params) = params?;
    let filters = ReportFilters::parse(
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        params.doctor_name.as_deref(),
        params.is_completed.as_deref(),
    )?;

    let rows = app_state.scheduling.report(&filters).await?;

    let base = list_base_url(app_state.config.server.public_url.as_deref(), &headers);
    let echo = ReportFilterEcho {
        doctor_name: filters.doctor_name.clone(),
        is_completed: filters.is_completed,
    };

    let entries = rows
        .into_iter()
        .map(|row| ReportEntry {
            date: row.date,
            count: row.count,
            url: list_link(&base, row.date, &filters),
            filters: echo.clone(),
        })
        .collect();

    Ok(Json(entries))
}

/// Look up an appointment and run the object-level access check on it
async fn load_authorized(
    app_state: &AppState,
    auth: &AuthenticatedUser,
    operation: Operation,
    id: AppointmentId,
) -> Result<Appointment> {
    let target = app_state.scheduling.get(id).await?;
    authorize(auth.identity(), operation, target.as_ref()).into_result("Appointment", id)?;

    target.ok_or_else(|| ServerError::from(ClinicError::not_found("Appointment", id.to_string())))
}

/// Absolute listing URL when a base is known, otherwise a root-relative path
fn list_base_url(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(public) = public_url {
        return format!("{}{LIST_PATH}", public.trim_end_matches('/'));
    }

    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{LIST_PATH}"),
        None => LIST_PATH.to_string(),
    }
}

/// Listing link for one report day; unset filters are sent empty
fn list_link(base: &str, date: NaiveDate, filters: &ReportFilters) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("date", &date.format("%Y-%m-%d").to_string())
        .append_pair("doctor_name", filters.doctor_name.as_deref().unwrap_or(""))
        .append_pair(
            "is_completed",
            match filters.is_completed {
                Some(true) => "true",
                Some(false) => "false",
                None => "",
            },
        )
        .finish();

    format!("{base}?{query}")
}
