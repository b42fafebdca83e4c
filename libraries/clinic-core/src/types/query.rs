//! Query builder structs for appointment listing and reporting
//!
//! Handlers parse raw query-string values into these structs once; storage executes
//! them eagerly. Empty strings count as absent, matching how report deep links
//! serialize unset filters.

use crate::error::{ClinicError, Result};
use crate::types::{Identity, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which appointments a caller can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every appointment (superusers)
    All,
    /// Appointments where the user is the doctor or the patient
    Participant(UserId),
}

impl Scope {
    pub fn for_identity(identity: &Identity) -> Self {
        if identity.is_superuser {
            Scope::All
        } else {
            Scope::Participant(identity.id)
        }
    }
}

/// Conjunctive list filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilters {
    /// Calendar date of `scheduled_at`
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring of the doctor's first or last name
    pub doctor_name: Option<String>,
    pub is_completed: Option<bool>,
}

impl AppointmentFilters {
    pub fn parse(
        date: Option<&str>,
        doctor_name: Option<&str>,
        is_completed: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            date: parse_date("date", date)?,
            doctor_name: non_empty(doctor_name).map(str::to_string),
            is_completed: parse_bool("is_completed", is_completed)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.doctor_name.is_none() && self.is_completed.is_none()
    }
}

/// Limit/offset window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    /// Parse raw `limit`/`offset`, falling back to `default_limit` and clamping to `max_limit`
    pub fn parse(
        limit: Option<&str>,
        offset: Option<&str>,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<Self> {
        let limit = match non_empty(limit) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ClinicError::invalid_filter("limit", "must be a non-negative integer")
            })?,
            None => default_limit,
        };
        let offset = match non_empty(offset) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ClinicError::invalid_filter("offset", "must be a non-negative integer")
            })?,
            None => 0,
        };

        Ok(Self {
            limit: limit.clamp(1, max_limit.max(1)),
            offset,
        })
    }
}

/// Full list query, passed by value into storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub scope: Scope,
    pub filters: AppointmentFilters,
    pub pagination: Pagination,
}

/// Report filters; the date bounds are inclusive calendar dates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub doctor_name: Option<String>,
    pub is_completed: Option<bool>,
}

impl ReportFilters {
    pub fn parse(
        start_date: Option<&str>,
        end_date: Option<&str>,
        doctor_name: Option<&str>,
        is_completed: Option<&str>,
    ) -> Result<Self> {
        let filters = Self {
            start_date: parse_date("start_date", start_date)?,
            end_date: parse_date("end_date", end_date)?,
            doctor_name: non_empty(doctor_name).map(str::to_string),
            is_completed: parse_bool("is_completed", is_completed)?,
        };

        if let (Some(start), Some(end)) = (filters.start_date, filters.end_date) {
            if start > end {
                return Err(ClinicError::invalid_filter(
                    "end_date",
                    "must not be before start_date",
                ));
            }
        }

        Ok(filters)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Matches across all pages
    pub count: u64,
    pub limit: u32,
    pub offset: u32,
    pub results: Vec<T>,
}

/// Appointment count for one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: u64,
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    non_empty(raw)
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| ClinicError::invalid_filter(field, "Enter a valid date (YYYY-MM-DD)."))
        })
        .transpose()
}

fn parse_bool(field: &str, raw: Option<&str>) -> Result<Option<bool>> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(ClinicError::invalid_filter(field, "must be true or false")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn empty_values_are_absent() {
        let filters = AppointmentFilters::parse(Some(""), Some("  "), Some("")).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn parses_list_filters() {
        let filters =
            AppointmentFilters::parse(Some("2025-01-01"), Some("house"), Some("True")).unwrap();
        assert_eq!(filters.date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filters.doctor_name.as_deref(), Some("house"));
        assert_eq!(filters.is_completed, Some(true));
        assert!(!filters.is_empty());
    }

    #[test]
    fn malformed_date_is_invalid_filter() {
        let err = AppointmentFilters::parse(Some("01/02/2025"), None, None).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidFilter { ref field, .. } if field == "date"));
    }

    #[test]
    fn malformed_bool_is_invalid_filter() {
        assert!(AppointmentFilters::parse(None, None, Some("maybe")).is_err());
    }

    #[test]
    fn report_rejects_inverted_range() {
        let err = ReportFilters::parse(Some("2025-02-01"), Some("2025-01-01"), None, None)
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidFilter { ref field, .. } if field == "end_date"));
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(
            Pagination::parse(None, None, 10, 100).unwrap(),
            Pagination { limit: 10, offset: 0 }
        );
        assert_eq!(
            Pagination::parse(Some("500"), Some("20"), 10, 100).unwrap(),
            Pagination { limit: 100, offset: 20 }
        );
        assert!(Pagination::parse(Some("-1"), None, 10, 100).is_err());
    }

    #[test]
    fn scope_follows_superuser_flag() {
        let admin = Identity::new(UserId::new(1), Role::Admin, true);
        let doctor = Identity::new(UserId::new(2), Role::Doctor, false);
        assert_eq!(Scope::for_identity(&admin), Scope::All);
        assert_eq!(
            Scope::for_identity(&doctor),
            Scope::Participant(UserId::new(2))
        );
    }
}
