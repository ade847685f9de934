//! Query-parameter validation for the today view.
//!
//! All three parameters are optional and independent; the first
//! malformed one rejects the request before any data is read.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::SubtaskStatus;

/// Raw query-string parameters as received. `days_ahead` stays a
/// string here so its error messages come from this module, not from
/// the framework's number parsing.
#[derive(Debug, Default, Deserialize)]
pub struct TodayQuery {
    pub status: Option<String>,
    pub days_ahead: Option<String>,
    pub course: Option<String>,
}

/// A rejected filter value. The `Display` strings are the
/// client-facing messages.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    #[error("Status inválido. Valores permitidos: PENDING, DONE, WAITING, POSTPONED.")]
    InvalidStatus,

    #[error("El parámetro days_ahead debe ser un número entero válido.")]
    DaysAheadNotInteger,

    #[error("El parámetro days_ahead debe ser un número entero positivo.")]
    DaysAheadNotPositive,

    #[error("El parámetro course debe ser un identificador UUID válido.")]
    CourseNotUuid,
}

/// The validated, immutable filter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodayFilters {
    pub status: Option<SubtaskStatus>,
    pub days_ahead: Option<i64>,
    pub course: Option<Uuid>,
}

impl TodayFilters {
    pub fn from_query(query: &TodayQuery) -> Result<Self, FilterError> {
        let status = match query.status.as_deref() {
            None => None,
            Some(raw) => Some(SubtaskStatus::parse(raw).ok_or(FilterError::InvalidStatus)?),
        };

        let days_ahead = match query.days_ahead.as_deref() {
            None => None,
            Some(raw) => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| FilterError::DaysAheadNotInteger)?;
                if value < 1 {
                    return Err(FilterError::DaysAheadNotPositive);
                }
                Some(value)
            }
        };

        let course = match query.course.as_deref() {
            None => None,
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| FilterError::CourseNotUuid)?),
        };

        Ok(TodayFilters {
            status,
            days_ahead,
            course,
        })
    }
}
