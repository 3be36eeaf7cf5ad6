use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use departures::DeparturesError;
use routing::PlanError;
use serde::Serialize;

pub type RouteResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    /// The schedule store has not completed its first load.
    Loading,
    BadRequest(String),
    Unauthorized,
    Unavailable(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Loading => (
                StatusCode::SERVICE_UNAVAILABLE,
                "schedule data is still loading".to_owned(),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "invalid admin token".to_owned())
            }
            ApiError::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<database::DatabaseError> for ApiError {
    fn from(why: database::DatabaseError) -> Self {
        match why {
            database::DatabaseError::NotFound => {
                ApiError::NotFound("resource not found".to_owned())
            }
            other => {
                log::error!("database error: {other}");
                ApiError::Unavailable("database unavailable".to_owned())
            }
        }
    }
}

impl From<DeparturesError> for ApiError {
    fn from(why: DeparturesError) -> Self {
        match why {
            DeparturesError::NotFound => ApiError::NotFound("stop not found".to_owned()),
            DeparturesError::NotLoaded => ApiError::Loading,
            DeparturesError::Unavailable(inner) => {
                log::error!("departures unavailable: {inner}");
                ApiError::Unavailable("departures unavailable".to_owned())
            }
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(why: PlanError) -> Self {
        match why {
            PlanError::NotFound => ApiError::NotFound("stop not found".to_owned()),
            PlanError::NotLoaded => ApiError::Loading,
            PlanError::Unavailable(inner) => {
                log::error!("planner unavailable: {inner}");
                ApiError::Unavailable("planner unavailable".to_owned())
            }
        }
    }
}

/// Compare secrets without leaking the mismatch position through timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equality() {
        assert!(constant_time_eq("secreto", "secreto"));
        assert!(!constant_time_eq("secreto", "secreta"));
        assert!(!constant_time_eq("secreto", "secret"));
        assert!(!constant_time_eq("", "x"));
        assert!(constant_time_eq("", ""));
    }
}
