use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Timelike, Utc};
use routing::{plan_journey, JourneyPlan, PlanRequest};
use serde::Deserialize;
use utility::holidays::MADRID_TZ;

use crate::common::{ApiError, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/route-planner", get(plan))
        .with_state(state)
}

#[derive(Deserialize)]
struct PlannerQuery {
    from: String,
    to: String,
    departure_time: Option<String>,
    max_transfers: Option<usize>,
    max_alternatives: Option<usize>,
}

/// Parse "HH:MM", "HH:MM:SS" or an ISO8601 timestamp into seconds since
/// local midnight.
fn parse_departure_time(value: &str) -> Option<u32> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(&value.replace('Z', "+00:00")) {
        let local = parsed.with_timezone(&MADRID_TZ);
        return Some(local.num_seconds_from_midnight());
    }

    let mut parts = value.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: u32 = match parts.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    if hours > 47 || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

async fn plan(
    State(state): State<WebState>,
    Query(params): Query<PlannerQuery>,
) -> RouteResult<JourneyPlan> {
    let departure_seconds = match params.departure_time.as_deref() {
        Some(raw) => Some(parse_departure_time(raw).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "invalid departure_time: {raw}. Use HH:MM or ISO8601."
            ))
        })?),
        None => None,
    };

    let now = Utc::now().with_timezone(&MADRID_TZ);
    let request = PlanRequest {
        from_stop: params.from,
        to_stop: params.to,
        departure_seconds,
        date: now.date_naive(),
        now_seconds: now.num_seconds_from_midnight(),
        max_transfers: params.max_transfers.unwrap_or(3).min(5),
        max_alternatives: params.max_alternatives.unwrap_or(3).clamp(1, 5),
    };

    let plan = plan_journey(&state.pool, &state.store, &request).await?;
    Ok(Json(plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hh_mm_parses() {
        assert_eq!(parse_departure_time("08:30"), Some(30_600));
        assert_eq!(parse_departure_time("25:10"), Some(90_600));
        assert_eq!(parse_departure_time("08:61"), None);
        assert_eq!(parse_departure_time("junk"), None);
    }

    #[test]
    fn iso8601_parses_to_local_seconds() {
        // Winter: Madrid is UTC+1
        let seconds = parse_departure_time("2026-01-15T08:30:00Z").unwrap();
        assert_eq!(seconds, 9 * 3600 + 1800);
    }
}
