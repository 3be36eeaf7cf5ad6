//! Builds a snapshot from the relational store in seven bulk reads.

use chrono::NaiveDate;
use database::queries::schedule_load;
use database::{DatabaseError, PgPool};
use futures::TryStreamExt;

use crate::snapshot::Snapshot;

pub(crate) async fn load_snapshot(
    pool: &PgPool,
    today: NaiveDate,
) -> Result<Snapshot, DatabaseError> {
    let mut builder = Snapshot::builder();

    let stops = schedule_load::stops(pool).await?;
    let stop_count = stops.len();
    for stop in stops {
        builder.add_stop(
            &stop.id,
            stop.name.as_deref().unwrap_or(""),
            stop.lat.unwrap_or(0.0),
            stop.lon.unwrap_or(0.0),
            stop.parent_station_id.as_deref(),
        );
    }
    log::info!("schedule load: {stop_count} stops");

    let routes = schedule_load::routes(pool).await?;
    let route_count = routes.len();
    for route in routes {
        builder.add_route(
            &route.id,
            route.short_name.as_deref().unwrap_or(""),
            route.color.as_deref(),
            route.route_type.unwrap_or(0),
        );
    }
    log::info!("schedule load: {route_count} routes");

    let calendars = schedule_load::calendars(pool, today).await?;
    let calendar_count = calendars.len();
    for calendar in calendars {
        builder.add_calendar(
            &calendar.service_id,
            [
                calendar.monday,
                calendar.tuesday,
                calendar.wednesday,
                calendar.thursday,
                calendar.friday,
                calendar.saturday,
                calendar.sunday,
            ],
        );
    }
    log::info!("schedule load: {calendar_count} active calendars");

    let exceptions = schedule_load::calendar_exceptions(pool).await?;
    let exception_count = exceptions.len();
    for row in exceptions {
        let service_id = row.service_id.clone();
        let date = row.date;
        match row.into_exception() {
            Some(exception) => builder.add_calendar_exception(
                &exception.service_id,
                exception.date,
                matches!(
                    exception.exception_type,
                    model::calendar::ExceptionType::Added
                ),
            ),
            None => log::warn!(
                "schedule load: unknown exception type for {service_id} on {date}"
            ),
        }
    }
    log::info!("schedule load: {exception_count} calendar exceptions");

    let trips = schedule_load::trips(pool).await?;
    let trip_count = trips.len();
    for trip in trips {
        builder.add_trip(
            &trip.id,
            &trip.route_id,
            trip.service_id.as_deref().unwrap_or(""),
            trip.headsign.as_deref(),
        );
    }
    log::info!("schedule load: {trip_count} trips");

    // The big one: streamed, ordered by (trip_id, stop_sequence) so the
    // builder appends per-trip sequences in one pass.
    let mut stop_time_count: u64 = 0;
    let mut stream = schedule_load::stop_times_stream(pool);
    while let Some(row) = stream.try_next().await.map_err(db_err)? {
        builder.add_stop_time(
            &row.trip_id,
            &row.stop_id,
            row.arrival_seconds.unwrap_or(0).max(0) as u32,
            row.departure_seconds.unwrap_or(0).max(0) as u32,
        );
        stop_time_count += 1;
        if stop_time_count % 500_000 == 0 {
            log::info!("schedule load: {stop_time_count} stop_times…");
        }
    }
    drop(stream);
    log::info!("schedule load: {stop_time_count} stop_times");

    let correspondences = schedule_load::correspondences(pool).await?;
    let transfer_count = correspondences.len();
    for row in correspondences {
        builder.add_transfer(
            &row.from_stop_id,
            &row.to_stop_id,
            row.walk_time_s.unwrap_or(0) as i64,
        );
    }
    log::info!("schedule load: {transfer_count} correspondences");

    Ok(builder.build())
}

fn db_err(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        other => DatabaseError::Other(Box::new(other)),
    }
}
