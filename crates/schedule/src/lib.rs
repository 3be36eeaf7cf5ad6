//! The in-memory schedule store. The full static schedule is loaded once at
//! boot and served from RAM; reloads build a fresh snapshot off to the side
//! and swap a single reference, so readers never block.

mod loader;
mod snapshot;
mod store;

pub use snapshot::{
    DayExceptions, RouteInfo, Snapshot, SnapshotBuilder, StopInfo, TripInfo,
    TripStopTime,
};
pub use store::{NotLoaded, ScheduleStore};
