//! Departures fusion: one stop query merges scheduled stop_times, realtime
//! delays, vehicle positions, learned platforms, frequency estimates and
//! express detection into a single ordered board.

mod civis;
mod dedup;
mod engine;
mod frequency;
mod hours;
mod types;

pub use civis::detect_civis;
pub use engine::departures;
pub use types::{Departure, DepartureQuery, DeparturesError, TrainPosition};
