//! Row types mapping relational tables onto the domain model.

pub mod calendar;
pub mod network;
pub mod realtime;
pub mod route;
pub mod shape;
pub mod stop;
pub mod transfer;
pub mod trip;
