pub mod calendar;
pub mod network;
pub mod occupancy;
pub mod realtime;
pub mod route;
pub mod shape;
pub mod stop;
pub mod transfer;
pub mod trip;

pub use utility::holidays::DayType;
