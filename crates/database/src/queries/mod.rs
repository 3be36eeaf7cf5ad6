//! SQL query modules. Functions are generic over the executor so they run
//! against a pool or inside a transaction alike.

pub mod departures;
pub mod history;
pub mod network;
pub mod realtime;
pub mod route;
pub mod schedule_load;
pub mod stop;
pub mod trip;

pub(crate) use crate::convert_error;
