//! Real-time ingestion: per-operator fetch workers on a fixed cadence,
//! wire-format decoding, platform post-processing and history learning.

use std::fmt;

use database::DatabaseError;

pub mod classifier;
pub mod decode;
pub mod operators;
pub mod platforms;
pub mod scheduler;
pub mod visor;
pub mod worker;

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/protobuf/transit_realtime.rs"));
}

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Decode(String),
    Database(DatabaseError),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(why) => write!(f, "feed unavailable: {why}"),
            FetchError::Decode(why) => write!(f, "feed decode failed: {why}"),
            FetchError::Database(why) => write!(f, "persistence failed: {why}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(why: reqwest::Error) -> Self {
        FetchError::Http(why)
    }
}

impl From<DatabaseError> for FetchError {
    fn from(why: DatabaseError) -> Self {
        FetchError::Database(why)
    }
}
