//! Wire-format decoders. Each turns a fetched blob into normalized domain
//! entities; per-entity problems are logged and skipped, per-feed problems
//! surface as [`crate::FetchError::Decode`].

pub mod metrovalencia;
pub mod platform;
pub mod protobuf;
pub mod renfe;
pub mod tmb;

use model::realtime::VehiclePosition;

/// A vehicle position plus the side-channel attributes the feeds carry that
/// only matter for platform-history learning.
#[derive(Debug, Clone)]
pub struct DecodedPosition {
    pub position: VehiclePosition,
    pub route_short_name: Option<String>,
    pub headsign: Option<String>,
}
