use serde::{Deserialize, Serialize};

/// A directed walking link between two stops. Bidirectional passages are two
/// rows in the source data.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correspondence {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub distance_m: Option<f64>,
    pub walk_time_s: Option<i32>,
    pub source: Option<String>,
}
