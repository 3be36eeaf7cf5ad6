use serde::{Deserialize, Serialize};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapePoint {
    pub shape_id: String,
    pub sequence: i32,
    pub lat: f64,
    pub lon: f64,
    pub dist_traveled: Option<f64>,
}
