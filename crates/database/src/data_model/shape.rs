use model::shape::ShapePoint;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ShapePointRow {
    pub shape_id: String,
    pub sequence: i32,
    pub lat: f64,
    pub lon: f64,
    pub dist_traveled: Option<f64>,
}

impl From<ShapePointRow> for ShapePoint {
    fn from(row: ShapePointRow) -> Self {
        ShapePoint {
            shape_id: row.shape_id,
            sequence: row.sequence,
            lat: row.lat,
            lon: row.lon,
            dist_traveled: row.dist_traveled,
        }
    }
}
