use model::transfer::Correspondence;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CorrespondenceRow {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub distance_m: Option<f64>,
    pub walk_time_s: Option<i32>,
    pub source: Option<String>,
}

impl From<CorrespondenceRow> for Correspondence {
    fn from(row: CorrespondenceRow) -> Self {
        Correspondence {
            from_stop_id: row.from_stop_id,
            to_stop_id: row.to_stop_id,
            distance_m: row.distance_m,
            walk_time_s: row.walk_time_s,
            source: row.source,
        }
    }
}
