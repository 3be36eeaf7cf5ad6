use model::stop::{LocationType, Stop, StopAccess, StopPlatform, StopVestibule};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct StopRow {
    pub id: String,
    pub code: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub location_type: i16,
    pub parent_station_id: Option<String>,
    pub zone_id: Option<String>,
    pub province: Option<String>,
    pub lineas: Option<String>,
    pub accesibilidad: Option<String>,
    pub cor_bus: Option<String>,
    pub cor_metro: Option<String>,
    pub cor_ml: Option<String>,
    pub cor_cercanias: Option<String>,
    pub cor_tranvia: Option<String>,
}

impl From<StopRow> for Stop {
    fn from(row: StopRow) -> Self {
        Stop {
            id: row.id,
            name: row.name,
            lat: row.lat,
            lon: row.lon,
            code: row.code,
            location_type: LocationType::from_i16(row.location_type),
            parent_station_id: row.parent_station_id,
            zone_id: row.zone_id,
            province: row.province,
            lineas: row.lineas,
            accesibilidad: row.accesibilidad,
            cor_bus: row.cor_bus,
            cor_metro: row.cor_metro,
            cor_ml: row.cor_ml,
            cor_cercanias: row.cor_cercanias,
            cor_tranvia: row.cor_tranvia,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopPlatformRow {
    pub stop_id: String,
    pub lines: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub color: Option<String>,
    pub source: Option<String>,
}

impl From<StopPlatformRow> for StopPlatform {
    fn from(row: StopPlatformRow) -> Self {
        StopPlatform {
            stop_id: row.stop_id,
            lines: row.lines,
            lat: row.lat,
            lon: row.lon,
            color: row.color,
            source: row.source,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopAccessRow {
    pub stop_id: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl From<StopAccessRow> for StopAccess {
    fn from(row: StopAccessRow) -> Self {
        StopAccess {
            stop_id: row.stop_id,
            name: row.name,
            lat: row.lat,
            lon: row.lon,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopVestibuleRow {
    pub stop_id: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl From<StopVestibuleRow> for StopVestibule {
    fn from(row: StopVestibuleRow) -> Self {
        StopVestibule {
            stop_id: row.stop_id,
            name: row.name,
            lat: row.lat,
            lon: row.lon,
        }
    }
}
