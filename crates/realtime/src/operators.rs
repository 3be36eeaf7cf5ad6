//! Operator registry: who is fetched, in which wire format, from where.

use std::env;

use utility::ids::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// Standard GTFS-RT protobuf (Metro Bilbao, Euskotren, FGC).
    Protobuf,
    /// GTFS-RT semantics carried as JSON (Renfe).
    RenfeJson,
    /// TMB iMetro prediction REST API.
    TmbApi,
    /// Metrovalencia station prediction REST API.
    MetrovalenciaApi,
}

#[derive(Debug, Clone)]
pub struct TmbCredentials {
    pub app_id: String,
    pub app_key: String,
}

#[derive(Debug, Clone)]
pub struct OperatorConfig {
    pub operator: Operator,
    pub format: FeedFormat,
    pub vehicle_positions_url: Option<String>,
    pub trip_updates_url: Option<String>,
    pub alerts_url: Option<String>,
    /// Station/prediction endpoint of the REST formats.
    pub stations_url: Option<String>,
    /// Per-station realtime endpoint (Metrovalencia).
    pub realtime_url: Option<String>,
    pub tmb_credentials: Option<TmbCredentials>,
}

fn url_from_env(name: &str, default: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if value.is_empty() => None,
        Ok(value) => Some(value),
        Err(_) => Some(default.to_owned()),
    }
}

fn renfe() -> OperatorConfig {
    OperatorConfig {
        operator: Operator::Renfe,
        format: FeedFormat::RenfeJson,
        vehicle_positions_url: url_from_env(
            "RENFE_VEHICLE_POSITIONS_URL",
            "https://gtfsrt.renfe.com/vehicle_positions.json",
        ),
        trip_updates_url: url_from_env(
            "RENFE_TRIP_UPDATES_URL",
            "https://gtfsrt.renfe.com/trip_updates.json",
        ),
        alerts_url: url_from_env("RENFE_ALERTS_URL", "https://gtfsrt.renfe.com/alerts.json"),
        stations_url: None,
        realtime_url: None,
        tmb_credentials: None,
    }
}

fn metro_bilbao() -> OperatorConfig {
    OperatorConfig {
        operator: Operator::MetroBilbao,
        format: FeedFormat::Protobuf,
        vehicle_positions_url: url_from_env(
            "METRO_BILBAO_VEHICLE_POSITIONS_URL",
            "https://opendata.euskadi.eus/transport/moveuskadi/metro_bilbao/gtfsrt_metro_bilbao_vehicle_positions.pb",
        ),
        trip_updates_url: url_from_env(
            "METRO_BILBAO_TRIP_UPDATES_URL",
            "https://opendata.euskadi.eus/transport/moveuskadi/metro_bilbao/gtfsrt_metro_bilbao_trip_updates.pb",
        ),
        alerts_url: url_from_env(
            "METRO_BILBAO_ALERTS_URL",
            "https://opendata.euskadi.eus/transport/moveuskadi/metro_bilbao/gtfsrt_metro_bilbao_alerts.pb",
        ),
        stations_url: None,
        realtime_url: None,
        tmb_credentials: None,
    }
}

fn euskotren() -> OperatorConfig {
    OperatorConfig {
        operator: Operator::Euskotren,
        format: FeedFormat::Protobuf,
        vehicle_positions_url: url_from_env(
            "EUSKOTREN_VEHICLE_POSITIONS_URL",
            "https://opendata.euskadi.eus/transport/moveuskadi/euskotren/gtfsrt_euskotren_vehicle_positions.pb",
        ),
        trip_updates_url: url_from_env(
            "EUSKOTREN_TRIP_UPDATES_URL",
            "https://opendata.euskadi.eus/transport/moveuskadi/euskotren/gtfsrt_euskotren_trip_updates.pb",
        ),
        alerts_url: url_from_env(
            "EUSKOTREN_ALERTS_URL",
            "https://opendata.euskadi.eus/transport/moveuskadi/euskotren/gtfsrt_euskotren_alerts.pb",
        ),
        stations_url: None,
        realtime_url: None,
        tmb_credentials: None,
    }
}

fn fgc() -> OperatorConfig {
    OperatorConfig {
        operator: Operator::Fgc,
        format: FeedFormat::Protobuf,
        vehicle_positions_url: url_from_env(
            "FGC_VEHICLE_POSITIONS_URL",
            "https://dadesobertes.fgc.cat/api/explore/v2.1/catalog/datasets/vehicle-positions-gtfs_realtime/files/d286964db2d107ecdb1344bf02f7b27b",
        ),
        trip_updates_url: url_from_env(
            "FGC_TRIP_UPDATES_URL",
            "https://dadesobertes.fgc.cat/api/explore/v2.1/catalog/datasets/trip-updates-gtfs_realtime/files/735985017f62fd33b2fe46e31ce53829",
        ),
        alerts_url: url_from_env(
            "FGC_ALERTS_URL",
            "https://dadesobertes.fgc.cat/api/explore/v2.1/catalog/datasets/alerts-gtfs_realtime/files/02f92ddc6d2712788903e54468542936",
        ),
        stations_url: None,
        realtime_url: None,
        tmb_credentials: None,
    }
}

fn tmb() -> Option<OperatorConfig> {
    // Without API credentials the TMB worker is disabled entirely.
    let app_id = env::var("TMB_APP_ID").ok().filter(|v| !v.is_empty())?;
    let app_key = env::var("TMB_APP_KEY").ok().filter(|v| !v.is_empty())?;
    Some(OperatorConfig {
        operator: Operator::TmbMetro,
        format: FeedFormat::TmbApi,
        vehicle_positions_url: None,
        trip_updates_url: None,
        alerts_url: None,
        stations_url: url_from_env(
            "TMB_STATIONS_URL",
            "https://api.tmb.cat/v1/imetro/estacions",
        ),
        realtime_url: None,
        tmb_credentials: Some(TmbCredentials { app_id, app_key }),
    })
}

fn metrovalencia() -> OperatorConfig {
    OperatorConfig {
        operator: Operator::Metrovalencia,
        format: FeedFormat::MetrovalenciaApi,
        vehicle_positions_url: None,
        trip_updates_url: None,
        alerts_url: None,
        stations_url: url_from_env(
            "METROVALENCIA_STATIONS_URL",
            "https://valencia.opendatasoft.com/api/explore/v2.1/catalog/datasets/fgv-estacions-estaciones/exports/json",
        ),
        realtime_url: url_from_env(
            "METROVALENCIA_REALTIME_URL",
            "https://geoportal.valencia.es/geoportal-services/api/v1/salidas-metro.json",
        ),
        tmb_credentials: None,
    }
}

/// The operators to poll this run, after applying env overrides and
/// credential gating.
pub fn configured_operators() -> Vec<OperatorConfig> {
    let mut operators = vec![renfe(), metro_bilbao(), euskotren(), fgc()];
    match tmb() {
        Some(config) => operators.push(config),
        None => log::info!("TMB credentials missing, TMB worker disabled"),
    }
    operators.push(metrovalencia());
    operators
}
