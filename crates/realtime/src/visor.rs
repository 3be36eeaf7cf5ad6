//! Renfe's public departures visor. Used as a platform fallback for stations
//! whose GTFS-RT feed omits track numbers.

use std::time::Duration;

use serde::Deserialize;

use crate::FetchError;

const VISOR_BASE_URL: &str =
    "https://tiempo-real.renfe.com/renfe-json-cutter/write/salidas/estacion";
const VISOR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct VisorResponse {
    estacion: Option<VisorStation>,
}

#[derive(Debug, Deserialize)]
struct VisorStation {
    #[serde(default)]
    salidas: Vec<VisorDeparture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisorDeparture {
    pub via: Option<String>,
    #[serde(rename = "tripId")]
    pub trip_id: Option<String>,
    pub linea: Option<String>,
    #[serde(rename = "destinoNombre")]
    pub destino_nombre: Option<String>,
}

/// Listed departures for one station, by its numeric Renfe code.
pub async fn station_departures(
    http: &reqwest::Client,
    stop_code: &str,
) -> Result<Vec<VisorDeparture>, FetchError> {
    let url = format!("{VISOR_BASE_URL}/{stop_code}.json");
    let response = http
        .get(&url)
        .timeout(VISOR_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    let body: VisorResponse = response
        .json()
        .await
        .map_err(|why| FetchError::Decode(why.to_string()))?;
    Ok(body.estacion.map(|station| station.salidas).unwrap_or_default())
}
