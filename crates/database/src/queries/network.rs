use model::network::{Agency, Network};
use sqlx::{Executor, Postgres};

use crate::data_model::network::{AgencyRow, NetworkRow};
use crate::Result;

use super::convert_error;

pub async fn all_networks<'c, E>(executor: E) -> Result<Vec<Network>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<NetworkRow> = sqlx::query_as(
        "
        SELECT code, name, region, transport_type, color, text_color, variant_policy
        FROM gtfs_networks
        ORDER BY name;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn get_network<'c, E>(executor: E, code: &str) -> Result<Network>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: NetworkRow = sqlx::query_as(
        "
        SELECT code, name, region, transport_type, color, text_color, variant_policy
        FROM gtfs_networks
        WHERE code = $1;
        ",
    )
    .bind(code)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(row.into())
}

pub async fn all_agencies<'c, E>(executor: E) -> Result<Vec<Agency>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<AgencyRow> = sqlx::query_as(
        "SELECT id, name, url, timezone FROM gtfs_agencies ORDER BY name;",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}
