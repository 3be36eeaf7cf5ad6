use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use axum::Json;
use database::queries;
use model::network::{hidden_base_routes, Agency, Network};
use model::route::Route;

use crate::common::{ApiError, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/agencies", get(get_agencies))
        .route("/networks", get(get_networks))
        .route("/networks/:code", get(get_network))
        .route("/networks/:code/lines", get(get_network_lines))
        .with_state(state)
}

async fn get_agencies(State(state): State<WebState>) -> RouteResult<Vec<Agency>> {
    Ok(Json(queries::network::all_agencies(&state.pool).await?))
}

async fn get_networks(State(state): State<WebState>) -> RouteResult<Vec<Network>> {
    Ok(Json(queries::network::all_networks(&state.pool).await?))
}

async fn get_network(
    State(state): State<WebState>,
    Path(code): Path<String>,
) -> RouteResult<Network> {
    match queries::network::get_network(&state.pool, &code).await {
        Ok(network) => Ok(Json(network)),
        Err(database::DatabaseError::NotFound) => {
            Err(ApiError::NotFound(format!("network {code} not found")))
        }
        Err(why) => Err(why.into()),
    }
}

/// Lines of a network, with the network's variant policy applied: Cercanías
/// hides phantom base routes (C4 next to C4a/C4b), Metro keeps everything.
async fn get_network_lines(
    State(state): State<WebState>,
    Path(code): Path<String>,
) -> RouteResult<Vec<Route>> {
    let network = match queries::network::get_network(&state.pool, &code).await {
        Ok(network) => network,
        Err(database::DatabaseError::NotFound) => {
            return Err(ApiError::NotFound(format!("network {code} not found")))
        }
        Err(why) => return Err(why.into()),
    };

    let routes = queries::route::list(&state.pool, None, Some(&code), None).await?;
    let hidden = hidden_base_routes(
        network.variant_policy,
        routes.iter().map(|route| route.short_name.as_str()),
    );
    let filtered = routes
        .into_iter()
        .filter(|route| !hidden.contains(&route.short_name))
        .collect();
    Ok(Json(filtered))
}
