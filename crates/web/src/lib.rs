use std::sync::Arc;

use axum::Router;
use database::PgPool;
use realtime::scheduler::IngestionScheduler;
use schedule::ScheduleStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;

#[derive(Clone)]
pub struct WebState {
    pub pool: PgPool,
    pub store: Arc<ScheduleStore>,
    pub scheduler: IngestionScheduler,
    pub admin_token: Option<String>,
}

pub async fn start_web_server(state: WebState, bind: &str) -> std::io::Result<()> {
    let routes = Router::new()
        .nest("/api", api::routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind).await?;
    log::info!("web server listening on {bind}");
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
