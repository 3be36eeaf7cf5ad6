use std::env;
use std::sync::Arc;

use chrono::Utc;
use realtime::classifier::NoopClassifier;
use realtime::scheduler::IngestionScheduler;
use schedule::ScheduleStore;
use utility::holidays::MADRID_TZ;
use web::{start_web_server, WebState};

#[tokio::main]
async fn main() {
    env_logger::init();

    // database
    let pool = database::connect()
        .await
        .expect("could not connect to database");

    let store = Arc::new(ScheduleStore::new());
    let scheduler = IngestionScheduler::new(pool.clone(), Arc::new(NoopClassifier));

    let state = WebState {
        pool: pool.clone(),
        store: store.clone(),
        scheduler: scheduler.clone(),
        admin_token: env::var("ADMIN_TOKEN").ok(),
    };

    // Load the schedule, then start polling the operators. The web server
    // comes up immediately and reports 503 on its readiness probe until the
    // load completes.
    {
        let store = store.clone();
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let today = Utc::now().with_timezone(&MADRID_TZ).date_naive();
            if let Err(why) = store.load(&pool, today).await {
                log::error!("initial schedule load failed: {why}");
                return;
            }
            let _ = scheduler.start();
        });
    }

    // graceful shutdown of the ingestion loop
    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                scheduler.shutdown();
            }
        });
    }

    let bind = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    if let Err(why) = start_web_server(state, &bind).await {
        log::error!("web server exited: {why}");
    }
}
