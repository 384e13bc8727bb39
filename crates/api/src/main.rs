use creatorhub_api::{build_router, state::AppState};
use creatorhub_config::Settings;
use creatorhub_db::{connect_lazy, indexes::ensure_indexes};
use creatorhub_services::{Backends, Core, SystemClock, notification::notifier};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "creatorhub_api=debug,creatorhub_services=debug,creatorhub_db=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting CreatorHub API on {}:{}", settings.app.host, settings.app.port);

    // The stores fall back to memory while MongoDB is down.
    let db = connect_lazy(&settings).await?;
    if let Err(e) = ensure_indexes(&db).await {
        warn!(%e, "Index creation failed, continuing");
    }

    let backends = Backends::mongo(&db);
    let (core, worker) = Core::build(
        &backends,
        &settings,
        Arc::new(SystemClock),
        notifier::from_settings(&settings.notifications),
    );
    worker.spawn();

    let app = build_router(AppState::new(core, settings.clone()));

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
