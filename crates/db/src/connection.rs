use mongodb::{Client, Database, options::ClientOptions};
use creatorhub_config::Settings;
use std::time::Duration;
use tracing::{info, warn};

pub async fn connect(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let client = client(settings).await?;

    // Verify connection
    client
        .database("admin")
        .run_command(bson::doc! { "ping": 1 })
        .await?;

    info!(db = %settings.database.name, "Connected to MongoDB");

    Ok(client.database(&settings.database.name))
}

/// Like [`connect`], but a failed ping only warns. The driver reconnects on
/// demand, and until it does the stores serve from their in-memory mirrors.
pub async fn connect_lazy(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let client = client(settings).await?;

    if let Err(e) = client
        .database("admin")
        .run_command(bson::doc! { "ping": 1 })
        .await
    {
        warn!(%e, db = %settings.database.name, "MongoDB unreachable, starting degraded");
    } else {
        info!(db = %settings.database.name, "Connected to MongoDB");
    }

    Ok(client.database(&settings.database.name))
}

async fn client(settings: &Settings) -> Result<Client, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&settings.database.url).await?;

    if let Some(max_pool) = settings.database.max_pool_size {
        client_options.max_pool_size = Some(max_pool);
    }
    if let Some(min_pool) = settings.database.min_pool_size {
        client_options.min_pool_size = Some(min_pool);
    }
    client_options.server_selection_timeout = Some(Duration::from_millis(
        settings.database.server_selection_timeout_ms,
    ));

    Client::with_options(client_options)
}
