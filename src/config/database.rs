use bson::doc;
use mongodb::{Client, Database};

use crate::config::Settings;

pub async fn connect(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(&settings.mongo_uri).await?;
    let db = client.database(&settings.database);

    // The driver connects lazily; ping so a bad URI fails here and not mid-run.
    db.run_command(doc! { "ping": 1 }).await?;
    tracing::info!(database = %settings.database, "connected to MongoDB");

    Ok(db)
}
