//! MongoDB implementation of the document sink

use async_trait::async_trait;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::DocumentSink;
use crate::config::DocumentConfig;
use crate::error::LoadResult;

pub struct MongoSink {
    client: Client,
    database: Database,
}

impl MongoSink {
    /// Build a client for the configured deployment
    ///
    /// The driver connects lazily, so this does not touch the network. Use
    /// [`DocumentSink::ping`] to find out whether the server is reachable.
    pub async fn connect(config: &DocumentConfig) -> LoadResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));
        options.app_name = Some("storeload".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        debug!(database = %config.database, "MongoDB client created");

        Ok(Self { client, database })
    }

    fn to_bson(document: &Value) -> LoadResult<Document> {
        Ok(bson::to_document(document)?)
    }
}

fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentSink for MongoSink {
    async fn ping(&self) -> LoadResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        info!("MongoDB connection established");
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> LoadResult<usize> {
        let documents = documents
            .iter()
            .map(Self::to_bson)
            .collect::<LoadResult<Vec<_>>>()?;

        let result = self
            .database
            .collection::<Document>(collection)
            .insert_many(documents, None)
            .await?;

        Ok(result.inserted_ids.len())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> LoadResult<String> {
        let result = self
            .database
            .collection::<Document>(collection)
            .insert_one(Self::to_bson(&document)?, None)
            .await?;

        Ok(id_to_string(&result.inserted_id))
    }
}
