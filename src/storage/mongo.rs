use super::{Movie, MovieFilter, MovieRepository, StorageError, StorageResult};
use crate::config::MongoConfig;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// MongoDB-backed movie store.
///
/// The client is created once at startup and shared by every request;
/// its connection pool is managed by the driver.
pub struct MongoMovieStore {
    client: Client,
    collection: Collection<Document>,
    operation_timeout: Duration,
}

impl MongoMovieStore {
    /// Connect and ping the store. Any failure here should abort startup.
    pub async fn connect(config: &MongoConfig) -> StorageResult<Self> {
        let mut options = ClientOptions::parse(&config.conn_str)
            .await
            .map_err(|e| StorageError::Connect(format!("invalid connection string: {}", e)))?;

        // Only fill in credentials when the URI asks for authentication.
        if let Some(credential) = options.credential.as_mut() {
            credential.username = Some(config.username.clone());
            credential.password = Some(config.password.clone());
        }

        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.connect_timeout());
        options.max_idle_time = Some(Duration::from_secs(60));
        options.heartbeat_freq = Some(Duration::from_secs(5));

        let client =
            Client::with_options(options).map_err(|e| StorageError::Connect(e.to_string()))?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        let store = Self {
            client,
            collection,
            operation_timeout: config.operation_timeout(),
        };
        store.ping().await?;

        info!(
            database = %config.database,
            collection = %config.collection,
            "Connected to MongoDB"
        );

        Ok(store)
    }

    /// Run `fut` under the per-operation timeout
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| {
                warn!(operation, timeout = ?self.operation_timeout, "Store operation timed out");
                StorageError::Timeout { operation }
            })
    }

    #[cfg(test)]
    async fn drop_collection(&self) {
        let _ = self.collection.drop().await;
    }
}

fn filter_document(filter: &MovieFilter) -> Document {
    match filter.title() {
        Some(title) => doc! { "title": title },
        None => doc! {},
    }
}

fn decode_movie(document: Document) -> StorageResult<Movie> {
    bson::from_document(document).map_err(|e| StorageError::Decode(e.to_string()))
}

/// Read `moviedetail.votes` without decoding the rest of the document
fn post_increment_votes(document: &Document) -> StorageResult<i64> {
    let detail = document
        .get_document("moviedetail")
        .map_err(|e| StorageError::Decode(format!("moviedetail: {}", e)))?;

    match detail.get("votes") {
        Some(Bson::Int64(votes)) => Ok(*votes),
        Some(Bson::Int32(votes)) => Ok(i64::from(*votes)),
        other => Err(StorageError::Decode(format!(
            "moviedetail.votes: unexpected value {:?}",
            other
        ))),
    }
}

#[async_trait]
impl MovieRepository for MongoMovieStore {
    async fn find_all(&self, filter: &MovieFilter) -> StorageResult<Vec<Movie>> {
        let documents: Vec<Document> = self
            .bounded("find", async {
                let cursor = self.collection.find(filter_document(filter)).await?;
                cursor.try_collect::<Vec<Document>>().await
            })
            .await?
            .map_err(|e| StorageError::Query(e.to_string()))?;

        debug!(count = documents.len(), "Fetched movie documents");

        documents.into_iter().map(decode_movie).collect()
    }

    async fn find_one(&self, filter: &MovieFilter) -> StorageResult<Movie> {
        let document = self
            .bounded("find_one", self.collection.find_one(filter_document(filter)).into_future())
            .await?
            .map_err(|e| StorageError::Query(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        decode_movie(document)
    }

    async fn insert(&self, movie: &Movie) -> StorageResult<String> {
        let document = bson::to_document(movie).map_err(|e| StorageError::Insert(e.to_string()))?;

        let result = self
            .bounded("insert_one", self.collection.insert_one(document).into_future())
            .await?
            .map_err(|e| StorageError::Insert(e.to_string()))?;

        Ok(match result.inserted_id {
            Bson::ObjectId(id) => id.to_hex(),
            other => other.to_string(),
        })
    }

    async fn delete_one(&self, filter: &MovieFilter) -> StorageResult<u64> {
        let result = self
            .bounded("delete_one", self.collection.delete_one(filter_document(filter)).into_future())
            .await?
            .map_err(|e| StorageError::Delete(e.to_string()))?;

        Ok(result.deleted_count)
    }

    async fn increment_vote(&self, filter: &MovieFilter) -> StorageResult<i64> {
        let update = doc! { "$inc": { "moviedetail.votes": 1_i64 } };

        let document = self
            .bounded(
                "find_one_and_update",
                self.collection
                    .find_one_and_update(filter_document(filter), update)
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .into_future(),
            )
            .await?
            .map_err(|e| StorageError::Vote(e.to_string()))?
            .ok_or_else(|| StorageError::Vote("upsert returned no document".to_string()))?;

        post_increment_votes(&document)
    }

    async fn ping(&self) -> StorageResult<()> {
        self.client
            .database(self.collection.namespace().db.as_str())
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StorageError::Connect(e.to_string()))?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB client shut down");
    }
}
