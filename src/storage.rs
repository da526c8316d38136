// Storage module - persists collected batches to MongoDB
//
// Each measurement is stored in its own collection, named after the
// measurement. A record becomes one document:
//
//   { timestamp: <date>, tags: { ... }, fields: { ... } }

use async_trait::async_trait;
use bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::{Client, Collection};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::metrics::{Batch, FieldValue, MetricRecord, MetricSink};

/// Errors that can occur while publishing metrics
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("MongoDB insert failed: {0}")]
    InsertError(#[from] mongodb::error::Error),

    #[error("write to output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document format: {0}")]
    InvalidDocument(String),
}

/// MongoDB metric sink
///
/// Documents of one batch are inserted measurement by measurement; a failed
/// insert is retried once and then dropped, so a storage hiccup never stops
/// the polling loop.
pub struct MetricStorage {
    /// MongoDB client for database operations
    client: Client,

    /// Database name where metrics are stored
    database_name: String,
}

impl MetricStorage {
    pub fn new(client: &Client, database_name: &str) -> Self {
        MetricStorage {
            client: client.clone(),
            database_name: database_name.to_string(),
        }
    }

    /// Connects to MongoDB and verifies the connection
    ///
    /// # Arguments
    /// * `connection_string` - MongoDB connection URI (e.g., "mongodb://localhost:27017")
    /// * `database_name` - Name of the database receiving the metrics
    pub async fn connect(connection_string: &str, database_name: &str) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(connection_string).await?;

        // Verify connection by listing databases (lightweight operation)
        if let Err(e) = client.list_database_names(None, None).await {
            warn!("MongoDB connection verification failed: {}", e);
            return Err(StorageError::InsertError(e));
        }
        info!("Successfully connected to MongoDB");

        Ok(MetricStorage::new(&client, database_name))
    }

    /// Stores a metric document in the specified collection
    pub async fn store_metric(
        &self,
        collection_name: &str,
        document: Document,
    ) -> Result<(), StorageError> {
        let db = self.client.database(&self.database_name);
        let collection: Collection<Document> = db.collection(collection_name);

        match collection.insert_one(document, None).await {
            Ok(result) => {
                debug!(
                    "Stored metric with id {:?} in collection '{}'",
                    result.inserted_id, collection_name
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to store metric in collection '{}': {}",
                    collection_name, e
                );
                Err(StorageError::InsertError(e))
            }
        }
    }

    /// Stores a metric, retrying once; failures are logged, not returned
    ///
    /// Returns whether the document was stored.
    pub async fn store_metric_safe(&self, collection_name: &str, document: Document) -> bool {
        const MAX_RETRIES: u32 = 1;

        for attempt in 0..=MAX_RETRIES {
            match self.store_metric(collection_name, document.clone()).await {
                Ok(()) => {
                    if attempt > 0 {
                        info!(
                            "Stored {} metric after {} retry(ies)",
                            collection_name, attempt
                        );
                    }
                    return true;
                }
                Err(e) if attempt < MAX_RETRIES => {
                    error!(
                        "Failed to store {} metric (attempt {}): {}. Retrying...",
                        collection_name,
                        attempt + 1,
                        e
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                }
                Err(e) => {
                    error!(
                        "Failed to store {} metric after {} attempts: {}. Giving up.",
                        collection_name,
                        attempt + 1,
                        e
                    );
                }
            }
        }
        false
    }

    /// Creates the entity/time index on a measurement collection
    ///
    /// Optional; speeds up "latest values of one entity" queries.
    pub async fn create_indexes(&self, collection_name: &str) -> Result<(), StorageError> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        info!("Creating indexes for collection '{}'", collection_name);

        let db = self.client.database(&self.database_name);
        let collection: Collection<Document> = db.collection(collection_name);

        let index = IndexModel::builder()
            .keys(doc! {
                "tags.ovirt-engine": 1,
                "tags.id": 1,
                "timestamp": -1
            })
            .options(IndexOptions::builder().name("entity_timestamp_idx".to_string()).build())
            .build();

        collection.create_index(index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricSink for MetricStorage {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn publish(&self, batch: &Batch) -> Result<(), StorageError> {
        let (documents, mut failed) = batch_documents(batch);
        for (measurement, document) in documents {
            if !self.store_metric_safe(measurement, document).await {
                failed += 1;
            }
        }
        if failed > 0 {
            warn!("{} of {} record(s) were not stored", failed, batch.records().len());
        }
        Ok(())
    }
}

/// Converts the records of a batch, skipping those that cannot be stored
///
/// Returns the documents with their measurement and the number of records
/// that were skipped.
fn batch_documents(batch: &Batch) -> (Vec<(&'static str, Document)>, usize) {
    let mut documents = Vec::with_capacity(batch.records().len());
    let mut skipped = 0;
    for record in batch.records() {
        match record_document(record) {
            Ok(document) => documents.push((record.measurement, document)),
            Err(e) => {
                warn!("Skipping {} record: {}", record.measurement, e);
                skipped += 1;
            }
        }
    }
    (documents, skipped)
}

/// Converts a record into its MongoDB document
pub fn record_document(record: &MetricRecord) -> Result<Document, StorageError> {
    let mut tags = Document::new();
    for (key, value) in &record.tags {
        tags.insert(*key, value.as_str());
    }

    let mut fields = Document::new();
    for (key, value) in &record.fields {
        let value = match value {
            FieldValue::Int(v) => Bson::Int64(*v),
            FieldValue::Float(v) if v.is_finite() => Bson::Double(*v),
            FieldValue::Float(v) => {
                return Err(StorageError::InvalidDocument(format!(
                    "{}.{} is not a finite number: {}",
                    record.measurement, key, v
                )))
            }
            FieldValue::Bool(v) => Bson::Boolean(*v),
            FieldValue::Str(v) => Bson::String(v.clone()),
        };
        fields.insert(*key, value);
    }

    Ok(doc! {
        "timestamp": BsonDateTime::from_chrono(record.timestamp),
        "tags": tags,
        "fields": fields,
    })
}
