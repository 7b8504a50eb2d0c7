use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SinkUnavailable;
use crate::requests::RequestClient;

// Keep error context readable in logs without dumping whole response bodies.
const BODY_PREVIEW_LEN: usize = 500;

#[derive(Serialize)]
struct InsertManyRequest<'a> {
    database: &'a str,
    collection: &'a str,
    documents: &'a [Value],
}

#[derive(Serialize)]
struct InsertOneRequest<'a> {
    database: &'a str,
    collection: &'a str,
    document: &'a Value,
}

#[derive(Serialize)]
struct CollectionRequest<'a> {
    database: &'a str,
    collection: &'a str,
    filter: Value,
}

#[derive(Deserialize, Default)]
struct FindResponse {
    #[serde(default)]
    documents: Vec<Value>,
}

/// HTTP document-store sink, addressed by `(database, collection)`.
///
/// The store is an opaque document bag: insert one/many, replace a whole
/// collection, read a whole collection. Every call walks the ordered
/// endpoint candidates until one succeeds; only after the whole list is
/// exhausted does it surface `SinkUnavailable`.
pub struct DocumentStore {
    client: RequestClient,
    endpoints: Vec<String>,
    database: String,
}

impl DocumentStore {
    pub fn new(endpoints: Vec<String>, database: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: RequestClient::new()?,
            endpoints,
            database: database.into(),
        })
    }

    pub async fn insert_many(
        &self,
        collection: &str,
        documents: &[Value],
    ) -> Result<usize, SinkUnavailable> {
        let payload = InsertManyRequest {
            database: &self.database,
            collection,
            documents,
        };
        self.post_any("insertMany", collection, &payload).await?;
        info!(
            "inserted {} documents into {}.{}",
            documents.len(),
            self.database,
            collection
        );
        Ok(documents.len())
    }

    pub async fn insert_one(
        &self,
        collection: &str,
        document: &Value,
    ) -> Result<(), SinkUnavailable> {
        let payload = InsertOneRequest {
            database: &self.database,
            collection,
            document,
        };
        self.post_any("insert", collection, &payload).await?;
        Ok(())
    }

    /// Replace all records in a collection: delete everything, insert anew.
    pub async fn replace_collection(
        &self,
        collection: &str,
        documents: &[Value],
    ) -> Result<usize, SinkUnavailable> {
        let delete = CollectionRequest {
            database: &self.database,
            collection,
            filter: Value::Object(Default::default()),
        };
        self.post_any("deleteMany", collection, &delete).await?;
        self.insert_many(collection, documents).await
    }

    /// Full-collection read.
    pub async fn read_all(&self, collection: &str) -> Result<Vec<Value>, SinkUnavailable> {
        let payload = CollectionRequest {
            database: &self.database,
            collection,
            filter: Value::Object(Default::default()),
        };
        let body = self.post_any("find", collection, &payload).await?;
        let parsed: FindResponse = serde_json::from_str(&body).unwrap_or_default();
        Ok(parsed.documents)
    }

    /// Try each endpoint candidate in order; first success wins.
    async fn post_any<T: Serialize>(
        &self,
        operation: &str,
        collection: &str,
        payload: &T,
    ) -> Result<String, SinkUnavailable> {
        let mut last_failure = String::from("no endpoints configured");
        for endpoint in &self.endpoints {
            let url = format!("{}/mongodb/{}", endpoint.trim_end_matches('/'), operation);
            match self.client.post_json(&url, payload).await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if status.is_success() {
                        return Ok(body);
                    }
                    last_failure = format!("{url} returned {status}: {}", body_preview(&body));
                    warn!("document store call failed, {last_failure}");
                }
                Err(e) => {
                    last_failure = format!("{url}: {e:#}");
                    warn!("document store call failed, {last_failure}");
                }
            }
        }
        Err(SinkUnavailable::new(
            format!("{operation} on {}.{collection}", self.database),
            self.endpoints.len(),
            last_failure,
        ))
    }
}

pub(crate) fn body_preview(body: &str) -> String {
    let mut preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
    if preview.len() < body.len() {
        preview.push_str("...");
    }
    preview
}
