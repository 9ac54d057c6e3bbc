// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DynamoDB-backed state store.
//
// Items use the partition key attribute `key` (S) and keep the value in the
// `value` attribute: S when the bytes are valid UTF-8, B otherwise. Bulk
// operations issue one BatchWriteItem call; nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest as DeleteItemRequest, PutRequest, WriteRequest};
use statebridge_state::{
    validate_key, Consistency, DeleteRequest, GetRequest, GetResponse, Metadata, SetRequest,
    StateError, StateStore,
};
use tracing::{debug, info, warn};

use crate::client::{BatchItems, DynamoDbApi, Item};
use crate::metadata::DynamoDbMetadata;

/// Partition key attribute name.
pub const KEY_ATTRIBUTE: &str = "key";
/// Value attribute name.
pub const VALUE_ATTRIBUTE: &str = "value";

/// Name used in logs and reports.
const STORE_NAME: &str = "aws.dynamodb";

/// A [`StateStore`] backed by a single DynamoDB table.
pub struct DynamoDbStateStore {
    client: Option<Arc<dyn DynamoDbApi>>,
    table: String,
}

impl DynamoDbStateStore {
    /// Create an uninitialized store; call [`StateStore::init`] before use.
    pub fn new() -> Self {
        Self {
            client: None,
            table: String::new(),
        }
    }

    /// Create a store over an existing client, skipping `init`.
    pub fn with_client(client: impl DynamoDbApi + 'static, table: impl Into<String>) -> Self {
        Self {
            client: Some(Arc::new(client)),
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn client(&self) -> Result<&dyn DynamoDbApi, StateError> {
        self.client
            .as_deref()
            .ok_or_else(|| StateError::NotInitialized(STORE_NAME.to_string()))
    }

    /// Build an SDK client from parsed metadata.
    async fn connect(meta: &DynamoDbMetadata) -> aws_sdk_dynamodb::Client {
        let credentials = Credentials::new(
            meta.access_key.clone(),
            meta.secret_key.clone(),
            Some(meta.session_token.clone()),
            None,
            "statebridge-metadata",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(meta.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &meta.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        aws_sdk_dynamodb::Client::new(&loader.load().await)
    }

    fn batch(&self, requests: Vec<WriteRequest>) -> BatchItems {
        HashMap::from([(self.table.clone(), requests)])
    }

    async fn write_batch(&self, operation: &str, requests: Vec<WriteRequest>) -> Result<(), StateError> {
        if requests.is_empty() {
            return Ok(());
        }
        let count = requests.len();
        let unprocessed = self.client()?.batch_write_item(self.batch(requests)).await?;
        let left: usize = unprocessed.values().map(Vec::len).sum();
        if left > 0 {
            warn!(table = %self.table, operation, requested = count, unprocessed = left, "batch write left unprocessed items");
        } else {
            debug!(table = %self.table, operation, items = count, "batch write");
        }
        Ok(())
    }
}

impl Default for DynamoDbStateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key_item(key: &str) -> Item {
    HashMap::from([(KEY_ATTRIBUTE.to_string(), AttributeValue::S(key.to_string()))])
}

fn value_attribute(value: &[u8]) -> AttributeValue {
    match std::str::from_utf8(value) {
        Ok(s) => AttributeValue::S(s.to_string()),
        Err(_) => AttributeValue::B(Blob::new(value.to_vec())),
    }
}

fn put_item(req: &SetRequest) -> Item {
    let mut item = key_item(&req.key);
    item.insert(VALUE_ATTRIBUTE.to_string(), value_attribute(&req.value));
    item
}

/// Decode the `value` attribute. An item without one reads as empty data.
fn decode_value(key: &str, item: &mut Item) -> Result<Vec<u8>, StateError> {
    match item.remove(VALUE_ATTRIBUTE) {
        None => Ok(Vec::new()),
        Some(AttributeValue::S(s)) => Ok(s.into_bytes()),
        Some(AttributeValue::B(b)) => Ok(b.into_inner()),
        Some(AttributeValue::N(n)) => Ok(n.into_bytes()),
        Some(other) => Err(StateError::Serialization(format!(
            "unsupported attribute type for key '{}': {:?}",
            key, other
        ))),
    }
}

#[async_trait]
impl StateStore for DynamoDbStateStore {
    async fn init(&mut self, metadata: Metadata) -> Result<(), StateError> {
        let meta = DynamoDbMetadata::from_metadata(&metadata)?;
        if meta.table.is_empty() {
            warn!("no Table configured for dynamodb state store");
        }
        let client = Self::connect(&meta).await;
        info!(region = %meta.region, table = %meta.table, endpoint = ?meta.endpoint, "initialized dynamodb state store");
        self.client = Some(Arc::new(client));
        self.table = meta.table;
        Ok(())
    }

    async fn get(&self, req: &GetRequest) -> Result<GetResponse, StateError> {
        validate_key(&req.key)?;
        let consistent = req.options.consistency == Consistency::Strong;
        let item = self
            .client()?
            .get_item(&self.table, key_item(&req.key), consistent)
            .await?;
        debug!(key = %req.key, consistent, found = item.as_ref().is_some_and(|i| !i.is_empty()), "GetItem");

        match item {
            Some(mut item) if !item.is_empty() => {
                let data = decode_value(&req.key, &mut item)?;
                Ok(GetResponse::found(data))
            }
            _ => Ok(GetResponse::not_found()),
        }
    }

    async fn set(&self, req: &SetRequest) -> Result<(), StateError> {
        validate_key(&req.key)?;
        debug!(key = %req.key, bytes = req.value.len(), "PutItem");
        self.client()?.put_item(&self.table, put_item(req)).await
    }

    async fn delete(&self, req: &DeleteRequest) -> Result<(), StateError> {
        validate_key(&req.key)?;
        debug!(key = %req.key, "DeleteItem");
        self.client()?.delete_item(&self.table, key_item(&req.key)).await
    }

    async fn bulk_set(&self, reqs: &[SetRequest]) -> Result<(), StateError> {
        let mut requests = Vec::with_capacity(reqs.len());
        for req in reqs {
            validate_key(&req.key)?;
            let put = PutRequest::builder()
                .set_item(Some(put_item(req)))
                .build()
                .map_err(|e| StateError::InvalidRequest(e.to_string()))?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }
        self.write_batch("bulk_set", requests).await
    }

    async fn bulk_delete(&self, reqs: &[DeleteRequest]) -> Result<(), StateError> {
        let mut requests = Vec::with_capacity(reqs.len());
        for req in reqs {
            validate_key(&req.key)?;
            let delete = DeleteItemRequest::builder()
                .set_key(Some(key_item(&req.key)))
                .build()
                .map_err(|e| StateError::InvalidRequest(e.to_string()))?;
            requests.push(WriteRequest::builder().delete_request(delete).build());
        }
        self.write_batch("bulk_delete", requests).await
    }

    fn name(&self) -> &str {
        STORE_NAME
    }
}
