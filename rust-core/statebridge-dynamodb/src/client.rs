// SPDX-License-Identifier: PMPL-1.0-or-later
//
// The slice of the DynamoDB API the state store needs.
//
// The store talks to `DynamoDbApi` rather than to the SDK client directly so
// that tests can substitute a mock without a network or credentials.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, WriteRequest};
use aws_sdk_dynamodb::Client;
use statebridge_state::StateError;

/// A DynamoDB item or key: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// Table name to write requests, as taken and returned by BatchWriteItem.
pub type BatchItems = HashMap<String, Vec<WriteRequest>>;

#[async_trait]
pub trait DynamoDbApi: Send + Sync {
    /// GetItem. Returns the item, or `None` if the service returned none.
    async fn get_item(
        &self,
        table: &str,
        key: Item,
        consistent_read: bool,
    ) -> Result<Option<Item>, StateError>;

    /// PutItem.
    async fn put_item(&self, table: &str, item: Item) -> Result<(), StateError>;

    /// DeleteItem.
    async fn delete_item(&self, table: &str, key: Item) -> Result<(), StateError>;

    /// BatchWriteItem. Returns the unprocessed items.
    async fn batch_write_item(&self, request_items: BatchItems) -> Result<BatchItems, StateError>;
}

fn backend_error<E: std::error::Error>(operation: &str, err: E) -> StateError {
    StateError::Backend(format!("{} failed: {}", operation, DisplayErrorContext(err)))
}

#[async_trait]
impl DynamoDbApi for Client {
    async fn get_item(
        &self,
        table: &str,
        key: Item,
        consistent_read: bool,
    ) -> Result<Option<Item>, StateError> {
        let output = Client::get_item(self)
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(consistent_read)
            .send()
            .await
            .map_err(|e| backend_error("GetItem", e))?;
        Ok(output.item)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StateError> {
        Client::put_item(self)
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| backend_error("PutItem", e))
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<(), StateError> {
        Client::delete_item(self)
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| backend_error("DeleteItem", e))
    }

    async fn batch_write_item(&self, request_items: BatchItems) -> Result<BatchItems, StateError> {
        let output = Client::batch_write_item(self)
            .set_request_items(Some(request_items))
            .send()
            .await
            .map_err(|e| backend_error("BatchWriteItem", e))?;
        Ok(output.unprocessed_items.unwrap_or_default())
    }
}
