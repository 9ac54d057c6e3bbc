// SPDX-License-Identifier: PMPL-1.0-or-later
//! statebridge DynamoDB state store
//!
//! Implements `statebridge_state::StateStore` on a single DynamoDB table
//! through the AWS SDK. The adapter is a translation layer only: consistency,
//! retries and throttling are whatever the SDK and the service provide.
//!
//! Component metadata:
//!
//! | property | required | meaning |
//! |----------|----------|---------|
//! | `AccessKey` | yes | AWS access key id |
//! | `SecretKey` | yes | AWS secret access key |
//! | `SessionToken` | yes | AWS session token |
//! | `Region` | yes | AWS region |
//! | `Table` | no | table holding the `key`/`value` items |
//! | `Endpoint` | no | endpoint override, e.g. DynamoDB Local |

pub mod client;
pub mod metadata;
pub mod store;

pub use client::{BatchItems, DynamoDbApi, Item};
pub use metadata::{DynamoDbMetadata, MISSING_CREDENTIALS};
pub use store::{DynamoDbStateStore, KEY_ATTRIBUTE, VALUE_ATTRIBUTE};
