// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DynamoDB component metadata.

use statebridge_state::{Metadata, StateError};

/// Error text returned when any credential property is missing.
pub const MISSING_CREDENTIALS: &str = "missing aws credentials in metadata";

/// Connection settings parsed from component metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct DynamoDbMetadata {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub session_token: String,
    /// Target table. Not validated at init; calls fail at the service.
    pub table: String,
    /// Optional endpoint override, e.g. DynamoDB Local.
    pub endpoint: Option<String>,
}

impl DynamoDbMetadata {
    /// Parse `AccessKey`, `SecretKey`, `Region`, `SessionToken`, `Table` and
    /// `Endpoint` (names are case-insensitive).
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, StateError> {
        let credential = |name: &str| {
            metadata
                .get_non_empty(name)
                .map(str::to_string)
                .ok_or_else(|| StateError::MissingMetadata(MISSING_CREDENTIALS.to_string()))
        };

        Ok(Self {
            access_key: credential("AccessKey")?,
            region: credential("Region")?,
            secret_key: credential("SecretKey")?,
            session_token: credential("SessionToken")?,
            table: metadata.get("Table").unwrap_or_default().to_string(),
            endpoint: metadata.get_non_empty("Endpoint").map(str::to_string),
        })
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for DynamoDbMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbMetadata")
            .field("region", &self.region)
            .field("table", &self.table)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
