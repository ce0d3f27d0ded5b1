//! Conversation transcript persistence in DynamoDB.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::{Error, Result};

/// One conversational turn as stored in the transcript table.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    /// Lex session ID, the table's partition key
    pub conversation_id: String,
    /// RFC 3339 UTC time of the turn, the table's sort key
    pub timestamp: String,
    pub location: String,
    pub user_query: String,
    pub response: String,
}

impl TranscriptRecord {
    /// Record a turn stamped with the current time.
    pub fn now(
        conversation_id: impl Into<String>,
        location: impl Into<String>,
        user_query: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), conversation_id, location, user_query, response)
    }

    pub fn at(
        at: DateTime<Utc>,
        conversation_id: impl Into<String>,
        location: impl Into<String>,
        user_query: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            location: location.into(),
            user_query: user_query.into(),
            response: response.into(),
        }
    }

    fn into_item(self) -> [(&'static str, AttributeValue); 5] {
        [
            ("conversationId", AttributeValue::S(self.conversation_id)),
            ("timestamp", AttributeValue::S(self.timestamp)),
            ("location", AttributeValue::S(self.location)),
            ("userQuery", AttributeValue::S(self.user_query)),
            ("response", AttributeValue::S(self.response)),
        ]
    }
}

/// Append-only store for transcript records.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, record: TranscriptRecord) -> Result<()>;
}

/// Transcript store writing one item per turn to a DynamoDB table.
pub struct DynamoTranscripts {
    client: DynamoClient,
    table_name: String,
}

impl DynamoTranscripts {
    pub fn new(client: DynamoClient, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl TranscriptStore for DynamoTranscripts {
    async fn append(&self, record: TranscriptRecord) -> Result<()> {
        let conversation_id = record.conversation_id.clone();

        let mut request = self.client.put_item().table_name(&self.table_name);
        for (name, value) in record.into_item() {
            request = request.item(name, value);
        }

        request
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to write transcript: {}", e)))?;

        info!(table = %self.table_name, conversation_id = %conversation_id, "Transcript written");
        Ok(())
    }
}
