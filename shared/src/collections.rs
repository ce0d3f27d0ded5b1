//! OpenSearch Serverless collection lookup and readiness polling.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_opensearchserverless::Client as ServerlessClient;
use tracing::{info, warn};

use crate::config::WaitConfig;
use crate::{Error, Result};

/// Lifecycle state reported for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStatus {
    Creating,
    Active,
    Failed,
    Deleting,
    Other(String),
}

impl CollectionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            "FAILED" => Self::Failed,
            "DELETING" => Self::Deleting,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
            Self::Deleting => "DELETING",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub name: String,
    /// HTTPS endpoint, absent until the collection has been provisioned
    pub endpoint: Option<String>,
    pub status: CollectionStatus,
}

impl CollectionSnapshot {
    /// The collection endpoint, or an error if none has been assigned.
    pub fn require_endpoint(&self) -> Result<&str> {
        self.endpoint.as_deref().ok_or_else(|| {
            Error::NotFound(format!(
                "collection {} has no endpoint (status {})",
                self.name, self.status
            ))
        })
    }
}

/// Source of collection status snapshots.
#[async_trait]
pub trait CollectionDirectory: Send + Sync {
    /// Fetch the current snapshot of the named collection.
    async fn describe(&self, name: &str) -> Result<CollectionSnapshot>;
}

/// Collection directory backed by the OpenSearch Serverless control plane.
pub struct ServerlessCollections {
    client: ServerlessClient,
}

impl ServerlessCollections {
    pub fn new(client: ServerlessClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CollectionDirectory for ServerlessCollections {
    async fn describe(&self, name: &str) -> Result<CollectionSnapshot> {
        let response = self
            .client
            .batch_get_collection()
            .names(name)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to get collection {}: {}", name, e)))?;

        let detail = response
            .collection_details()
            .first()
            .ok_or_else(|| Error::NotFound(format!("collection {}", name)))?;

        Ok(CollectionSnapshot {
            name: detail.name().unwrap_or(name).to_string(),
            endpoint: detail.collection_endpoint().map(String::from),
            status: detail
                .status()
                .map(|s| CollectionStatus::parse(s.as_str()))
                .unwrap_or_else(|| CollectionStatus::Other("UNKNOWN".to_string())),
        })
    }
}

/// Shortest sleep between polls, whatever the configuration says.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Next poll interval, saturating at `max` when the product does not fit a `Duration`.
fn next_interval(interval: Duration, multiplier: f64, max: Duration) -> Duration {
    Duration::try_from_secs_f64(interval.as_secs_f64() * multiplier)
        .map(|next| next.min(max))
        .unwrap_or(max)
}

/// Poll the named collection until it leaves `CREATING`.
///
/// Sleeps between polls grow by `backoff_multiplier` up to `max_interval`,
/// never shorter than one second. Fails with [`Error::Timeout`] rather than
/// sleeping past `max_wait`.
pub async fn wait_for_collection<D>(
    directory: &D,
    name: &str,
    wait: &WaitConfig,
) -> Result<CollectionSnapshot>
where
    D: CollectionDirectory + ?Sized,
{
    let max_interval = wait.max_interval.max(MIN_POLL_INTERVAL);
    let mut interval = wait.initial_interval.clamp(MIN_POLL_INTERVAL, max_interval);
    let mut waited = Duration::ZERO;

    loop {
        let snapshot = directory.describe(name).await?;

        if snapshot.status != CollectionStatus::Creating {
            if snapshot.status != CollectionStatus::Active {
                warn!(
                    collection = %snapshot.name,
                    status = %snapshot.status,
                    "Collection is not ACTIVE, continuing anyway"
                );
            }
            return Ok(snapshot);
        }

        if waited + interval > wait.max_wait {
            return Err(Error::Timeout {
                what: format!("collection {} to finish creating", name),
                waited,
            });
        }

        info!(
            collection = %name,
            sleep_secs = interval.as_secs_f64(),
            "Collection still creating"
        );
        tokio::time::sleep(interval).await;
        waited += interval;
        interval = next_interval(interval, wait.backoff_multiplier, max_interval);
    }
}
