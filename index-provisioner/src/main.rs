//! Index Provisioner Lambda - CloudFormation custom resource creating a vector index.
//!
//! On Create/Update this Lambda:
//! 1. Waits for the OpenSearch Serverless collection to leave CREATING
//! 2. Waits for data access policies to propagate
//! 3. Creates the knowledge base vector index
//! 4. Reports SUCCESS or FAILED to CloudFormation

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::{
    vector_index_body, wait_for_collection, CollectionDirectory, CompletionNotifier,
    CustomResourceEvent, CustomResourceResponse, HttpCompletionNotifier, IndexAdmin,
    ProvisionerConfig, RequestType, ResponseStatus, ServerlessCollections, SignedIndexClient,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Time kept back from the invocation deadline for sending the CloudFormation response.
const RESPONSE_RESERVE: Duration = Duration::from_secs(15);

/// Application state shared across invocations.
struct AppState {
    config: ProvisionerConfig,
    collections: Box<dyn CollectionDirectory>,
    indices: Box<dyn IndexAdmin>,
    notifier: Box<dyn CompletionNotifier>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = ProvisionerConfig::from_env()?;

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let collections =
            ServerlessCollections::new(aws_sdk_opensearchserverless::Client::new(&sdk_config));
        let indices = SignedIndexClient::new(&sdk_config, config.region.clone())?;

        Ok(Self {
            config,
            collections: Box::new(collections),
            indices: Box::new(indices),
            notifier: Box::new(HttpCompletionNotifier::new(reqwest::Client::new())),
        })
    }
}

/// Wait for the collection and create the index, returning OpenSearch's acknowledgement.
async fn provision(state: &AppState) -> shared::Result<Value> {
    let config = &state.config;

    let collection =
        wait_for_collection(state.collections.as_ref(), &config.collection_name, &config.wait)
            .await?;
    let endpoint = collection.require_endpoint()?;
    info!(collection = %collection.name, status = %collection.status, endpoint = %endpoint, "Collection ready");

    // Data access rules can take up to a minute to be enforced
    tokio::time::sleep(config.wait.policy_propagation_delay).await;

    let acknowledgement = state
        .indices
        .create_index(endpoint, &config.index_name, &vector_index_body())
        .await?;

    tokio::time::sleep(config.wait.index_settle_delay).await;
    info!(index = %config.index_name, response = %acknowledgement, "Index created");

    Ok(acknowledgement)
}

/// Time left for provisioning before the invocation deadline, keeping
/// [`RESPONSE_RESERVE`] for the callback.
fn provisioning_budget(deadline_ms: u64, now: SystemTime) -> Duration {
    let deadline = UNIX_EPOCH + Duration::from_millis(deadline_ms);
    deadline
        .duration_since(now)
        .unwrap_or_default()
        .saturating_sub(RESPONSE_RESERVE)
}

/// Run the lifecycle operation and report its outcome to CloudFormation exactly once.
///
/// Only Create and Update provision. Delete reports SUCCESS without creating
/// anything: the index already exists at that point, so a create would fail and
/// leave the stack unable to delete. Provisioning that overruns `budget` is
/// reported as FAILED so the response still goes out before the Lambda times out.
async fn respond(
    state: &AppState,
    event: &CustomResourceEvent,
    log_stream: &str,
    budget: Duration,
) -> Result<ResponseStatus, Error> {
    info!(event = %serde_json::to_string_pretty(event)?, "Received event");

    let status = match event.request_type {
        RequestType::Delete => {
            info!("Delete requested, leaving collection and index untouched");
            ResponseStatus::Success
        }
        RequestType::Create | RequestType::Update => {
            let outcome = tokio::time::timeout(budget, provision(state))
                .await
                .unwrap_or_else(|_| {
                    Err(shared::Error::Timeout {
                        what: "provisioning to finish before the invocation deadline".to_string(),
                        waited: budget,
                    })
                });

            match outcome {
                Ok(_) => ResponseStatus::Success,
                Err(e) => {
                    error!("Error: {}", e);
                    ResponseStatus::Failed
                }
            }
        }
    };

    let response = CustomResourceResponse::for_event(event, status, log_stream);
    state.notifier.notify(&event.response_url, &response).await?;

    Ok(status)
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<CustomResourceEvent>) -> Result<(), Error> {
    let (payload, context) = event.into_parts();
    let budget = provisioning_budget(context.deadline, SystemTime::now());
    respond(&state, &payload, &context.env_config.log_stream, budget).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
