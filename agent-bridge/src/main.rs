//! Agent Bridge Lambda - Lex V2 fulfillment backed by a Bedrock agent.
//!
//! Each Lex turn is forwarded to the agent with the property address from the
//! session prepended, the streamed completion is accumulated into one reply,
//! and the exchange is appended to the DynamoDB transcript table.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::lex::{resolve_slot, LOCATION_SLOT};
use shared::{
    collect_completion, AgentInvocation, AgentRuntime, BedrockAgent, BridgeConfig,
    DynamoTranscripts, LexEvent, LexResponse, TranscriptRecord, TranscriptStore,
};
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Reply when the agent could not be invoked at all.
const AGENT_UNAVAILABLE_MESSAGE: &str = "Sorry, I encountered an error processing your request.";

/// Reply when the agent's completion stream failed part way.
const STREAM_ERROR_MESSAGE: &str = "Error processing the response from the Bedrock agent.";

/// Application state shared across invocations.
struct AppState {
    agent: BedrockAgent,
    transcripts: DynamoTranscripts,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = BridgeConfig::from_env()?;
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        info!(table = %config.table_name, agent_id = %config.agent_id, "Agent bridge configured");

        Ok(Self {
            agent: BedrockAgent::new(
                aws_sdk_bedrockagentruntime::Client::new(&sdk_config),
                config.agent_id,
                config.agent_alias_id,
            ),
            transcripts: DynamoTranscripts::new(
                aws_sdk_dynamodb::Client::new(&sdk_config),
                config.table_name,
            ),
        })
    }
}

/// Prefix the user's utterance with the property it refers to.
fn property_prompt(location: &str, utterance: &str) -> String {
    format!("I am referring to the property with address = {}. {}", location, utterance)
}

/// Handle one Lex turn: ask the agent, record the exchange, reply to Lex.
async fn fulfill<A, T>(agent: &A, transcripts: &T, event: LexEvent) -> shared::Result<LexResponse>
where
    A: AgentRuntime,
    T: TranscriptStore + ?Sized,
{
    let location = event
        .location()
        .ok_or_else(|| shared::Error::Validation("sessionAttributes.Location is missing".to_string()))?
        .to_string();

    let LexEvent {
        input_transcript: user_query,
        session_id,
        session_state,
        request_attributes,
    } = event;

    info!(session_id = %session_id, location = %location, "Fulfilling turn");

    let prompt = property_prompt(&location, &user_query);
    debug!(prompt = %prompt, "Agent prompt");

    let mut slots = session_state.intent.slots.unwrap_or_default();
    resolve_slot(&mut slots, LOCATION_SLOT, &location);

    let invocation = AgentInvocation {
        input_text: prompt,
        session_id: session_id.clone(),
        end_session: false,
    };

    let mut completion = match agent.invoke(invocation).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Error calling Bedrock agent: {}", e);
            return Ok(LexResponse::message_only(AGENT_UNAVAILABLE_MESSAGE));
        }
    };

    let result = match collect_completion(&mut completion).await {
        Ok(text) => text,
        Err(e) => {
            error!("Error reading EventStream: {}", e);
            return Ok(LexResponse::message_only(STREAM_ERROR_MESSAGE));
        }
    };

    info!(session_id = %session_id, len = result.len(), "Agent response received");

    let record = TranscriptRecord::now(&session_id, &location, &user_query, &result);
    if let Err(e) = transcripts.append(record).await {
        error!("Error writing to DynamoDB: {}", e);
    }

    Ok(LexResponse::fulfilled(
        session_state.intent.name,
        slots,
        result,
        request_attributes.unwrap_or_default(),
        session_id,
    ))
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<LexEvent>) -> Result<LexResponse, Error> {
    let (payload, _context) = event.into_parts();
    Ok(fulfill(&state.agent, &state.transcripts, payload).await?)
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
