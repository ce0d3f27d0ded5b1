//! Bedrock agent runtime client for streamed agent completions.

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::operation::invoke_agent::InvokeAgentOutput;
use aws_sdk_bedrockagentruntime::types::ResponseStream;
use aws_sdk_bedrockagentruntime::Client as BedrockAgentClient;
use tracing::{debug, warn};

use crate::{Error, Result};

/// One turn sent to the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInvocation {
    /// Prompt text passed as the agent's input
    pub input_text: String,
    /// Session the agent should continue
    pub session_id: String,
    /// Whether the agent should end the session after responding
    pub end_session: bool,
}

/// An event from the agent's completion stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
    /// A piece of the response text
    Chunk(Vec<u8>),
    /// Any other event (trace, return control, files, ...)
    Other(String),
}

/// Sequential reader over an agent's completion stream.
#[async_trait]
pub trait CompletionStream: Send {
    /// The next event, or `None` once the stream has ended.
    async fn next_event(&mut self) -> Result<Option<CompletionEvent>>;
}

/// A hosted agent that can be invoked with streaming output.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    type Stream: CompletionStream;

    /// Start an agent invocation.
    async fn invoke(&self, invocation: AgentInvocation) -> Result<Self::Stream>;
}

/// Read `stream` to the end, concatenating chunk payloads into one string.
///
/// Non-chunk events are logged and skipped. Bytes are decoded once at the end
/// so a code point split across chunks survives.
pub async fn collect_completion<S>(stream: &mut S) -> Result<String>
where
    S: CompletionStream + ?Sized,
{
    let mut bytes = Vec::new();

    while let Some(event) = stream.next_event().await? {
        match event {
            CompletionEvent::Chunk(chunk) => {
                debug!(len = chunk.len(), "Completion chunk");
                bytes.extend_from_slice(&chunk);
            }
            CompletionEvent::Other(description) => {
                warn!(event = %description, "Unexpected event format");
            }
        }
    }

    String::from_utf8(bytes).map_err(|e| Error::Stream(format!("Completion is not UTF-8: {}", e)))
}

/// Client for a single Bedrock agent alias.
pub struct BedrockAgent {
    client: BedrockAgentClient,
    agent_id: String,
    agent_alias_id: String,
}

impl BedrockAgent {
    pub fn new(client: BedrockAgentClient, agent_id: String, agent_alias_id: String) -> Self {
        Self {
            client,
            agent_id,
            agent_alias_id,
        }
    }
}

#[async_trait]
impl AgentRuntime for BedrockAgent {
    type Stream = BedrockCompletion;

    async fn invoke(&self, invocation: AgentInvocation) -> Result<BedrockCompletion> {
        let output = self
            .client
            .invoke_agent()
            .agent_id(&self.agent_id)
            .agent_alias_id(&self.agent_alias_id)
            .input_text(invocation.input_text)
            .session_id(invocation.session_id)
            .end_session(invocation.end_session)
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to invoke agent: {}", e)))?;

        Ok(BedrockCompletion { output })
    }
}

/// Completion stream of an `InvokeAgent` call.
pub struct BedrockCompletion {
    output: InvokeAgentOutput,
}

#[async_trait]
impl CompletionStream for BedrockCompletion {
    async fn next_event(&mut self) -> Result<Option<CompletionEvent>> {
        let event = self
            .output
            .completion
            .recv()
            .await
            .map_err(|e| Error::Stream(e.to_string()))?;

        Ok(event.map(|event| match event {
            ResponseStream::Chunk(part) => CompletionEvent::Chunk(
                part.bytes().map(|blob| blob.as_ref().to_vec()).unwrap_or_default(),
            ),
            other => CompletionEvent::Other(format!("{:?}", other)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct VecStream(VecDeque<Result<CompletionEvent>>);

    #[async_trait]
    impl CompletionStream for VecStream {
        async fn next_event(&mut self) -> Result<Option<CompletionEvent>> {
            self.0.pop_front().transpose()
        }
    }

    fn chunk(text: &str) -> Result<CompletionEvent> {
        Ok(CompletionEvent::Chunk(text.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_concatenates_chunks_and_skips_other_events() {
        let mut stream = VecStream(VecDeque::from(vec![
            chunk("The "),
            Ok(CompletionEvent::Other("Trace".to_string())),
            chunk("property "),
            chunk("is 1500 sqft."),
        ]));

        let text = collect_completion(&mut stream).await.unwrap();
        assert_eq!(text, "The property is 1500 sqft.");
    }

    #[tokio::test]
    async fn test_empty_stream_is_empty_string() {
        let mut stream = VecStream(VecDeque::new());
        assert_eq!(collect_completion(&mut stream).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_code_point_split_across_chunks() {
        let bytes = "café".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 1);
        let mut stream = VecStream(VecDeque::from(vec![
            Ok(CompletionEvent::Chunk(head.to_vec())),
            Ok(CompletionEvent::Chunk(tail.to_vec())),
        ]));

        assert_eq!(collect_completion(&mut stream).await.unwrap(), "café");
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let mut stream = VecStream(VecDeque::from(vec![
            chunk("partial"),
            Err(Error::Stream("connection reset".to_string())),
            chunk("never read"),
        ]));

        let err = collect_completion(&mut stream).await.unwrap_err();
        assert!(matches!(err, Error::Stream(_)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_stream_error() {
        let mut stream = VecStream(VecDeque::from(vec![Ok(CompletionEvent::Chunk(vec![0xff, 0xfe]))]));

        let err = collect_completion(&mut stream).await.unwrap_err();
        assert!(matches!(err, Error::Stream(_)));
    }
}
