//! Shared library for the vector index provisioner and agent bridge Lambda functions.
//!
//! This crate provides configuration, error types and one thin client per AWS service.

pub mod agents;
pub mod cloudformation;
pub mod collections;
pub mod config;
pub mod error;
pub mod lex;
pub mod opensearch;
pub mod transcripts;

pub use agents::{
    collect_completion, AgentInvocation, AgentRuntime, BedrockAgent, CompletionEvent,
    CompletionStream,
};
pub use cloudformation::{
    CompletionNotifier, CustomResourceEvent, CustomResourceResponse, HttpCompletionNotifier,
    RequestType, ResponseStatus,
};
pub use collections::{
    wait_for_collection, CollectionDirectory, CollectionSnapshot, CollectionStatus,
    ServerlessCollections,
};
pub use config::{BridgeConfig, ProvisionerConfig, WaitConfig};
pub use error::{Error, Result};
pub use lex::{LexEvent, LexResponse};
pub use opensearch::{vector_index_body, IndexAdmin, SignedIndexClient};
pub use transcripts::{DynamoTranscripts, TranscriptRecord, TranscriptStore};
