//! SigV4-signed index administration against an OpenSearch Serverless collection.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, SignableBody, SignableRequest, SigningSettings,
};
use aws_sigv4::sign::v4;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{Error, Result};

/// Signing name for OpenSearch Serverless data plane requests.
pub const SERVICE_NAME: &str = "aoss";

/// Dimensionality of the embedding vectors stored in the index.
pub const VECTOR_DIMENSION: u32 = 1024;

/// Field holding the Bedrock knowledge base chunk metadata.
pub const METADATA_FIELD: &str = "AMAZON_BEDROCK_METADATA";
/// Field holding the indexed text chunk.
pub const TEXT_CHUNK_FIELD: &str = "AMAZON_BEDROCK_TEXT_CHUNK";
/// Field holding the embedding vector.
pub const VECTOR_FIELD: &str = "vector";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Index body for a knowledge base vector index: two text fields and one
/// HNSW/faiss `knn_vector` field using Euclidean distance.
pub fn vector_index_body() -> Value {
    json!({
        "mappings": {
            "properties": {
                METADATA_FIELD: {
                    "type": "text",
                    "index": false
                },
                TEXT_CHUNK_FIELD: {
                    "type": "text"
                },
                VECTOR_FIELD: {
                    "type": "knn_vector",
                    "dimension": VECTOR_DIMENSION,
                    "method": {
                        "engine": "faiss",
                        "space_type": "l2",
                        "name": "hnsw",
                        "parameters": {}
                    }
                }
            }
        },
        "settings": {
            "index": {
                "knn": true
            }
        }
    })
}

/// Strip the scheme and any trailing slash from a collection endpoint.
pub fn endpoint_host(endpoint: &str) -> &str {
    endpoint
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

/// Index administration operations on a collection.
#[async_trait]
pub trait IndexAdmin: Send + Sync {
    /// Create `index` on the collection at `endpoint`, returning the acknowledgement body.
    async fn create_index(&self, endpoint: &str, index: &str, body: &Value) -> Result<Value>;
}

/// OpenSearch client that signs each request with the ambient AWS credentials.
pub struct SignedIndexClient {
    http: reqwest::Client,
    credentials: SharedCredentialsProvider,
    region: String,
}

impl SignedIndexClient {
    /// Create a client using the credentials chain from an SDK config.
    pub fn new(config: &SdkConfig, region: impl Into<String>) -> Result<Self> {
        let credentials = config
            .credentials_provider()
            .ok_or_else(|| Error::Config("No AWS credentials provider configured".to_string()))?;

        Self::with_credentials(credentials, region)
    }

    /// Create a client signing with an explicit credentials provider.
    pub fn with_credentials(
        credentials: SharedCredentialsProvider,
        region: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            credentials,
            region: region.into(),
        })
    }

    /// Build the signed `PUT /<index>` request for a collection endpoint.
    pub async fn create_index_request(
        &self,
        endpoint: &str,
        index: &str,
        body: &Value,
    ) -> Result<reqwest::Request> {
        let url = format!("https://{}/{}", endpoint_host(endpoint), index);
        let payload = serde_json::to_vec(body)?;
        let content_type = [("content-type", "application/json")];

        let signed = self.signed_headers("PUT", &url, &content_type, &payload).await?;

        let mut request = self
            .http
            .put(&url)
            .header("content-type", "application/json")
            .body(payload);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        Ok(request.build()?)
    }

    /// Produce the SigV4 headers for a request.
    async fn signed_headers(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| Error::Signing(format!("Failed to resolve credentials: {}", e)))?;
        let identity = credentials.into();

        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;

        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SERVICE_NAME)
            .time(SystemTime::now())
            .settings(settings)
            .build()
            .map_err(|e| Error::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new(
            method,
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| Error::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| Error::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[async_trait]
impl IndexAdmin for SignedIndexClient {
    async fn create_index(&self, endpoint: &str, index: &str, body: &Value) -> Result<Value> {
        let request = self.create_index_request(endpoint, index, body).await?;

        info!(url = %request.url(), "Creating index");
        let response = self.http.execute(request).await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), body = %text, "Create index response");

        if !status.is_success() {
            return Err(Error::OpenSearch {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
