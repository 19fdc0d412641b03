use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct EmbedRequest {
    pub model_id: String,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

/// Driven port over an embedding provider, used by the generator's
/// semantic-relationship phase and the query engine's semantic retrieval.
#[async_trait]
pub trait EmbedPort: Send + Sync {
    async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse>;
}

/// Deterministic test double: each text's vector is its length folded into
/// 8 dimensions via its byte hash, never touching a real embedding model.
#[derive(Debug, Default)]
pub struct HashEmbedPort;

impl HashEmbedPort {
    const DIMENSIONS: usize = 8;

    fn vector_for(text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(text.as_bytes());
        digest
            .iter()
            .take(Self::DIMENSIONS)
            .map(|byte| *byte as f32 / 255.0)
            .collect()
    }
}

#[async_trait]
impl EmbedPort for HashEmbedPort {
    async fn embed(&self, request: EmbedRequest) -> Result<EmbedResponse> {
        let vectors = request.texts.iter().map(|text| Self::vector_for(text)).collect();
        Ok(EmbedResponse { vectors })
    }
}
