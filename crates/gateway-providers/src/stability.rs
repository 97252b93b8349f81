//! Stability AI text-to-image adapter.

use crate::http::{self, send_json};
use crate::openai::missing_credential;
use async_trait::async_trait;
use gateway_config::ProviderConfig;
use gateway_core::{
    GatewayError, GatewayResult, ImageGenerationOutput, ImageGenerationRequest, OperationInput,
    OperationOutput, OperationType, ProviderAdapter, ProviderKind, ProviderRawResult,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

const OPERATIONS: &[OperationType] = &[OperationType::ImageGeneration];

/// Adapter for the Stability v1 generation API
pub struct StabilityAdapter {
    base_url: String,
    api_key: SecretString,
    models: BTreeMap<OperationType, String>,
    client: Client,
}

impl std::fmt::Debug for StabilityAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl StabilityAdapter {
    /// Create the adapter
    ///
    /// # Errors
    /// Returns a validation error if the API key is missing
    pub fn new(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential(ProviderKind::Stability, "api_key"))?;
        Ok(Self {
            base_url: config
                .endpoint()
                .unwrap_or_else(|| "https://api.stability.ai/v1".to_string()),
            api_key,
            models: config.models.clone(),
            client: http::build_client(config.timeout.unwrap_or(default_timeout))?,
        })
    }

    async fn generate(
        &self,
        request: &ImageGenerationRequest,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let engine = request
            .model
            .as_deref()
            .or_else(|| self.models.get(&OperationType::ImageGeneration).map(String::as_str))
            .unwrap_or(DEFAULT_ENGINE);
        debug!(provider = %self.kind(), engine = %engine, "Sending request");

        let mut text_prompts = vec![TextPrompt {
            text: request.prompt.clone(),
            weight: 1.0,
        }];
        if let Some(negative) = &request.negative_prompt {
            text_prompts.push(TextPrompt {
                text: negative.clone(),
                weight: -1.0,
            });
        }
        let (width, height) = request.size();
        let body = TextToImageRequest {
            text_prompts,
            width,
            height,
            samples: request.image_count(),
            style_preset: request.style.clone(),
        };

        let http_request = self
            .client
            .post(format!("{}/generation/{engine}/text-to-image", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        let (response, raw): (TextToImageResponse, Value) =
            send_json(self.kind(), http_request, timeout).await?;

        let mut images = Vec::with_capacity(response.artifacts.len());
        let mut seeds = Vec::with_capacity(response.artifacts.len());
        for artifact in response.artifacts {
            if artifact.finish_reason.as_deref() == Some("CONTENT_FILTERED") {
                warn!(
                    provider = %self.kind(),
                    seed = artifact.seed,
                    "Artifact was content filtered"
                );
            }
            images.push(http::to_data_url("image/png", &artifact.base64));
            seeds.push(artifact.seed);
        }
        if images.is_empty() {
            return Err(GatewayError::provider(
                self.kind(),
                "Response contained no artifacts",
                None,
                false,
            ));
        }

        Ok(ProviderRawResult::new(
            OperationOutput::ImageGeneration(ImageGenerationOutput {
                images,
                seeds: Some(seeds),
            }),
            raw,
        ))
    }
}

#[async_trait]
impl ProviderAdapter for StabilityAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stability
    }

    fn supported_operations(&self) -> &[OperationType] {
        OPERATIONS
    }

    async fn execute(
        &self,
        input: &OperationInput,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        match input {
            OperationInput::ImageGeneration(r) => self.generate(r, timeout).await,
            other => Err(http::unsupported(self.kind(), other.operation_type())),
        }
    }
}

// ===== API Types =====

#[derive(Debug, Serialize)]
struct TextToImageRequest {
    text_prompts: Vec<TextPrompt>,
    width: u32,
    height: u32,
    samples: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_preset: Option<String>,
}

#[derive(Debug, Serialize)]
struct TextPrompt {
    text: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    base64: String,
    seed: u64,
    finish_reason: Option<String>,
}
