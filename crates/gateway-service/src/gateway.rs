//! The gateway facade.

use crate::builder::AiGatewayBuilder;
use gateway_config::GatewayConfig;
use gateway_core::{
    AudioTranscriptionOutput, AudioTranscriptionRequest, AudioTranslationOutput,
    AudioTranslationRequest, ChatCompletionOutput, ChatCompletionRequest, EmbeddingOutput,
    EmbeddingRequest, ErrorKind, FunctionCallingOutput, FunctionCallingRequest, GatewayError,
    GatewayResult, ImageAnalysisOutput, ImageAnalysisRequest, ImageGenerationOutput,
    ImageGenerationRequest, ModerationOutput, ModerationRequest, Operation, OperationInput,
    OperationRequest, OperationResult, OperationType, ProviderKind, RequestEnvelope, RequestId,
    TextGenerationOutput, TextGenerationRequest, VideoAnalysisOutput, VideoAnalysisRequest,
};
use gateway_resilience::{cache_key, CacheStore, RedisCacheStore};
use gateway_routing::{FallbackOrchestrator, FallbackOutcome};
use gateway_telemetry::{operation_span, CostLedger, GatewayMetrics, GatewayStatistics};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Multi-provider AI gateway
///
/// Cheap to clone; clones share breakers, rate windows, cache and ledger.
#[derive(Clone)]
pub struct AiGateway {
    config: Arc<GatewayConfig>,
    orchestrator: Arc<FallbackOrchestrator>,
    cache: Option<Arc<dyn CacheStore>>,
    ledger: Arc<CostLedger>,
    metrics: GatewayMetrics,
}

impl std::fmt::Debug for AiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGateway")
            .field("orchestrator", &self.orchestrator)
            .field("cache", &self.cache.as_ref().map(|c| c.name()))
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl AiGateway {
    /// Create a new builder
    pub fn builder() -> AiGatewayBuilder {
        AiGatewayBuilder::default()
    }

    /// Build a gateway from configuration.
    ///
    /// Uses the Redis cache when `cache.redis_url` is set and reachable,
    /// otherwise the in-memory cache.
    ///
    /// # Errors
    /// Returns a validation error for an invalid configuration
    pub async fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        let mut builder = Self::builder();
        if config.cache.enabled {
            if let Some(url) = &config.cache.redis_url {
                match RedisCacheStore::connect(url).await {
                    Ok(store) => {
                        info!(backend = "redis", "Cache store connected");
                        builder = builder.cache_store(Arc::new(store));
                    }
                    Err(e) => {
                        warn!(error = %e, "Redis unavailable, falling back to in-memory cache");
                    }
                }
            }
        }
        builder.config(config).build()
    }

    pub(crate) fn from_parts(
        config: GatewayConfig,
        orchestrator: FallbackOrchestrator,
        cache: Option<Arc<dyn CacheStore>>,
        ledger: CostLedger,
        metrics: GatewayMetrics,
    ) -> Self {
        info!(
            providers = ?orchestrator.registry().kinds(),
            cache = cache.as_ref().map_or("disabled", |c| c.name()),
            budget = ?config.monthly_budget,
            "Gateway initialized"
        );
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            cache,
            ledger: Arc::new(ledger),
            metrics,
        }
    }

    /// Configuration the gateway was built with
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Metrics registry
    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Providers with a registered adapter
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.orchestrator.registry().kinds()
    }

    /// Operations served by each registered provider
    pub fn capabilities(&self) -> BTreeMap<ProviderKind, Vec<OperationType>> {
        let registry = self.orchestrator.registry();
        registry
            .kinds()
            .into_iter()
            .filter_map(|kind| {
                registry
                    .get(kind)
                    .map(|adapter| (kind, adapter.supported_operations().to_vec()))
            })
            .collect()
    }

    /// Whether results are cached
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Cost totals, breaker state and enabled providers
    pub fn statistics(&self) -> GatewayStatistics {
        GatewayStatistics::new(
            self.ledger.snapshot(),
            self.orchestrator.circuit_breakers().snapshots(),
            self.config.enabled_providers().map(|p| p.kind).collect(),
            self.ledger.budget(),
        )
    }

    /// Zero the cost ledger
    pub fn reset_cost_ledger(&self) {
        self.ledger.reset();
        info!("Cost ledger reset");
    }

    /// Generate text from a prompt
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn generate_text(
        &self,
        request: OperationRequest<TextGenerationRequest>,
    ) -> GatewayResult<OperationResult<TextGenerationOutput>> {
        self.execute(request).await
    }

    /// Complete a chat conversation
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn chat_complete(
        &self,
        request: OperationRequest<ChatCompletionRequest>,
    ) -> GatewayResult<OperationResult<ChatCompletionOutput>> {
        self.execute(request).await
    }

    /// Generate images from a prompt
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn generate_image(
        &self,
        request: OperationRequest<ImageGenerationRequest>,
    ) -> GatewayResult<OperationResult<ImageGenerationOutput>> {
        self.execute(request).await
    }

    /// Detect objects, faces, labels, text or unsafe content in an image
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn analyze_image(
        &self,
        request: OperationRequest<ImageAnalysisRequest>,
    ) -> GatewayResult<OperationResult<ImageAnalysisOutput>> {
        self.execute(request).await
    }

    /// Run video analysis jobs on a stored video
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn analyze_video(
        &self,
        request: OperationRequest<VideoAnalysisRequest>,
    ) -> GatewayResult<OperationResult<VideoAnalysisOutput>> {
        self.execute(request).await
    }

    /// Transcribe speech
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn transcribe_audio(
        &self,
        request: OperationRequest<AudioTranscriptionRequest>,
    ) -> GatewayResult<OperationResult<AudioTranscriptionOutput>> {
        self.execute(request).await
    }

    /// Translate speech
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn translate_audio(
        &self,
        request: OperationRequest<AudioTranslationRequest>,
    ) -> GatewayResult<OperationResult<AudioTranslationOutput>> {
        self.execute(request).await
    }

    /// Embed one or more texts
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn create_embedding(
        &self,
        request: OperationRequest<EmbeddingRequest>,
    ) -> GatewayResult<OperationResult<EmbeddingOutput>> {
        self.execute(request).await
    }

    /// Classify text against moderation categories
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn moderate(
        &self,
        request: OperationRequest<ModerationRequest>,
    ) -> GatewayResult<OperationResult<ModerationOutput>> {
        self.execute(request).await
    }

    /// Let the model pick a function to call
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn call_function(
        &self,
        request: OperationRequest<FunctionCallingRequest>,
    ) -> GatewayResult<OperationResult<FunctionCallingOutput>> {
        self.execute(request).await
    }

    /// Execute a request whose operation is only known at runtime and
    /// return the serialized result.
    ///
    /// # Errors
    /// Returns the classified failure of the request
    pub async fn dispatch(
        &self,
        request: OperationRequest<OperationInput>,
    ) -> GatewayResult<Value> {
        let OperationRequest { envelope, payload } = request;
        match payload {
            OperationInput::TextGeneration(p) => self.execute_value(envelope, p).await,
            OperationInput::ChatCompletion(p) => self.execute_value(envelope, p).await,
            OperationInput::ImageGeneration(p) => self.execute_value(envelope, p).await,
            OperationInput::ImageAnalysis(p) => self.execute_value(envelope, p).await,
            OperationInput::VideoAnalysis(p) => self.execute_value(envelope, p).await,
            OperationInput::AudioTranscription(p) => self.execute_value(envelope, p).await,
            OperationInput::AudioTranslation(p) => self.execute_value(envelope, p).await,
            OperationInput::Embedding(p) => self.execute_value(envelope, p).await,
            OperationInput::Moderation(p) => self.execute_value(envelope, p).await,
            OperationInput::FunctionCalling(p) => self.execute_value(envelope, p).await,
        }
    }

    async fn execute_value<P: Operation>(
        &self,
        envelope: RequestEnvelope,
        payload: P,
    ) -> GatewayResult<Value> {
        let result = self.execute(OperationRequest { envelope, payload }).await?;
        serde_json::to_value(result)
            .map_err(|e| GatewayError::unknown(format!("Failed to serialize result: {e}")))
    }

    /// Run one request through validation, cache, budget and fallback.
    ///
    /// # Errors
    /// Returns exactly one classified error when the request cannot be served
    pub async fn execute<P: Operation>(
        &self,
        mut request: OperationRequest<P>,
    ) -> GatewayResult<OperationResult<P::Output>> {
        let start = Instant::now();
        let operation = P::TYPE;
        let request_id = request
            .envelope
            .request_id
            .get_or_insert_with(RequestId::generate)
            .clone();

        let span = operation_span!(request_id, operation);
        let result = self.process(request, request_id, start).instrument(span.clone()).await;

        if let Err(e) = &result {
            let _entered = span.enter();
            let provider = e.provider_kind().map_or("none", |k| k.as_str());
            self.metrics
                .record_request(
                    operation,
                    provider,
                    e.kind().as_str(),
                    start.elapsed().as_secs_f64(),
                );
            match e.kind() {
                ErrorKind::Unknown => {
                    error!(error = %e, error_kind = %e.kind(), "Operation failed");
                }
                ErrorKind::Validation => debug!(error = %e, "Request rejected"),
                _ => warn!(error = %e, error_kind = %e.kind(), "Operation failed"),
            }
        }
        result
    }

    async fn process<P: Operation>(
        &self,
        request: OperationRequest<P>,
        request_id: RequestId,
        start: Instant,
    ) -> GatewayResult<OperationResult<P::Output>> {
        let operation = P::TYPE;
        request.payload.validate()?;

        if self.config.logging.log_requests {
            debug!(
                request = %serde_json::to_string(&request).unwrap_or_default(),
                "Request received"
            );
        }

        let key = match &self.cache {
            Some(_) if request.envelope.use_cache => Some(cache_key(operation, &request)?),
            _ => None,
        };

        if let (Some(store), Some(key)) = (&self.cache, &key) {
            if let Some(mut cached) = self
                .cache_read::<P::Output>(store.as_ref(), key, operation)
                .await
            {
                cached.mark_cached(request_id, elapsed_ms(start));
                self.metrics.record_request(
                    operation,
                    cached.provider.as_str(),
                    "cache_hit",
                    start.elapsed().as_secs_f64(),
                );
                debug!(provider = %cached.provider, "Served from cache");
                return Ok(cached);
            }
        }

        self.ledger.check_budget()?;

        let OperationRequest { envelope, payload } = request;
        let input = payload.into_input();
        let FallbackOutcome {
            provider,
            result: raw,
            cost,
            attempts,
        } = self.orchestrator.execute(&envelope, &input).await?;

        let mut result = OperationResult {
            provider,
            request_id,
            success: true,
            processing_time_ms: elapsed_ms(start),
            cost,
            from_cache: false,
            raw_response: None,
            payload: P::take_output(raw.output)?,
        };

        if let (Some(store), Some(key)) = (&self.cache, &key) {
            let ttl = envelope.cache_ttl.unwrap_or(self.config.cache.default_ttl);
            cache_write(store.as_ref(), key, &result, ttl).await;
        }

        self.ledger
            .record(provider, operation, envelope.caller_id.as_deref(), cost);
        self.metrics.record_cost(provider, cost);
        self.metrics.record_request(
            operation,
            provider.as_str(),
            "success",
            start.elapsed().as_secs_f64(),
        );

        if self.config.logging.log_responses {
            result.raw_response = Some(raw.raw);
        }

        info!(
            provider = %provider,
            cost = cost,
            attempts = attempts,
            duration_ms = result.processing_time_ms,
            "Operation completed"
        );
        Ok(result)
    }

    async fn cache_read<O: DeserializeOwned>(
        &self,
        store: &dyn CacheStore,
        key: &str,
        operation: OperationType,
    ) -> Option<OperationResult<O>> {
        let hit = match store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<OperationResult<O>>(&bytes) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(cache = store.name(), error = %e, "Discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache = store.name(), error = %e, "Cache read failed");
                None
            }
        };
        self.metrics.record_cache_lookup(operation, hit.is_some());
        hit
    }
}

async fn cache_write<O: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    result: &OperationResult<O>,
    ttl: Duration,
) {
    let bytes = match serde_json::to_vec(result) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Result not cacheable");
            return;
        }
    };
    if let Err(e) = store.set(key, bytes, ttl).await {
        warn!(cache = store.name(), error = %e, "Cache write failed");
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
