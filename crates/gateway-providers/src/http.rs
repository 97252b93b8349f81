//! HTTP plumbing shared by every adapter.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use gateway_core::{GatewayError, GatewayResult, ProviderKind};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Build the pooled client used by one adapter
///
/// # Errors
/// Returns `GatewayError::Unknown` if the TLS backend cannot be initialized
pub fn build_client(timeout: Duration) -> GatewayResult<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| GatewayError::unknown(format!("Failed to create HTTP client: {e}")))
}

/// Map a non-2xx response to the error taxonomy
#[must_use]
pub fn classify_status(provider: ProviderKind, status: u16, body: &str) -> GatewayError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        401 | 403 => GatewayError::authentication(provider, message, Some(status)),
        429 => GatewayError::rate_limit(Some(provider), message),
        _ => GatewayError::provider(provider, message, Some(status), status >= 500),
    }
}

/// Map a transport failure to the error taxonomy
#[must_use]
pub fn classify_transport(
    provider: ProviderKind,
    error: &reqwest::Error,
    timeout: Duration,
) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(provider, timeout)
    } else if error.is_decode() {
        GatewayError::provider(provider, format!("Failed to read response: {error}"), None, false)
    } else {
        GatewayError::provider(provider, format!("Request failed: {error}"), None, true)
    }
}

/// Pull a human-readable message out of a provider error body
fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("message"),
            value.get("Message"),
            value.get("error"),
        ];
        let message = candidates
            .into_iter()
            .flatten()
            .find_map(|v| v.as_str().map(str::to_string));
        if message.is_some() {
            return message;
        }
    }
    let body = body.trim();
    (!body.is_empty()).then(|| body.chars().take(512).collect())
}

/// Send a request and parse a JSON response, keeping the raw body
///
/// # Errors
/// Returns a classified error for transport failures, non-2xx statuses and
/// bodies that do not match `T`
pub async fn send_json<T: DeserializeOwned>(
    provider: ProviderKind,
    request: RequestBuilder,
    timeout: Duration,
) -> GatewayResult<(T, Value)> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport(provider, &e, timeout))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(provider, &e, timeout))?;

    if !status.is_success() {
        debug!(provider = %provider, status = status.as_u16(), "Provider returned error status");
        return Err(classify_status(provider, status.as_u16(), &body));
    }
    trace!(provider = %provider, bytes = body.len(), "Provider response received");

    let raw: Value = serde_json::from_str(&body).map_err(|e| {
        GatewayError::provider(provider, format!("Failed to parse response: {e}"), None, false)
    })?;
    let parsed = T::deserialize(&raw).map_err(|e| {
        GatewayError::provider(provider, format!("Unexpected response shape: {e}"), None, false)
    })?;
    Ok((parsed, raw))
}

/// Binary media resolved from a URL, data URL or bare base64 string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// Decoded bytes
    pub data: Vec<u8>,
    /// MIME type, when known
    pub mime: Option<String>,
}

/// Split a `data:<mime>;base64,<payload>` URL
#[must_use]
pub fn parse_data_url(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Build a `data:` URL from raw base64
#[must_use]
pub fn to_data_url(mime: &str, base64: &str) -> String {
    format!("data:{mime};base64,{base64}")
}

/// Whether a media source is a remote URL
#[must_use]
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Decode an inline media source without touching the network
///
/// # Errors
/// Returns a validation error when the source is neither a data URL nor valid base64
pub fn decode_inline(field: &str, source: &str) -> GatewayResult<Media> {
    let (mime, payload) = match parse_data_url(source) {
        Some((mime, payload)) => (Some(mime.to_string()), payload),
        None => (None, source.trim()),
    };
    let data = BASE64.decode(payload).map_err(|e| {
        GatewayError::validation(
            format!("{field} is not a URL, data URL or base64 payload: {e}"),
            Some(field.to_string()),
            "invalid_media",
        )
    })?;
    Ok(Media { data, mime })
}

/// Resolve a media source, downloading it when it is a remote URL
///
/// # Errors
/// Returns a validation error for undecodable inline data or a classified
/// provider error when the download fails
pub async fn load_media(
    client: &Client,
    provider: ProviderKind,
    field: &str,
    source: &str,
    timeout: Duration,
) -> GatewayResult<Media> {
    if !is_remote(source) {
        return decode_inline(field, source);
    }

    let response = client
        .get(source)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport(provider, &e, timeout))?;
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::validation(
            format!("{field} could not be downloaded (HTTP {status})"),
            Some(field.to_string()),
            "invalid_media",
        ));
    }
    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let data = response
        .bytes()
        .await
        .map_err(|e| classify_transport(provider, &e, timeout))?
        .to_vec();
    Ok(Media { data, mime })
}

/// Encode bytes as standard base64
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Error for an operation the adapter was asked to run but does not serve
#[must_use]
pub fn unsupported(provider: ProviderKind, operation: gateway_core::OperationType) -> GatewayError {
    GatewayError::validation(
        format!("{provider} does not support {operation}"),
        None,
        "unsupported_operation",
    )
}
