//! AWS Signature Version 4 request signing.

use chrono::{DateTime, Utc};
use gateway_core::{GatewayError, GatewayResult};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Long- or short-lived AWS credentials
#[derive(Clone)]
pub struct AwsCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: SecretString,
    /// Session token for temporary credentials
    pub session_token: Option<SecretString>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Signs requests for one service in one region
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: &'static str,
}

impl SigV4Signer {
    /// Create a signer
    #[must_use]
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
        service: &'static str,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service,
        }
    }

    /// Compute the headers to attach to a POST request.
    ///
    /// `headers` are the extra headers that will be sent and must be signed
    /// (lowercase names). The returned list contains those headers plus the
    /// date, payload hash, optional security token and `authorization`.
    ///
    /// # Errors
    /// Returns `GatewayError::Unknown` if the URL cannot be parsed
    pub fn sign(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
        now: DateTime<Utc>,
    ) -> GatewayResult<Vec<(String, String)>> {
        let parsed = url::Url::parse(url)
            .map_err(|e| GatewayError::unknown(format!("Invalid URL '{url}': {e}")))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(GatewayError::unknown(format!("URL '{url}' has no host"))),
        };
        let path = match parsed.path() {
            "" => "/",
            p => p,
        };

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(sha256(body));

        let mut signed: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        signed.insert("host".to_string(), host);
        signed.insert("x-amz-date".to_string(), amz_date.clone());
        signed.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        if let Some(token) = &self.credentials.session_token {
            signed.insert("x-amz-security-token".to_string(), token.expose_secret().clone());
        }

        let signed_headers = signed.keys().cloned().collect::<Vec<_>>().join(";");
        let canonical_headers: String = signed.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
        let canonical_request = format!(
            "POST\n{path}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            parsed.query().unwrap_or_default()
        );

        let credential_scope =
            format!("{date_stamp}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
            hex::encode(sha256(canonical_request.as_bytes()))
        );

        let secret = format!("AWS4{}", self.credentials.secret_access_key.expose_secret());
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credentials.access_key_id
        );

        // reqwest sets Host itself
        signed.remove("host");
        let mut out: Vec<(String, String)> = signed.into_iter().collect();
        out.push(("authorization".to_string(), authorization));
        Ok(out)
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> GatewayResult<[u8; 32]> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| GatewayError::unknown(format!("HMAC key rejected: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
