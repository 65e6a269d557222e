//! Guardian REST attestation gateway implementation.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::attestation::AttestationFetch;
use crate::error::{BridgeError, Result};
use crate::traits::AttestationGateway;

/// Attestation gateway backed by a guardian network's REST endpoint.
///
/// Fetches signed VAAs from `GET {base}/v1/signed_vaa/{source_tx_id}`. A 404
/// means the guardians have not observed the transfer yet and maps to a
/// pending fetch; a 429 surfaces as a transient rate-limit error the poller
/// retries on its normal cadence.
///
/// # Examples
///
/// ```rust,no_run
/// use vaa_bridge::providers::GuardianGateway;
/// use vaa_bridge::AttestationGateway;
///
/// # async fn example() -> Result<(), vaa_bridge::BridgeError> {
/// let gateway = GuardianGateway::new("https://guardian.example.com")?;
/// let fetch = gateway.fetch("0xAAA").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GuardianGateway {
    base_url: Url,
    client: Client,
}

/// Wire shape of a signed-VAA response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedVaaResponse {
    vaa_bytes: Bytes,
}

impl GuardianGateway {
    /// Creates a gateway against the given guardian base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| BridgeError::InvalidUrl {
            reason: format!("invalid guardian base URL: {e}"),
        })?;
        Ok(Self {
            base_url,
            client: Client::new(),
        })
    }

    fn signed_vaa_url(&self, source_tx_id: &str) -> Result<Url> {
        self.base_url
            .join(&format!("/v1/signed_vaa/{source_tx_id}"))
            .map_err(|e| BridgeError::InvalidUrl {
                reason: format!("failed to construct signed VAA URL: {e}"),
            })
    }
}

#[async_trait]
impl AttestationGateway for GuardianGateway {
    #[instrument(skip(self), fields(source_tx_id = %source_tx_id))]
    async fn fetch(&self, source_tx_id: &str) -> Result<AttestationFetch> {
        let url = self.signed_vaa_url(source_tx_id)?;
        trace!(url = %url, "Requesting signed VAA from guardian");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(BridgeError::Network)?;

        let status_code = response.status();
        trace!(status_code = %status_code, "Received response from guardian");

        if status_code == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(300);

            debug!(retry_after_seconds = retry_after, "Rate limit exceeded");
            return Err(BridgeError::RateLimitExceeded {
                retry_after_seconds: retry_after,
            });
        }

        // The guardians have not produced the VAA yet.
        if status_code == reqwest::StatusCode::NOT_FOUND {
            debug!("Signed VAA not found yet");
            return Ok(AttestationFetch::pending());
        }

        response.error_for_status_ref()?;

        let body: SignedVaaResponse = response.json().await.map_err(BridgeError::Network)?;
        debug!(
            vaa_length_bytes = body.vaa_bytes.len(),
            "Signed VAA retrieved"
        );

        Ok(AttestationFetch::ready(body.vaa_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_vaa_url_format() {
        let gateway = GuardianGateway::new("https://guardian.example.com").unwrap();
        let url = gateway.signed_vaa_url("0xAAA").unwrap();
        insta::assert_snapshot!(
            url.as_str(),
            @"https://guardian.example.com/v1/signed_vaa/0xAAA"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            GuardianGateway::new("not a url"),
            Err(BridgeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_response_wire_shape() {
        let body: SignedVaaResponse =
            serde_json::from_str(r#"{"vaaBytes":"0xbeef"}"#).unwrap();
        assert_eq!(body.vaa_bytes.as_ref(), &[0xbe, 0xef]);
    }
}
