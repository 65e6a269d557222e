use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// The bytes of a signed attestation (VAA).
pub type AttestationBytes = Vec<u8>;

/// Result of asking the attestation gateway about a source transaction.
///
/// Either the guardian network has produced the attestation (`Ready` with the
/// signed bytes, hex-encoded on the wire) or it has not yet (`Pending`).
/// Transport-level failures are reported as errors, not as a state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationFetch {
    pub state: AttestationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Bytes>,
}

impl AttestationFetch {
    pub fn ready(bytes: impl Into<Bytes>) -> Self {
        Self {
            state: AttestationState::Ready,
            bytes: Some(bytes.into()),
        }
    }

    pub fn pending() -> Self {
        Self {
            state: AttestationState::Pending,
            bytes: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == AttestationState::Ready
    }
}

/// Readiness of an attestation at the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttestationState {
    Ready,
    Pending,
}
