//! Test utilities and fake implementations of the collaborator traits.
//!
//! These fakes drive the orchestrator through timeouts, transient gateway
//! failures, claim rejections, and attestation state progressions without a
//! blockchain or a network. They are designed for the integration tests in
//! `tests/` but are exported for embedders testing their own wiring.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::attestation::AttestationFetch;
use crate::error::{BridgeError, Result};
use crate::traits::{AttestationGateway, ChainExecutor, Clock};

// ============================================================================
// Fake Chain Executor
// ============================================================================

/// A fake chain executor with scripted submission outcomes.
///
/// This allows testing scenarios like:
/// - Source-chain submission failure (no record may be created)
/// - Destination-chain claim failure followed by a successful retry
/// - "Attestation already consumed" claim errors
/// - Proving idempotency by counting claim submissions
#[derive(Clone, Debug, Default)]
pub struct FakeChainExecutor {
    transfer_results: Arc<Mutex<Vec<std::result::Result<String, String>>>>,
    claim_results: Arc<Mutex<Vec<std::result::Result<String, String>>>>,
    transfer_calls: Arc<Mutex<Vec<(String, String)>>>,
    claim_calls: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeChainExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a source transaction id to return from the next transfer.
    pub fn push_transfer_result(&self, source_tx_id: &str) {
        self.transfer_results
            .lock()
            .unwrap()
            .push(Ok(source_tx_id.to_string()));
    }

    /// Queue a transfer failure.
    pub fn push_transfer_failure(&self, reason: &str) {
        self.transfer_results
            .lock()
            .unwrap()
            .push(Err(reason.to_string()));
    }

    /// Queue a destination transaction id to return from the next claim.
    pub fn push_claim_result(&self, dest_tx_id: &str) {
        self.claim_results
            .lock()
            .unwrap()
            .push(Ok(dest_tx_id.to_string()));
    }

    /// Queue a claim failure.
    pub fn push_claim_failure(&self, reason: &str) {
        self.claim_results
            .lock()
            .unwrap()
            .push(Err(reason.to_string()));
    }

    /// Number of transfers submitted so far.
    pub fn transfer_count(&self) -> usize {
        self.transfer_calls.lock().unwrap().len()
    }

    /// Number of claims submitted so far.
    pub fn claim_count(&self) -> usize {
        self.claim_calls.lock().unwrap().len()
    }

    /// The attestation bytes of every claim submission, in order.
    pub fn claimed_attestations(&self) -> Vec<Vec<u8>> {
        self.claim_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainExecutor for FakeChainExecutor {
    async fn submit_transfer(&self, token_address: &str, amount: &str) -> Result<String> {
        let mut calls = self.transfer_calls.lock().unwrap();
        calls.push((token_address.to_string(), amount.to_string()));
        let n = calls.len();
        drop(calls);

        let mut scripted = self.transfer_results.lock().unwrap();
        if scripted.is_empty() {
            return Ok(format!("0xfake-src-{n}"));
        }
        scripted.remove(0).map_err(|reason| BridgeError::Transfer { reason })
    }

    async fn submit_claim(&self, attestation: &[u8]) -> Result<String> {
        let mut calls = self.claim_calls.lock().unwrap();
        calls.push(attestation.to_vec());
        let n = calls.len();
        drop(calls);

        let mut scripted = self.claim_results.lock().unwrap();
        if scripted.is_empty() {
            return Ok(format!("0xfake-dest-{n}"));
        }
        scripted.remove(0).map_err(|reason| BridgeError::Claim { reason })
    }
}

// ============================================================================
// Fake Attestation Gateway
// ============================================================================

/// One scripted gateway answer.
#[derive(Clone, Debug)]
pub enum FakeFetch {
    Ready(Vec<u8>),
    Pending,
    TransientError(String),
}

/// A fake attestation gateway that simulates guardian behavior.
///
/// Each source transaction id is configured with a sequence of answers; the
/// last answer repeats once the sequence is exhausted. Unconfigured ids
/// return a transient error, which the poller treats like not-ready.
#[derive(Clone, Debug, Default)]
pub struct FakeAttestationGateway {
    responses: Arc<Mutex<HashMap<String, Vec<FakeFetch>>>>,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeAttestationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a sequence of answers for a source transaction id.
    pub fn add_response_sequence(&self, source_tx_id: &str, responses: Vec<FakeFetch>) {
        self.responses
            .lock()
            .unwrap()
            .insert(source_tx_id.to_string(), responses);
    }

    /// Configure an immediately ready attestation.
    pub fn add_ready(&self, source_tx_id: &str, bytes: Vec<u8>) {
        self.add_response_sequence(source_tx_id, vec![FakeFetch::Ready(bytes)]);
    }

    /// Configure `pending_count` not-ready answers followed by a ready one.
    pub fn add_pending_then_ready(&self, source_tx_id: &str, pending_count: usize, bytes: Vec<u8>) {
        let mut responses = vec![FakeFetch::Pending; pending_count];
        responses.push(FakeFetch::Ready(bytes));
        self.add_response_sequence(source_tx_id, responses);
    }

    /// Configure an attestation that never becomes ready (timeout testing).
    pub fn add_always_pending(&self, source_tx_id: &str) {
        self.add_response_sequence(source_tx_id, vec![FakeFetch::Pending]);
    }

    /// Number of fetches issued for a source transaction id.
    pub fn call_count(&self, source_tx_id: &str) -> usize {
        self.call_counts
            .lock()
            .unwrap()
            .get(source_tx_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl AttestationGateway for FakeAttestationGateway {
    async fn fetch(&self, source_tx_id: &str) -> Result<AttestationFetch> {
        let index = {
            let mut counts = self.call_counts.lock().unwrap();
            let count = counts.entry(source_tx_id.to_string()).or_insert(0);
            let index = *count;
            *count += 1;
            index
        };

        let responses = self.responses.lock().unwrap();
        let Some(sequence) = responses.get(source_tx_id) else {
            return Err(BridgeError::Gateway {
                reason: format!("no scripted response for {source_tx_id}"),
            });
        };

        let answer = sequence
            .get(index)
            .or_else(|| sequence.last())
            .cloned()
            .expect("scripted sequence must not be empty");

        match answer {
            FakeFetch::Ready(bytes) => Ok(AttestationFetch::ready(bytes)),
            FakeFetch::Pending => Ok(AttestationFetch::pending()),
            FakeFetch::TransientError(reason) => Err(BridgeError::Gateway { reason }),
        }
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A fake clock that fast-forwards instead of waiting.
///
/// Records every sleep so tests can assert on the poll cadence without
/// burning wall time.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_time: Arc<Mutex<Instant>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast-forward the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock().unwrap();
        *time += duration;
    }

    /// Total time "slept" through this clock.
    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }

    /// Number of times sleep was called.
    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }
}

/// A clock that parks every sleeper until the test releases it.
///
/// Lets a test freeze the poll loop in its inter-attempt wait, run other
/// work against the same record, and then let the loop resume.
#[derive(Clone, Debug)]
pub struct GateClock {
    permits: Arc<tokio::sync::Semaphore>,
}

impl Default for GateClock {
    fn default() -> Self {
        Self {
            permits: Arc::new(tokio::sync::Semaphore::new(0)),
        }
    }
}

impl GateClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `n` parked or future sleepers proceed.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

#[async_trait]
impl Clock for GateClock {
    async fn sleep(&self, _duration: Duration) {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("gate semaphore closed");
        permit.forget();
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_clock_tracks_sleep_calls() {
        let clock = FakeClock::new();

        clock.sleep(Duration::from_secs(15)).await;
        clock.sleep(Duration::from_secs(30)).await;

        assert_eq!(clock.sleep_count(), 2);
        assert_eq!(clock.total_sleep_time(), Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_gate_clock_parks_until_released() {
        let clock = GateClock::new();
        let sleeper = tokio::spawn({
            let clock = clock.clone();
            async move { clock.sleep(Duration::from_secs(15)).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sleeper.is_finished());

        clock.release(1);
        sleeper.await.unwrap();
    }

    #[tokio::test]
    async fn test_fake_gateway_sequence() {
        let gateway = FakeAttestationGateway::new();
        gateway.add_pending_then_ready("0xAAA", 2, vec![0xbe, 0xef]);

        assert!(!gateway.fetch("0xAAA").await.unwrap().is_ready());
        assert!(!gateway.fetch("0xAAA").await.unwrap().is_ready());

        let third = gateway.fetch("0xAAA").await.unwrap();
        assert!(third.is_ready());
        assert_eq!(third.bytes.as_ref().map(|b| &b[..]), Some(&[0xbe, 0xef][..]));

        // Last answer repeats
        assert!(gateway.fetch("0xAAA").await.unwrap().is_ready());
        assert_eq!(gateway.call_count("0xAAA"), 4);
    }

    #[tokio::test]
    async fn test_fake_gateway_unconfigured_id_errors() {
        let gateway = FakeAttestationGateway::new();
        assert!(matches!(
            gateway.fetch("0xZZZ").await,
            Err(BridgeError::Gateway { .. })
        ));
    }

    #[tokio::test]
    async fn test_fake_executor_defaults_and_scripts() {
        let chain = FakeChainExecutor::new();

        let src = chain.submit_transfer("0xT", "100").await.unwrap();
        assert_eq!(src, "0xfake-src-1");

        chain.push_claim_failure("vaa already executed");
        let err = chain.submit_claim(&[0xbe]).await.unwrap_err();
        assert!(matches!(err, BridgeError::Claim { .. }));

        let dest = chain.submit_claim(&[0xbe]).await.unwrap();
        assert_eq!(dest, "0xfake-dest-2");
        assert_eq!(chain.claim_count(), 2);
    }
}
