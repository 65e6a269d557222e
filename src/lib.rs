//! # vaa-bridge
//!
//! A crash-recoverable completion orchestrator for VAA-based token bridging.
//!
//! A token transfer submitted on a source chain only finishes once a
//! third-party guardian network produces a signed attestation (VAA) and a
//! claim transaction redeems it on the destination chain. This crate owns
//! that middle stretch: it persists every bridge transaction, polls for the
//! attestation on a bounded cadence, performs the idempotent destination
//! claim, and re-arms all in-flight work after a process restart.
//!
//! Chain submission and attestation retrieval are collaborator traits; the
//! orchestrator never encodes, signs, or verifies anything itself.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vaa_bridge::{BridgeError, Orchestrator, SledStore, TokioClock};
//! use vaa_bridge::providers::GuardianGateway;
//! # use vaa_bridge::testing::FakeChainExecutor;
//!
//! # async fn example() -> Result<(), BridgeError> {
//! # let my_chain_executor = FakeChainExecutor::new();
//! let orchestrator = Orchestrator::builder()
//!     .chain(my_chain_executor) // your ChainExecutor implementation
//!     .gateway(GuardianGateway::new("https://guardian.example.com")?)
//!     .store(SledStore::open("/var/lib/vaa-bridge")?)
//!     .clock(TokioClock::new())
//!     .build();
//!
//! // Re-arm anything left in flight by the previous process.
//! orchestrator.recover_pending().await?;
//!
//! // Bridge 100 tokens; returns as soon as the source chain confirms.
//! let receipt = orchestrator.initiate_transfer("0xT0KEN", "100").await?;
//! println!("bridging in {}", receipt.source_tx_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Durable state machine** — every transaction lives in the store
//!   (`submitted` → `polling` → `vaa_ready` → `claimed`), so progress
//!   survives restarts
//! - **Bounded polling** with a fixed cadence and attempt budget; transient
//!   gateway failures never fail a record
//! - **Idempotent claims** — an already-claimed record is never resubmitted,
//!   and concurrent claims for one id serialize
//! - **Startup recovery** re-arms pollers and finishes interrupted claims
//! - **Trait-based collaborators** with fakes in [`testing`] for
//!   network-free tests
//!
//! ## Public API
//!
//! - [`Orchestrator`] - the completion orchestrator and its operator surface
//! - [`TransactionStore`], [`InMemoryStore`], [`SledStore`] - durable records
//! - [`ChainExecutor`], [`AttestationGateway`], [`Clock`] - collaborator traits
//! - [`BridgeTransaction`], [`TransactionView`], [`BridgeTxStatus`] - the data model
//! - [`BridgeError`] and [`Result`] - error types
//! - [`providers`] - production gateway and clock implementations

mod attestation;
mod config;
mod error;
mod orchestrator;
mod store;
mod traits;
mod transaction;

pub use attestation::{AttestationBytes, AttestationFetch, AttestationState};
pub use config::{PollingConfig, RECOVERY_STAGGER};
pub use error::{BridgeError, Phase, Result};
pub use orchestrator::{Orchestrator, RecoveryReport, Registration, TransferReceipt};
pub use providers::TokioClock;
pub use store::{InMemoryStore, SledStore, TransactionStore};
pub use traits::{AttestationGateway, ChainExecutor, Clock};
pub use transaction::{
    BridgeTransaction, BridgeTxKind, BridgeTxStatus, NewTransaction, TransactionUpdate,
    TransactionView, TxFailure,
};

pub mod providers;

// Public module for test fakes used by the integration tests and embedders.
pub mod testing;

// Public module for advanced users who need custom instrumentation
pub mod spans;
