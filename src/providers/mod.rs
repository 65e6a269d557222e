//! Production implementations of the collaborator trait abstractions.
//!
//! This module provides the "real" implementations of the traits defined in
//! [`crate::traits`] that talk to a guardian attestation endpoint and the
//! system clock. Chain execution is deployment-specific and is implemented by
//! the embedder.
//!
//! Applications typically use these providers, while test code uses the fakes
//! in [`crate::testing`].

mod guardian;
mod tokio_clock;

pub use self::guardian::GuardianGateway;
pub use self::tokio_clock::TokioClock;
