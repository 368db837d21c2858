//! Deterministic simulation harness for the MemoAI client.
//!
//! In-process implementations of the Environment and Driver traits for
//! deterministic, reproducible testing of the full application stack:
//! [`memoai_app::Runtime`] drives a [`SimDriver`] whose transport is a
//! scripted [`SimBackend`], all on the virtual clock of a [`SimEnv`].
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the checks
//! that hold after every step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_backend;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, LoadingSettled, MessageSnapshot,
    NotificationOrder, SingleActiveStream, SystemSnapshot, TokenAccounting, UniqueMessageIds,
    Violation,
};
pub use sim_backend::{BackendConfig, BackendPhase, SimBackend};
pub use sim_driver::{Input, SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
