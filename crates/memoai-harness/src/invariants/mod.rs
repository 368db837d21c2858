//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during system execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible execution paths.
//!
//! # Architecture
//!
//! The invariant system extracts observable state from the App into a
//! [`SystemSnapshot`], then runs registered [`Invariant`] checks against it.
//! Violations trigger panics with detailed context for debugging.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = SystemSnapshot::from_app(&app);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    LoadingSettled, NotificationOrder, SingleActiveStream, TokenAccounting, UniqueMessageIds,
};
pub use snapshot::{MessageSnapshot, SystemSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against system state.
///
/// Invariants are behavioral properties that must always hold.
/// They capture WHAT must be true, not specific test scenarios.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current state.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Collects multiple invariants and runs them all against system state.
/// Use [`InvariantRegistry::standard()`] for the checks that hold after
/// every step.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the invariants that hold after every step.
    ///
    /// Includes:
    /// - [`SingleActiveStream`]: at most one streaming message
    /// - [`UniqueMessageIds`]: no id appears twice
    /// - [`TokenAccounting`]: statistics agree with the log
    /// - [`NotificationOrder`]: notification ids increase
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SingleActiveStream);
        registry.add(UniqueMessageIds);
        registry.add(TokenAccounting);
        registry.add(NotificationOrder);
        registry
    }

    /// Standard invariants plus [`LoadingSettled`], for checks once the
    /// backend has nothing left to deliver.
    pub fn quiescent() -> Self {
        let mut registry = Self::standard();
        registry.add(LoadingSettled);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on first violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
