//! Model invariants.
//!
//! Invariants are properties of [`LibrarySystem`] that must hold after every
//! committed batch, whatever the simulator answered. The checker runs the
//! registry before committing a batch; property tests run it after every
//! step of a generated campaign.
//!
//! # Usage
//!
//! ```
//! # use circulation_harness::invariants::InvariantRegistry;
//! # use circulation_model::LibrarySystem;
//! let registry = InvariantRegistry::standard();
//! let library = LibrarySystem::default();
//! assert!(registry.check_all(&library).is_ok());
//! ```

mod checks;

use circulation_model::LibrarySystem;
pub use checks::{CreditBounds, LoanConsistency, ReservationConsistency, ShelfIndexConsistency};

/// Invariant check result.
pub type InvariantResult = Result<(), InvariantViolation>;

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// A property that must hold for every reachable library state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current state.
    fn check(&self, library: &LibrarySystem) -> InvariantResult;

    /// Violation of this invariant.
    fn violation(&self, message: String) -> InvariantViolation {
        InvariantViolation { invariant: self.name(), message }
    }
}

/// Registry of invariants to check.
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

    /// Registry with every standard invariant.
    ///
    /// Includes:
    /// - [`ShelfIndexConsistency`]: the shelf index lists exactly the shelved copies
    /// - [`CreditBounds`]: credit stays within the clamp
    /// - [`LoanConsistency`]: loans and lent copies agree
    /// - [`ReservationConsistency`]: reserved orders point at their AO copy
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ShelfIndexConsistency);
        registry.add(CreditBounds);
        registry.add(LoanConsistency);
        registry.add(ReservationConsistency);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, library: &LibrarySystem) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(library).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on the first failure.
    ///
    /// For tests that want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, library: &LibrarySystem, context: &str) {
        if let Err(violations) = self.check_all(library) {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn busy_library_passes_invariants() {
        let mut library = LibrarySystem::default();
        library.initialize(["A-0001 1", "B-0001 2", "C-0001 2"]).unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        library.apply_open(day);
        library.apply_borrow("23370001", "B-0001-01").unwrap();
        library.apply_borrow("23370001", "C-0001-02").unwrap();
        library.apply_read("23370002", "A-0001-01").unwrap();
        library.apply_order("23370003", "C-0001");
        library
            .apply_tidy_move(
                "C-0001-01",
                circulation_model::Location::Bookshelf,
                circulation_model::Location::AppointmentOffice,
            )
            .unwrap();
        library.apply_reservation_at_ao("C-0001-01", "23370003", day).unwrap();

        InvariantRegistry::standard().assert_all(&library, "after a busy morning");
    }
}
