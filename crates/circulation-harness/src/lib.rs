//! Conformance harness for library circulation simulators.
//!
//! This crate holds everything between the library model and the process
//! driver: it decides what to ask a simulator and whether its answers are
//! legal.
//!
//! # Components
//!
//! - [`generator`]: seeded command batches and the open/close cycle
//! - [`checker`]: lock-step judgement of a batch against the model
//! - [`invariants`]: properties the model must keep after every batch
//! - [`replay`]: offline checking of recorded transcripts
//! - [`reference`]: an in-process simulator that always answers legally
//!
//! # Example
//!
//! ```
//! use circulation_harness::{Checker, ReferenceLibrary};
//! use circulation_model::LibraryRules;
//! use circulation_proto::{Command, Inventory};
//!
//! let inventory = Inventory::new(vec![("B-0001".into(), 1)]);
//! let mut sut = ReferenceLibrary::from_inventory(LibraryRules::default(), &inventory).unwrap();
//! let mut model = sut.library().clone();
//!
//! let open: Command = "[2025-01-01] OPEN".parse().unwrap();
//! let output = sut.respond(&open).unwrap();
//! assert!(Checker::new().check_batch(&mut model, &[open], &output).is_ok());
//! ```

pub mod checker;
mod error;
pub mod generator;
pub mod invariants;
pub mod reference;
pub mod replay;

pub use checker::{Checker, Verdict, Violation, ViolationKind};
pub use error::{ConfigError, ReplayError};
pub use generator::{
    CommandGenerator, CommandKind, CommandWeights, CycleConfig, CycleScheduler, GeneratorConfig,
    InventoryConfig,
};
pub use invariants::{Invariant, InvariantRegistry, InvariantViolation};
pub use reference::ReferenceLibrary;
pub use replay::check_transcript;
