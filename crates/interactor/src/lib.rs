//! Compensating interactor engine.
//!
//! This crate runs units of business logic ("interactors") and undoes them
//! on failure. A unit is either a leaf, which performs direct work, or a
//! pipeline, which composes an ordered sequence of child units.
//!
//! - A leaf whose `perform` fails has its own `compensate` called before the
//!   failure propagates.
//! - A pipeline whose child fails compensates every child that already
//!   completed, in reverse completion order, then propagates the failure.
//!
//! Each child runs on its own copy of the context; its result replaces the
//! pipeline's context before the next child starts.

pub mod config;
pub mod error;
pub mod executor;
pub mod journal;
pub mod state;
pub mod telemetry;
pub mod unit;

pub use common::{Context, ContextError, RunId};
pub use config::{CompensationPolicy, ConfigError, ExecutorConfig};
pub use error::{BoxError, CompensationError, InteractorError, Stage};
pub use executor::Executor;
pub use journal::{EntryKind, Journal, JournalEntry, UnitOutcome, UnitPath};
pub use state::UnitStatus;
pub use unit::{Interactor, Leaf, Pipeline, Unit, UnitFactory};

/// Re-exported so implementors do not need a direct dependency.
pub use async_trait::async_trait;
