//! Shared value types for the interactor workspace.

pub mod context;
pub mod types;

pub use context::{Context, ContextError};
pub use types::RunId;
