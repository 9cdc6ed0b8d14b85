//! Interactor error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type returned by user-supplied behaviors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The user behavior that raised a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// A leaf's `perform`.
    Perform,
    /// A pipeline's `compose`.
    Compose,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Perform => "perform",
            Stage::Compose => "compose",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed compensation, collected while unwinding.
#[derive(Debug, Error)]
#[error("Compensation of '{unit}' failed: {source}")]
pub struct CompensationError {
    /// Name of the unit whose compensation failed.
    pub unit: String,
    /// The error raised by `compensate`.
    pub source: BoxError,
}

impl CompensationError {
    pub fn new(unit: impl Into<String>, source: BoxError) -> Self {
        Self {
            unit: unit.into(),
            source,
        }
    }
}

/// Errors surfaced by an interactor run.
#[derive(Debug, Error)]
pub enum InteractorError {
    /// A `perform` or `compose` call failed, and every compensation that
    /// ran afterwards succeeded.
    #[error("Interactor '{unit}' failed during {stage}: {source}")]
    Failed {
        unit: String,
        stage: Stage,
        source: BoxError,
    },

    /// A failure was followed by one or more failed compensations.
    ///
    /// The original failure is kept as `cause`; every compensation failure of
    /// the run is listed in the order it happened.
    #[error("{cause}, and {} compensation(s) also failed", compensation_errors.len())]
    CompensationFailed {
        #[source]
        cause: Box<InteractorError>,
        compensation_errors: Vec<CompensationError>,
    },

    /// A compensation failure replaced the original failure.
    ///
    /// Only produced under [`CompensationPolicy::Surface`](crate::CompensationPolicy::Surface).
    #[error("Compensation of '{unit}' failed: {source}")]
    CompensationSurfaced {
        unit: String,
        source: BoxError,
        replaced: Box<InteractorError>,
    },
}

impl InteractorError {
    pub(crate) fn failed(unit: impl Into<String>, stage: Stage, source: BoxError) -> Self {
        InteractorError::Failed {
            unit: unit.into(),
            stage,
            source,
        }
    }

    /// Attaches compensation failures, keeping the original cause.
    pub(crate) fn with_compensation_errors(self, mut errors: Vec<CompensationError>) -> Self {
        if errors.is_empty() {
            return self;
        }
        match self {
            InteractorError::CompensationFailed {
                cause,
                mut compensation_errors,
            } => {
                compensation_errors.append(&mut errors);
                InteractorError::CompensationFailed {
                    cause,
                    compensation_errors,
                }
            }
            other => InteractorError::CompensationFailed {
                cause: Box::new(other),
                compensation_errors: errors,
            },
        }
    }

    /// Replaces this failure with a compensation failure.
    pub(crate) fn surfaced(self, unit: impl Into<String>, source: BoxError) -> Self {
        InteractorError::CompensationSurfaced {
            unit: unit.into(),
            source,
            replaced: Box::new(self),
        }
    }

    /// Returns the error the caller observes.
    ///
    /// This is the error raised by the deepest failing `perform`/`compose`,
    /// unless a compensation failure was surfaced in its place.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            InteractorError::Failed { source, .. } => source.as_ref(),
            InteractorError::CompensationFailed { cause, .. } => cause.cause(),
            InteractorError::CompensationSurfaced { source, .. } => source.as_ref(),
        }
    }

    /// Returns the original `perform`/`compose` failure, even when a
    /// compensation failure was surfaced over it.
    pub fn root(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            InteractorError::Failed { source, .. } => source.as_ref(),
            InteractorError::CompensationFailed { cause, .. } => cause.root(),
            InteractorError::CompensationSurfaced { replaced, .. } => replaced.root(),
        }
    }

    /// Downcasts [`cause`](Self::cause) to a concrete error type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.cause().downcast_ref::<E>()
    }

    /// Returns the name of the unit whose error is observed.
    pub fn unit(&self) -> &str {
        match self {
            InteractorError::Failed { unit, .. } => unit,
            InteractorError::CompensationFailed { cause, .. } => cause.unit(),
            InteractorError::CompensationSurfaced { unit, .. } => unit,
        }
    }

    /// Returns the stage that failed, or `None` when a compensation failure
    /// was surfaced.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            InteractorError::Failed { stage, .. } => Some(*stage),
            InteractorError::CompensationFailed { cause, .. } => cause.stage(),
            InteractorError::CompensationSurfaced { .. } => None,
        }
    }

    /// Returns the compensation failures collected during the unwind.
    pub fn compensation_errors(&self) -> &[CompensationError] {
        match self {
            InteractorError::CompensationFailed {
                compensation_errors,
                ..
            } => compensation_errors,
            _ => &[],
        }
    }
}

/// Convenience type alias for interactor results.
pub type Result<T> = std::result::Result<T, InteractorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("{0}")]
    struct TestError(&'static str);

    fn boxed(msg: &'static str) -> BoxError {
        Box::new(TestError(msg))
    }

    #[test]
    fn test_failed_exposes_cause_and_stage() {
        let err = InteractorError::failed("Charge", Stage::Perform, boxed("declined"));

        assert_eq!(err.unit(), "Charge");
        assert_eq!(err.stage(), Some(Stage::Perform));
        assert_eq!(err.downcast_ref::<TestError>(), Some(&TestError("declined")));
        assert!(err.compensation_errors().is_empty());
        assert_eq!(
            err.to_string(),
            "Interactor 'Charge' failed during perform: declined"
        );
    }

    #[test]
    fn test_with_no_compensation_errors_is_unchanged() {
        let err = InteractorError::failed("Charge", Stage::Perform, boxed("declined"))
            .with_compensation_errors(Vec::new());
        assert!(matches!(err, InteractorError::Failed { .. }));
    }

    #[test]
    fn test_compensation_errors_accumulate_and_keep_cause() {
        let err = InteractorError::failed("Ship", Stage::Perform, boxed("no carrier"))
            .with_compensation_errors(vec![CompensationError::new("Ship", boxed("a"))])
            .with_compensation_errors(vec![CompensationError::new("Reserve", boxed("b"))]);

        assert_eq!(err.unit(), "Ship");
        assert_eq!(err.downcast_ref::<TestError>(), Some(&TestError("no carrier")));
        let units: Vec<_> = err
            .compensation_errors()
            .iter()
            .map(|e| e.unit.as_str())
            .collect();
        assert_eq!(units, vec!["Ship", "Reserve"]);
        assert_eq!(
            err.to_string(),
            "Interactor 'Ship' failed during perform: no carrier, and 2 compensation(s) also failed"
        );
    }

    #[test]
    fn test_surfaced_replaces_cause_but_keeps_root() {
        let err = InteractorError::failed("Ship", Stage::Perform, boxed("no carrier"))
            .surfaced("Reserve", boxed("release failed"));

        assert_eq!(err.unit(), "Reserve");
        assert_eq!(err.stage(), None);
        assert_eq!(
            err.downcast_ref::<TestError>(),
            Some(&TestError("release failed"))
        );
        assert_eq!(
            err.root().downcast_ref::<TestError>(),
            Some(&TestError("no carrier"))
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Perform.to_string(), "perform");
        assert_eq!(Stage::Compose.to_string(), "compose");
    }
}
