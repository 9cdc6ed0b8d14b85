//! Executor for leaf and pipeline units.

use std::time::Instant;

use common::{Context, RunId};
use futures_util::future::BoxFuture;
use tracing::Instrument;

use crate::config::{CompensationPolicy, ExecutorConfig};
use crate::error::{BoxError, CompensationError, InteractorError, Stage};
use crate::journal::{EntryKind, Journal, UnitPath};
use crate::unit::{Leaf, Pipeline, Unit};

/// A child that completed inside a pipeline, kept for compensation.
struct Completed {
    unit: Unit,
    context: Context,
    path: UnitPath,
}

/// Runs units and compensates them on failure.
///
/// An executor holds only configuration, so one instance can drive any
/// number of independent runs, concurrently or not.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Creates a new executor.
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Creates an executor configured from environment variables.
    ///
    /// See [`ExecutorConfig::from_env`].
    pub fn from_env() -> Self {
        Self::new(ExecutorConfig::from_env())
    }

    /// Creates an executor with default settings and the given policy.
    pub fn with_policy(policy: CompensationPolicy) -> Self {
        Self::new(ExecutorConfig::default().with_policy(policy))
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs `unit` on `context`, returning the final context on success.
    ///
    /// # Errors
    ///
    /// Returns the failure raised by the deepest failing `perform` or
    /// `compose`, after every completed unit has been compensated. How
    /// compensation failures are reported depends on the configured
    /// [`CompensationPolicy`].
    pub async fn run(&self, unit: Unit, context: Context) -> Result<Context, InteractorError> {
        let (result, _journal) = self.run_with_journal(unit, context).await;
        result
    }

    /// Runs `unit` and returns both the result and the execution journal.
    pub async fn run_with_journal(
        &self,
        mut unit: Unit,
        context: Context,
    ) -> (Result<Context, InteractorError>, Journal) {
        metrics::counter!("interactor_runs_total").increment(1);
        let started = Instant::now();
        let run_id = RunId::new();
        let mut journal = Journal::new(run_id);

        let span = tracing::info_span!(
            "interactor.run",
            %run_id,
            unit = unit.name(),
            policy = %self.config.compensation_policy,
        );
        let result = self
            .execute(&mut unit, context, UnitPath::root(), &mut journal)
            .instrument(span)
            .await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("interactor_run_duration_seconds").record(duration);
        match &result {
            Ok(_) => {
                tracing::info!(%run_id, unit = unit.name(), duration, "interactor run completed");
            }
            Err(error) => {
                metrics::counter!("interactor_failures_total").increment(1);
                tracing::warn!(%run_id, unit = unit.name(), %error, duration, "interactor run failed");
            }
        }

        (result, journal)
    }

    /// Dispatches on the unit's mode.
    fn execute<'a>(
        &'a self,
        unit: &'a mut Unit,
        context: Context,
        path: UnitPath,
        journal: &'a mut Journal,
    ) -> BoxFuture<'a, Result<Context, InteractorError>> {
        Box::pin(async move {
            match unit {
                Unit::Leaf(leaf) => self.execute_leaf(leaf.as_mut(), context, path, journal).await,
                Unit::Pipeline(pipeline) => {
                    self.execute_pipeline(pipeline.as_mut(), context, path, journal)
                        .await
                }
                Unit::Empty => {
                    journal.record(&path, "Empty", EntryKind::Started);
                    journal.record(&path, "Empty", EntryKind::Completed);
                    Ok(context)
                }
            }
        })
    }

    async fn execute_leaf(
        &self,
        leaf: &mut dyn Leaf,
        mut context: Context,
        path: UnitPath,
        journal: &mut Journal,
    ) -> Result<Context, InteractorError> {
        let name = leaf.name().to_string();
        journal.record(&path, &name, EntryKind::Started);
        tracing::debug!(unit = %name, %path, "leaf started");

        let source = match leaf.perform(&mut context).await {
            Ok(()) => {
                journal.record(&path, &name, EntryKind::Completed);
                tracing::debug!(unit = %name, %path, "leaf completed");
                return Ok(context);
            }
            Err(source) => source,
        };

        tracing::warn!(unit = %name, %path, error = %source, "leaf failed, compensating");
        journal.record(
            &path,
            &name,
            EntryKind::Failed {
                error: source.to_string(),
            },
        );
        let failure = InteractorError::failed(name.as_str(), Stage::Perform, source);

        metrics::counter!("interactor_compensations_total").increment(1);
        match leaf.compensate(&context).await {
            Ok(()) => {
                journal.record(&path, &name, EntryKind::Compensated);
                tracing::info!(unit = %name, %path, "leaf compensated");
                Err(failure)
            }
            Err(compensation) => {
                self.record_compensation_failure(journal, &path, &name, &compensation);
                Err(match self.config.compensation_policy {
                    CompensationPolicy::PreserveCause => failure
                        .with_compensation_errors(vec![CompensationError::new(name, compensation)]),
                    CompensationPolicy::Surface => failure.surfaced(name, compensation),
                })
            }
        }
    }

    async fn execute_pipeline(
        &self,
        pipeline: &mut dyn Pipeline,
        context: Context,
        path: UnitPath,
        journal: &mut Journal,
    ) -> Result<Context, InteractorError> {
        let name = pipeline.name().to_string();
        journal.record(&path, &name, EntryKind::Started);

        let factories = match pipeline.compose(&context).await {
            Ok(factories) => factories,
            Err(source) => {
                tracing::warn!(unit = %name, %path, error = %source, "composition failed");
                journal.record(
                    &path,
                    &name,
                    EntryKind::Failed {
                        error: source.to_string(),
                    },
                );
                return Err(InteractorError::failed(name, Stage::Compose, source));
            }
        };
        tracing::debug!(unit = %name, %path, children = factories.len(), "pipeline composed");

        let mut context = context;
        let mut completed: Vec<Completed> = Vec::with_capacity(factories.len());

        for (index, factory) in factories.iter().enumerate() {
            let child_path = path.child(index);
            let mut child = factory.build();

            // The child owns its context; ours is replaced only on success.
            match self
                .execute(&mut child, context, child_path.clone(), journal)
                .await
            {
                Ok(child_context) => {
                    context = child_context.clone();
                    completed.push(Completed {
                        unit: child,
                        context: child_context,
                        path: child_path,
                    });
                }
                Err(error) => {
                    journal.record(
                        &path,
                        &name,
                        EntryKind::Failed {
                            error: error.to_string(),
                        },
                    );
                    tracing::warn!(
                        unit = %name,
                        %path,
                        failed_child = child.name(),
                        to_compensate = completed.len(),
                        "pipeline child failed, unwinding"
                    );
                    return Err(self.unwind(completed, error, journal).await);
                }
            }
        }

        journal.record(&path, &name, EntryKind::Completed);
        tracing::debug!(unit = %name, %path, "pipeline completed");
        Ok(context)
    }

    /// Compensates completed children in reverse completion order.
    async fn unwind(
        &self,
        completed: Vec<Completed>,
        failure: InteractorError,
        journal: &mut Journal,
    ) -> InteractorError {
        let mut compensation_errors = Vec::new();

        for Completed {
            mut unit,
            context,
            path,
        } in completed.into_iter().rev()
        {
            let name = unit.name().to_string();
            metrics::counter!("interactor_compensations_total").increment(1);

            match unit.compensate(&context).await {
                Ok(()) => {
                    journal.record(&path, &name, EntryKind::Compensated);
                    tracing::info!(unit = %name, %path, "unit compensated");
                }
                Err(source) => {
                    self.record_compensation_failure(journal, &path, &name, &source);
                    match self.config.compensation_policy {
                        CompensationPolicy::PreserveCause => {
                            compensation_errors.push(CompensationError::new(name, source));
                        }
                        CompensationPolicy::Surface => return failure.surfaced(name, source),
                    }
                }
            }
        }

        failure.with_compensation_errors(compensation_errors)
    }

    fn record_compensation_failure(
        &self,
        journal: &mut Journal,
        path: &UnitPath,
        name: &str,
        source: &BoxError,
    ) {
        metrics::counter!("interactor_compensation_failures_total").increment(1);
        tracing::error!(
            unit = %name,
            %path,
            error = %source,
            policy = %self.config.compensation_policy,
            "compensation failed"
        );
        journal.record(
            path,
            name,
            EntryKind::CompensationFailed {
                error: source.to_string(),
            },
        );
    }
}
