//! Units of business logic and the traits user code implements.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use common::Context;

use crate::error::{BoxError, InteractorError};
use crate::executor::Executor;

/// Returns the last path segment of `T`'s type name.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A unit that performs direct work.
///
/// If `perform` fails, the executor calls `compensate` on the same instance
/// with the context as it stood at the failure, then propagates the error.
/// A leaf that completed is compensated again only if a later sibling in an
/// enclosing pipeline fails.
#[async_trait]
pub trait Leaf: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// Does the work, reading and mutating `context`.
    async fn perform(&mut self, context: &mut Context) -> Result<(), BoxError>;

    /// Undoes the work done by `perform`.
    ///
    /// The default implementation is a no-op, suitable for read-only units.
    async fn compensate(&mut self, context: &Context) -> Result<(), BoxError> {
        let _ = context;
        Ok(())
    }
}

/// A unit that composes an ordered sequence of child units.
///
/// Children run one at a time, each on its own copy of the context. A
/// child's resulting context replaces the pipeline's context before the next
/// child starts. When a child fails, the children that already completed are
/// compensated in reverse order.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// Decides which children to run.
    ///
    /// Composition must not have side effects that need undoing; wrap such
    /// work in a [`Leaf`] and return it as the first child instead.
    async fn compose(&self, context: &Context) -> Result<Vec<UnitFactory>, BoxError>;

    /// Undoes this pipeline's effects when a later sibling in an enclosing
    /// pipeline fails.
    ///
    /// The pipeline's own children are not compensated on that path; only
    /// this method runs. The default implementation is a no-op.
    async fn compensate(&mut self, context: &Context) -> Result<(), BoxError> {
        let _ = context;
        Ok(())
    }
}

/// A unit instance, with its execution mode fixed at construction.
pub enum Unit {
    /// Runs [`Leaf::perform`].
    Leaf(Box<dyn Leaf>),
    /// Runs the children returned by [`Pipeline::compose`].
    Pipeline(Box<dyn Pipeline>),
    /// Does nothing and returns the context unchanged.
    Empty,
}

impl Unit {
    pub fn leaf(leaf: impl Leaf + 'static) -> Self {
        Unit::Leaf(Box::new(leaf))
    }

    pub fn pipeline(pipeline: impl Pipeline + 'static) -> Self {
        Unit::Pipeline(Box::new(pipeline))
    }

    pub fn empty() -> Self {
        Unit::Empty
    }

    /// Returns the unit's name.
    pub fn name(&self) -> &str {
        match self {
            Unit::Leaf(leaf) => leaf.name(),
            Unit::Pipeline(pipeline) => pipeline.name(),
            Unit::Empty => "Empty",
        }
    }

    /// Returns the execution mode as a string.
    pub fn kind(&self) -> &'static str {
        match self {
            Unit::Leaf(_) => "leaf",
            Unit::Pipeline(_) => "pipeline",
            Unit::Empty => "empty",
        }
    }

    pub(crate) async fn compensate(&mut self, context: &Context) -> Result<(), BoxError> {
        match self {
            Unit::Leaf(leaf) => leaf.compensate(context).await,
            Unit::Pipeline(pipeline) => pipeline.compensate(context).await,
            Unit::Empty => Ok(()),
        }
    }

    /// Runs this unit with an executor configured from the environment.
    pub async fn run(self, context: Context) -> Result<Context, InteractorError> {
        Executor::from_env().run(self, context).await
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// A named constructor for a unit.
///
/// Pipelines return factories rather than instances, so each child is
/// instantiated only when its turn comes.
#[derive(Clone)]
pub struct UnitFactory {
    name: String,
    build: Arc<dyn Fn() -> Unit + Send + Sync>,
}

impl UnitFactory {
    /// Wraps an arbitrary constructor.
    pub fn new(name: impl Into<String>, build: impl Fn() -> Unit + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// Builds units of type `T` from its `Default` value.
    pub fn of<T: Interactor + Default>() -> Self {
        Self::new(short_type_name::<T>(), || T::default().into_unit())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiates a new unit.
    pub fn build(&self) -> Unit {
        (self.build)()
    }
}

impl std::fmt::Debug for UnitFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A type that can be turned into a [`Unit`].
///
/// Implementors pick their execution mode here, typically with
/// [`Unit::leaf`] or [`Unit::pipeline`]. A type implementing both [`Leaf`]
/// and [`Pipeline`] runs in whichever mode it returns.
pub trait Interactor: Sized + Send + 'static {
    fn into_unit(self) -> Unit;

    /// Instantiates `Self` and runs it on `context`.
    ///
    /// The executor is configured from the environment, so
    /// `INTERACTOR_COMPENSATION_POLICY` applies to every run started here.
    fn run(context: Context) -> impl Future<Output = Result<Context, InteractorError>> + Send
    where
        Self: Default,
    {
        let unit = Self::default().into_unit();
        async move { Executor::from_env().run(unit, context).await }
    }

    /// Like [`run`](Self::run), starting from an empty context.
    fn run_empty() -> impl Future<Output = Result<Context, InteractorError>> + Send
    where
        Self: Default,
    {
        Self::run(Context::new())
    }
}

impl Interactor for Unit {
    fn into_unit(self) -> Unit {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Leaf for Noop {
        async fn perform(&mut self, _context: &mut Context) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Named;

    #[async_trait]
    impl Pipeline for Named {
        fn name(&self) -> &str {
            "checkout"
        }

        async fn compose(&self, _context: &Context) -> Result<Vec<UnitFactory>, BoxError> {
            Ok(Vec::new())
        }
    }

    impl Interactor for Named {
        fn into_unit(self) -> Unit {
            Unit::pipeline(self)
        }
    }

    #[test]
    fn test_short_type_name_strips_module_path() {
        assert_eq!(short_type_name::<Noop>(), "Noop");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    #[test]
    fn test_unit_name_and_kind() {
        let leaf = Unit::leaf(Noop);
        assert_eq!(leaf.name(), "Noop");
        assert_eq!(leaf.kind(), "leaf");

        let pipeline = Unit::pipeline(Named);
        assert_eq!(pipeline.name(), "checkout");
        assert_eq!(pipeline.kind(), "pipeline");

        assert_eq!(Unit::empty().name(), "Empty");
        assert_eq!(Unit::empty().kind(), "empty");
    }

    #[test]
    fn test_factory_builds_fresh_units() {
        let factory = UnitFactory::of::<Named>();
        assert_eq!(factory.name(), "Named");
        assert_eq!(factory.build().kind(), "pipeline");
        assert_eq!(factory.clone().build().name(), "checkout");
    }

    #[test]
    fn test_debug_output_names_the_unit() {
        let debug = format!("{:?}", Unit::leaf(Noop));
        assert!(debug.contains("leaf"));
        assert!(debug.contains("Noop"));
    }

    #[tokio::test]
    async fn test_default_compensate_is_noop() {
        let mut unit = Unit::leaf(Noop);
        assert!(unit.compensate(&Context::new()).await.is_ok());
        assert!(Unit::empty().compensate(&Context::new()).await.is_ok());
    }
}
