//! Static entry points pick up the compensation policy from the environment.
//!
//! This binary holds a single test because it mutates the process
//! environment.

use async_trait::async_trait;
use interactor::{BoxError, Context, Executor, Interactor, InteractorError, Leaf, Unit};

#[derive(Default)]
struct Broken;

#[async_trait]
impl Leaf for Broken {
    async fn perform(&mut self, _context: &mut Context) -> Result<(), BoxError> {
        Err("perform failed".into())
    }

    async fn compensate(&mut self, _context: &Context) -> Result<(), BoxError> {
        Err("compensate failed".into())
    }
}

impl Interactor for Broken {
    fn into_unit(self) -> Unit {
        Unit::leaf(self)
    }
}

#[test]
fn test_static_entry_points_use_policy_from_environment() {
    // SAFETY: no other thread exists yet; the runtime is built afterwards.
    unsafe { std::env::set_var("INTERACTOR_COMPENSATION_POLICY", "surface") };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    assert_eq!(
        Executor::from_env().config().compensation_policy,
        interactor::CompensationPolicy::Surface
    );

    let err = runtime.block_on(Broken::run_empty()).unwrap_err();
    assert!(matches!(err, InteractorError::CompensationSurfaced { .. }));
    assert_eq!(err.cause().to_string(), "compensate failed");
    assert_eq!(err.root().to_string(), "perform failed");

    let err = runtime
        .block_on(Unit::leaf(Broken).run(Context::new()))
        .unwrap_err();
    assert!(matches!(err, InteractorError::CompensationSurfaced { .. }));
}
