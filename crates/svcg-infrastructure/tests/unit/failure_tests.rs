//! Failure propagation tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use svcg_domain::{BoxError, Error, TokenPath};
use svcg_infrastructure::di::{Container, Declarations, InitContext, Inject, Service, ServiceState};

#[derive(Debug)]
struct Top {
    mid: Inject<Mid>,
}

struct Mid {
    bottom: Inject<Bottom>,
}

struct Bottom;

impl Service for Top {
    const LABEL: &'static str = "Top";
    type Args = ();

    fn construct() -> Self {
        Self { mid: Inject::new() }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.require("Mid", "mid", |s| &s.mid);
    }
}

impl Service for Mid {
    const LABEL: &'static str = "Mid";
    type Args = ();

    fn construct() -> Self {
        Self {
            bottom: Inject::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.require("Bottom", "bottom", |s| &s.bottom);
    }
}

#[async_trait]
impl Service for Bottom {
    const LABEL: &'static str = "Bottom";
    type Args = ();

    fn construct() -> Self {
        Self
    }

    async fn init(self: Arc<Self>, _cx: InitContext, _args: ()) -> Result<(), BoxError> {
        tokio::task::yield_now().await;
        Err("disk on fire".into())
    }
}

#[tokio::test]
async fn test_deep_failure_carries_full_path_once() {
    let container = Container::new();
    let token = container.register::<Top>().expect("register");
    container.register::<Mid>().expect("register");
    container.register::<Bottom>().expect("register");

    let err = container.get(&token).await.expect_err("must fail");
    match &err {
        Error::Initialization { message, path, .. } => {
            let expected: TokenPath = ["Top", "Mid", "Bottom"].into_iter().collect();
            assert_eq!(path, &expected);
            assert!(message.starts_with("failed inject property \"mid\" on \"Top\""));
            assert!(message.contains("can not initialize service \"Bottom\""));
        }
        other => panic!("Expected Initialization error, got {other:?}"),
    }

    let rendered = err.to_string();
    assert_eq!(rendered.matches("disk on fire").count(), 1);
    assert_eq!(
        rendered.matches("can not initialize service").count(),
        1,
        "context must not be duplicated: {rendered}"
    );
    assert!(rendered.ends_with("(resolution path: \"Top\" -> \"Mid\" -> \"Bottom\")"));
}

#[tokio::test]
async fn test_dependent_of_failed_service_never_completes() {
    let container = Container::new();
    let token = container.register::<Top>().expect("register");
    container.register::<Mid>().expect("register");
    container.register::<Bottom>().expect("register");

    let _ = container.get(&token).await;
    let mut unfulfilled = container.unfulfilled();
    unfulfilled.sort();
    assert_eq!(unfulfilled, vec!["Bottom", "Mid", "Top"]);
}

// ---------------------------------------------------------------------------
// Missing providers
// ---------------------------------------------------------------------------

struct Needy {
    ghost: Inject<Bottom>,
}

impl Service for Needy {
    const LABEL: &'static str = "Needy";
    type Args = ();

    fn construct() -> Self {
        Self {
            ghost: Inject::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.require("Ghost", "ghost", |s| &s.ghost);
    }
}

#[tokio::test]
async fn test_missing_provider_fails_synchronously() {
    let container = Container::new();
    let token = container.register::<Needy>().expect("register");

    let err = container.resolve(&token).expect_err("missing provider");
    match &err {
        Error::MissingProvider { label, path } => {
            assert_eq!(label, "Ghost");
            assert_eq!(path.to_string(), "\"Needy\" -> \"Ghost\"");
        }
        other => panic!("Expected MissingProvider, got {other:?}"),
    }

    // Nothing is left pending by the failed walk
    assert!(container.unfulfilled().is_empty());
    assert_eq!(
        container.catalog().find("Needy").map(|s| s.state),
        Some(ServiceState::Unresolved)
    );
}

#[tokio::test]
async fn test_ensure_unknown_label_is_missing() {
    let container = Container::new();
    let err = container.ensure("Nobody").await.expect_err("missing");
    assert!(matches!(err, Error::MissingProvider { .. }));
}

// ---------------------------------------------------------------------------
// Failed states are never retried
// ---------------------------------------------------------------------------

static FLAKY_ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Flaky;

#[async_trait]
impl Service for Flaky {
    const LABEL: &'static str = "Flaky";
    type Args = ();

    fn construct() -> Self {
        Self
    }

    async fn init(self: Arc<Self>, _cx: InitContext, _args: ()) -> Result<(), BoxError> {
        FLAKY_ATTEMPTS.fetch_add(1, Ordering::SeqCst);
        Err("transient".into())
    }
}

#[tokio::test]
async fn test_failed_initialization_is_permanent() {
    let container = Container::new();
    let token = container.register::<Flaky>().expect("register");

    let first = container.get(&token).await.expect_err("first");
    let second = container.get(&token).await.expect_err("second");

    assert_eq!(FLAKY_ATTEMPTS.load(Ordering::SeqCst), 1);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(
        container.catalog().find("Flaky").map(|s| s.state),
        Some(ServiceState::Failed)
    );
}

// ---------------------------------------------------------------------------
// Optional failures do not propagate
// ---------------------------------------------------------------------------

struct Resilient {
    flaky: Inject<Bottom>,
}

impl Service for Resilient {
    const LABEL: &'static str = "Resilient";
    type Args = ();

    fn construct() -> Self {
        Self {
            flaky: Inject::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.optional("Bottom", "bottom", |s| &s.flaky);
    }
}

#[tokio::test]
async fn test_optional_failure_does_not_propagate() {
    let container = Container::new();
    container.register::<Bottom>().expect("register");
    let token = container.register::<Resilient>().expect("register");

    let resilient = container.get(&token).await.expect("resilient completes");
    assert!(resilient.flaky.is_wired());
}

#[derive(Debug)]
struct Boom;

#[async_trait]
impl Service for Boom {
    const LABEL: &'static str = "Boom";
    type Args = ();

    fn construct() -> Self {
        Self
    }

    async fn init(self: Arc<Self>, _cx: InitContext, _args: ()) -> Result<(), BoxError> {
        panic!("wiring harness exploded");
    }
}

struct Sibling;

impl Service for Sibling {
    const LABEL: &'static str = "Sibling";
    type Args = ();

    fn construct() -> Self {
        Self
    }
}

struct Parent {
    boom: Inject<Boom>,
    sibling: Inject<Sibling>,
}

impl Service for Parent {
    const LABEL: &'static str = "Parent";
    type Args = ();

    fn construct() -> Self {
        Self {
            boom: Inject::new(),
            sibling: Inject::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.optional("Boom", "boom", |s| &s.boom);
        deps.require("Sibling", "sibling", |s| &s.sibling);
    }
}

#[tokio::test]
async fn test_panicking_optional_initializer_is_contained() {
    let container = Container::new();
    let boom = container.register::<Boom>().expect("register");
    container.register::<Sibling>().expect("register");
    let token = container.register::<Parent>().expect("register");

    let resolution = container.resolve(&token).expect("resolve returns");
    let parent = resolution.wait().await.expect("parent completes");
    assert!(parent.boom.is_wired());
    assert!(parent.sibling.is_wired());

    let err = container.get(&boom).await.expect_err("boom failed");
    match &err {
        Error::Initialization { message, source, .. } => {
            assert!(message.contains("can not initialize service \"Boom\""));
            assert!(source.to_string().contains("wiring harness exploded"));
        }
        other => panic!("Expected Initialization error, got {other:?}"),
    }
    assert_eq!(container.unfulfilled(), vec!["Boom".to_string()]);
}

// ---------------------------------------------------------------------------
// Runtime requirements
// ---------------------------------------------------------------------------

#[test]
fn test_resolution_needs_a_runtime() {
    let container = Container::new();
    let token = container.register::<Bottom>().expect("register");
    let err = container.resolve(&token).expect_err("no runtime");
    assert!(matches!(err, Error::NoRuntime { .. }));
}
