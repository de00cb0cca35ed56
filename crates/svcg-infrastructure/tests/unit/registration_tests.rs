//! Token and provider registration tests

use std::sync::Arc;

use svcg_domain::Error;
use svcg_infrastructure::di::{Container, Declarations, Inject, Service, ServiceState};

#[derive(Debug, PartialEq, Eq)]
struct Arguments(Vec<String>);

struct Logger;

impl Service for Logger {
    const LABEL: &'static str = "Logger";
    type Args = ();

    fn construct() -> Self {
        Self
    }
}

struct Reporter {
    arguments: Inject<Arguments>,
    logger: Inject<Logger>,
}

impl Service for Reporter {
    const LABEL: &'static str = "Reporter";
    type Args = ();

    fn construct() -> Self {
        Self {
            arguments: Inject::new(),
            logger: Inject::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.require("Arguments", "arguments", |s| &s.arguments)
            .optional("Logger", "logger", |s| &s.logger);
    }
}

#[tokio::test]
async fn test_provided_value_is_ready_and_injectable() {
    let container = Container::new();
    let arguments = container
        .create_token::<Arguments>("Arguments")
        .expect("token");
    container
        .provide_value(&arguments, Arc::new(Arguments(vec!["check".to_string()])))
        .expect("provide");
    container.register::<Logger>().expect("register");
    let reporter = container.register::<Reporter>().expect("register");

    let resolution = container.resolve(&arguments).expect("resolve");
    assert!(resolution.is_ready());

    let reporter = container.get(&reporter).await.expect("reporter");
    assert_eq!(
        reporter.arguments.get(),
        Some(&Arguments(vec!["check".to_string()]))
    );
    assert!(reporter.logger.is_wired());
}

#[test]
fn test_duplicate_provider_is_rejected() {
    let container = Container::new();
    container.register::<Logger>().expect("first");
    let err = container.register::<Logger>().expect_err("second");
    assert!(matches!(err, Error::DuplicateProvider { .. }));

    let token = container.token::<Logger>().expect("token");
    let err = container
        .provide_value(&token, Arc::new(Logger))
        .expect_err("value over provider");
    assert!(matches!(err, Error::DuplicateProvider { .. }));
}

#[test]
fn test_label_reuse_with_another_type_conflicts() {
    let container = Container::new();
    container.create_token::<Logger>("Shared").expect("first");
    let err = container
        .create_token::<Arguments>("Shared")
        .expect_err("conflict");
    assert!(matches!(err, Error::TokenConflict { .. }));

    let again = container.create_token::<Logger>("Shared").expect("same type");
    assert_eq!(again.label(), "Shared");
}

#[test]
fn test_foreign_token_is_unknown() {
    let ours = Container::new();
    let theirs = Container::new();
    let foreign = theirs.token::<Logger>().expect("token");

    let err = ours.register_provider(&foreign).expect_err("foreign");
    assert!(matches!(err, Error::UnknownToken { .. }));
    let err = ours.resolve(&foreign).expect_err("foreign");
    assert!(matches!(err, Error::UnknownToken { .. }));
}

#[test]
fn test_provider_under_custom_label() {
    let container = Container::new();
    let token = container
        .create_token::<Logger>("Audit Logger")
        .expect("token");
    container.register_provider(&token).expect("register");

    let catalog = container.catalog();
    let info = catalog.find("Audit Logger").expect("registered");
    assert_eq!(info.state, ServiceState::Unresolved);
    assert!(info.provider.ends_with("Logger"));
    assert!(catalog.find("Logger").is_none());
}

#[test]
fn test_catalog_lists_dependencies_in_registration_order() {
    let container = Container::new();
    container.register::<Reporter>().expect("register");
    container.register::<Logger>().expect("register");

    let catalog = container.catalog();
    let labels: Vec<&str> = catalog.labels().collect();
    assert_eq!(labels, vec!["Reporter", "Logger"]);

    let reporter = catalog.find("Reporter").expect("reporter");
    assert_eq!(reporter.dependencies.len(), 2);
    assert!(reporter.dependencies[0].required);
    assert!(!reporter.dependencies[1].required);
    assert!(catalog.to_string().contains("optional \"Logger\" as `logger`"));
}
