//! Fresh instances built with explicit arguments

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use svcg_domain::{BoxError, Error};
use svcg_infrastructure::di::{Container, Declarations, InitContext, Inject, Service};

struct Clock;

impl Service for Clock {
    const LABEL: &'static str = "Clock";
    type Args = ();

    fn construct() -> Self {
        Self
    }
}

#[derive(Debug)]
struct Greeter {
    clock: Inject<Clock>,
    greeting: OnceLock<String>,
}

#[async_trait]
impl Service for Greeter {
    const LABEL: &'static str = "Greeter";
    type Args = Option<String>;

    fn construct() -> Self {
        Self {
            clock: Inject::new(),
            greeting: OnceLock::new(),
        }
    }

    fn declare(deps: &mut Declarations<'_, Self>) {
        deps.require("Clock", "clock", |s| &s.clock);
    }

    async fn init(
        self: Arc<Self>,
        _cx: InitContext,
        args: Option<String>,
    ) -> Result<(), BoxError> {
        let greeting = args.unwrap_or_else(|| "hello".to_string());
        if greeting.is_empty() {
            return Err("empty greeting".into());
        }
        let _ = self.greeting.set(greeting);
        Ok(())
    }
}

fn container() -> (Container, svcg_domain::Token<Greeter>) {
    let container = Container::new();
    container.register::<Clock>().expect("register clock");
    let token = container.register::<Greeter>().expect("register greeter");
    (container, token)
}

#[tokio::test]
async fn test_created_instances_are_independent() {
    let (container, token) = container();

    let first = container
        .create_instance(&token, Some("bonjour".to_string()))
        .await
        .expect("first");
    let second = container
        .create_instance(&token, Some("hola".to_string()))
        .await
        .expect("second");

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.greeting.get().map(String::as_str), Some("bonjour"));
    assert_eq!(second.greeting.get().map(String::as_str), Some("hola"));

    // Dependencies stay shared
    let first_clock = first.clock.shared().expect("clock wired");
    let second_clock = second.clock.shared().expect("clock wired");
    assert!(Arc::ptr_eq(&first_clock, &second_clock));
}

#[tokio::test]
async fn test_created_instance_is_not_the_singleton() {
    let (container, token) = container();

    let created = container
        .create_instance(&token, Some("salut".to_string()))
        .await
        .expect("created");
    let singleton = container.get(&token).await.expect("singleton");

    assert!(!Arc::ptr_eq(&created, &singleton));
    assert_eq!(singleton.greeting.get().map(String::as_str), Some("hello"));
}

#[tokio::test]
async fn test_created_instance_failure_is_wrapped() {
    let (container, token) = container();

    let err = container
        .create_instance(&token, Some(String::new()))
        .await
        .expect_err("empty greeting");
    assert!(matches!(err, Error::Initialization { .. }));
    assert!(err.to_string().contains("empty greeting"));

    // The registry singleton is unaffected
    assert!(container.unfulfilled().is_empty());
}
