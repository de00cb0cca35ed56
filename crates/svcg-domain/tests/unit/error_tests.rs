//! Unit tests for domain error types

use std::error::Error as _;
use std::fmt;

use svcg_domain::{BoxError, Error, TokenPath};

#[derive(Debug)]
struct Boom;

impl fmt::Display for Boom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("boom")
    }
}

impl std::error::Error for Boom {}

fn path(labels: &[&str]) -> TokenPath {
    labels.iter().collect()
}

#[test]
fn test_missing_provider_mentions_path() {
    let error = Error::missing_provider(
        "Secret Reader",
        path(&["Program Arguments", "Config Reader", "Secret Reader"]),
    );
    let display = error.to_string();
    assert!(display.contains("missing dependency: \"Secret Reader\""));
    assert!(display.contains("\"Program Arguments\" -> \"Config Reader\" -> \"Secret Reader\""));
}

#[test]
fn test_initialization_wraps_foreign_error() {
    let error = Error::initialization(path(&["A", "B"]), "B", Box::new(Boom));
    match &error {
        Error::Initialization { message, path, .. } => {
            assert_eq!(message, "can not initialize service \"B\"");
            assert_eq!(path.len(), 2);
        }
        other => panic!("Expected Initialization error, got {other:?}"),
    }
    assert_eq!(error.source().map(ToString::to_string), Some("boom".to_string()));
}

#[test]
fn test_initialization_does_not_double_wrap() {
    let inner = Error::initialization(path(&["A", "B", "C"]), "C", Box::new(Boom));
    let boxed: BoxError = Box::new(inner);
    let outer = Error::initialization(path(&["A"]), "A", boxed);

    match outer {
        Error::Initialization {
            message,
            path,
            source,
        } => {
            assert_eq!(
                message,
                "can not initialize service \"A\": can not initialize service \"C\""
            );
            // The deepest path is kept
            assert_eq!(path.len(), 3);
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("Expected Initialization error, got {other:?}"),
    }
}

#[test]
fn test_with_context_wraps_non_initialization_errors() {
    let error = Error::Abandoned {
        label: "C".to_string(),
    }
    .with_context("failed inject property \"c\" on \"B\"", &path(&["A", "B"]));

    match error {
        Error::Initialization { message, path, .. } => {
            assert_eq!(message, "failed inject property \"c\" on \"B\"");
            assert_eq!(path.len(), 2);
        }
        other => panic!("Expected Initialization error, got {other:?}"),
    }
}

#[test]
fn test_disposal_error_display() {
    let error = Error::disposal("Temp Directory", Box::new(Boom));
    assert_eq!(error.to_string(), "teardown of \"Temp Directory\" failed: boom");
}

#[test]
fn test_errors_are_cloneable() {
    let error = Error::initialization(path(&["A"]), "A", Box::new(Boom));
    let cloned = error.clone();
    assert_eq!(error.to_string(), cloned.to_string());
}

#[test]
fn test_path_accessor() {
    let error = Error::missing_provider("X", path(&["X"]));
    assert_eq!(error.path().map(TokenPath::len), Some(1));
    assert!(Error::internal("oops").path().is_none());
}
