//! Logging utility tests

use svcg_domain::Error;
use svcg_infrastructure::config::LoggingConfig;
use svcg_infrastructure::logging::{bootstrap_dispatch, init_logging, parse_log_level};
use tracing::Level;
use tracing::dispatcher;

#[test]
fn test_parse_log_level() {
    assert_eq!(parse_log_level("trace").expect("trace"), Level::TRACE);
    assert_eq!(parse_log_level("DEBUG").expect("debug"), Level::DEBUG);
    assert_eq!(parse_log_level("info").expect("info"), Level::INFO);
    assert_eq!(parse_log_level("warning").expect("warning"), Level::WARN);
    assert_eq!(parse_log_level("error").expect("error"), Level::ERROR);
}

#[test]
fn test_parse_log_level_rejects_unknown() {
    let err = parse_log_level("verbose").expect_err("unknown level");
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_init_logging_rejects_invalid_level() {
    let config = LoggingConfig {
        level: "chatty".to_string(),
        ..LoggingConfig::default()
    };
    assert!(init_logging(&config).is_err());
}

#[test]
fn test_bootstrap_dispatch_defaults_to_info() {
    let dispatch = bootstrap_dispatch(false);
    dispatcher::with_default(&dispatch, || {
        assert!(tracing::enabled!(Level::INFO));
        assert!(!tracing::enabled!(Level::DEBUG));
    });
}

#[test]
fn test_bootstrap_dispatch_verbose_enables_debug() {
    let dispatch = bootstrap_dispatch(true);
    dispatcher::with_default(&dispatch, || {
        assert!(tracing::enabled!(Level::DEBUG));
    });
}
