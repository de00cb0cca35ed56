//! Host lifecycle
//!
//! Runs the program, then the disposal sweep exactly once, whether the
//! program finished, failed or was interrupted with Ctrl-C. The sweep's
//! report decides the process exit status.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use svcg_domain::Result;
use svcg_infrastructure::config::DisposalConfig;
use svcg_infrastructure::di::{Container, DisposalReport};
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// One-shot shutdown flag with async waiting
pub struct ShutdownCoordinator {
    /// Shutdown signal flag
    shutdown_signal: AtomicBool,
    /// Notification channel for async waiting
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> Self {
        Self {
            shutdown_signal: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Flag shutdown; true only for the first caller
    pub fn signal_shutdown(&self) -> bool {
        let first = !self.shutdown_signal.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Whether shutdown was already signalled
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is signalled
    pub async fn wait_for_shutdown(&self) {
        let notified = self.notify.notified();
        if self.is_shutting_down() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("is_shutting_down", &self.is_shutting_down())
            .finish()
    }
}

/// How the program future ended
#[derive(Debug)]
pub enum Outcome {
    /// The program returned
    Finished(Result<()>),
    /// Ctrl-C arrived first
    Interrupted,
}

/// Process host owning the teardown of one container
#[derive(Debug, Clone)]
pub struct Lifecycle {
    container: Container,
    disposal: DisposalConfig,
    shutdown: Arc<ShutdownCoordinator>,
}

impl Lifecycle {
    /// Host for `container`, sweeping with `disposal` settings
    pub fn new(container: Container, disposal: DisposalConfig) -> Self {
        Self {
            container,
            disposal,
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Coordinator flagged when teardown starts
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Run the disposal sweep unless it already ran
    pub async fn teardown(&self) -> Option<DisposalReport> {
        if !self.shutdown.signal_shutdown() {
            warn!("teardown already ran");
            return None;
        }
        let report = self.container.run_disposal_with(&self.disposal).await;
        info!(
            disposed = report.disposed,
            failures = report.failures.len(),
            unfulfilled = report.unfulfilled.len(),
            "teardown finished"
        );
        Some(report)
    }

    /// Run `program` to completion or until Ctrl-C, then tear down
    pub async fn run<F, Fut>(&self, program: F) -> ExitCode
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl-C handler unavailable");
                std::future::pending::<()>().await;
            }
        };

        let outcome = tokio::select! {
            result = program(self.container.clone()) => Outcome::Finished(result),
            () = interrupted => Outcome::Interrupted,
        };

        match &outcome {
            Outcome::Finished(Ok(())) => {}
            Outcome::Finished(Err(e)) => {
                error!(error = %e, "program failed");
                eprintln!("error: {e}");
            }
            Outcome::Interrupted => warn!("interrupted"),
        }

        let report = self.teardown().await;
        if let Some(report) = &report
            && !report.is_clean()
        {
            eprint!("{report}");
        }
        ExitCode::from(exit_status(&outcome, report.as_ref()))
    }
}

/// Exit status for a program outcome and its teardown report
pub fn exit_status(outcome: &Outcome, report: Option<&DisposalReport>) -> u8 {
    let program_failed = !matches!(outcome, Outcome::Finished(Ok(())));
    let teardown_failed = report.is_some_and(|report| report.exit_code() != 0);
    u8::from(program_failed || teardown_failed)
}

/// Run `program` against `container`, then sweep teardown exactly once
pub async fn run_main<F, Fut>(container: Container, disposal: DisposalConfig, program: F) -> ExitCode
where
    F: FnOnce(Container) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    Lifecycle::new(container, disposal).run(program).await
}
