//! Runs the service's long-lived processes side by side and shuts them down together.
//!
//! - every named process receives the same cancellation token
//! - SIGINT/SIGTERM, or the first process to fail, cancels the token
//! - processes get a grace period to stop before they are aborted
//! - closers run afterwards, bounded by a timeout, whatever the outcome
//!
//! ```no_run
//! use hometel_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Runner::new()
//!         .with_named_process("ticker", |ctx| async move {
//!             while !ctx.is_cancelled() {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => {}
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => tracing::info!("tick"),
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move { Ok(()) })
//!         .run()
//!         .await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A long-running process driven until the token is cancelled
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> BoxFuture<anyhow::Result<()>> + Send>;

/// A cleanup step executed once all processes have stopped
pub type Closer = Box<dyn FnOnce() -> BoxFuture<anyhow::Result<()>> + Send>;

struct NamedProcess {
    name: String,
    process: AppProcess,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Cancelled, or every process returned Ok
    Clean,
    /// A process returned an error or panicked before cancellation
    Failed { process: String, error: anyhow::Error },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Clean => 0,
            RunOutcome::Failed { .. } => 1,
        }
    }
}

pub struct Runner {
    processes: Vec<NamedProcess>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    shutdown_grace: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Empty runner: 10s closer timeout, 10s shutdown grace period
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Add a process under a generated name
    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = format!("process_{}", self.processes.len());
        self.with_named_process(name, process)
    }

    /// Add a process; the name shows up in shutdown and failure logs
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.processes.push(NamedProcess {
            name: name.into(),
            process: Box::new(move |token| Box::pin(process(token))),
        });
        self
    }

    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(move || Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// How long processes may take to stop after cancellation before being aborted
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Share an externally owned token, e.g. to trigger shutdown from a test
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Run until a shutdown signal or a process failure, then exit the process
    pub async fn run(self) {
        install_signal_handlers(self.cancellation_token.clone());

        let outcome = self.execute().await;
        match &outcome {
            RunOutcome::Clean => info!("application exiting normally"),
            RunOutcome::Failed { process, error } => {
                error!(process = %process, "application exiting with error: {:#}", error)
            }
        }
        std::process::exit(outcome.exit_code());
    }

    /// Drive processes and closers without installing signal handlers or exiting
    pub async fn execute(self) -> RunOutcome {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for NamedProcess { name, process } in self.processes {
            let process_token = token.clone();
            join_set.spawn(async move {
                debug!(process = %name, "starting app process");
                let result = process(process_token).await;
                (name, result)
            });
        }

        let mut outcome = RunOutcome::Clean;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                joined = join_set.join_next() => match joined {
                    None => break,
                    Some(Ok((name, Ok(())))) => {
                        debug!(process = %name, "app process completed");
                    }
                    Some(Ok((name, Err(error)))) => {
                        error!(process = %name, "app process error: {:#}", error);
                        outcome = RunOutcome::Failed { process: name, error };
                        token.cancel();
                        break;
                    }
                    Some(Err(join_error)) => {
                        error!("app process panicked: {}", join_error);
                        outcome = RunOutcome::Failed {
                            process: "unknown".to_string(),
                            error: anyhow::anyhow!("app process panicked: {}", join_error),
                        };
                        token.cancel();
                        break;
                    }
                }
            }
        }

        token.cancel();
        drain_processes(join_set, self.shutdown_grace).await;

        if !self.closers.is_empty() {
            info!("running closers with timeout of {:?}", self.closer_timeout);
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => info!("all closers completed"),
                Err(_) => error!("closers timed out after {:?}", self.closer_timeout),
            }
        }

        outcome
    }
}

fn install_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => error!("error setting up signal handler: {}", err),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM signal");
                token.cancel();
            }
            Err(err) => error!("error setting up SIGTERM handler: {}", err),
        }
    });
}

async fn drain_processes(
    mut join_set: JoinSet<(String, anyhow::Result<()>)>,
    grace: Duration,
) {
    let drained = tokio::time::timeout(grace, async {
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => debug!(process = %name, "app process stopped"),
                Ok((name, Err(error))) => {
                    warn!(process = %name, "app process error during shutdown: {:#}", error)
                }
                Err(join_error) => warn!("app process panicked during shutdown: {}", join_error),
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!("app processes did not stop within {:?}, aborting", grace);
        join_set.shutdown().await;
    }
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();
    for closer in closers {
        closer_set.spawn(closer());
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => debug!("closer completed"),
            Ok(Err(err)) => error!("closer error: {:#}", err),
            Err(err) => error!("closer panicked: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cancellation_stops_processes_and_runs_closers() {
        let closer_called = Arc::new(AtomicBool::new(false));
        let flag = closer_called.clone();
        let token = CancellationToken::new();

        let runner = Runner::new()
            .with_named_process("waiter", |ctx| async move {
                ctx.cancelled().await;
                Ok(())
            })
            .with_closer(move || async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_cancellation_token(token.clone());

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let outcome = runner.execute().await;
        assert!(matches!(outcome, RunOutcome::Clean));
        assert!(closer_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failing_process_cancels_siblings() {
        let sibling_stopped = Arc::new(AtomicBool::new(false));
        let flag = sibling_stopped.clone();

        let outcome = Runner::new()
            .with_named_process("sibling", move |ctx| async move {
                ctx.cancelled().await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .with_named_process("broken", |_ctx| async move {
                Err(anyhow::anyhow!("boom"))
            })
            .execute()
            .await;

        match outcome {
            RunOutcome::Failed { process, error } => {
                assert_eq!(process, "broken");
                assert_eq!(error.to_string(), "boom");
            }
            RunOutcome::Clean => panic!("expected failure"),
        }
        assert!(sibling_stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stuck_process_is_aborted_after_grace() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            Runner::new()
                .with_app_process(|_ctx| async move {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                })
                .with_shutdown_grace(Duration::from_millis(50))
                .with_cancellation_token(token)
                .execute(),
        )
        .await
        .expect("runner should not hang on a stuck process");

        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_closer_errors_do_not_fail_the_run() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome = Runner::new()
            .with_closer(|| async move { Err(anyhow::anyhow!("flush failed")) })
            .with_cancellation_token(token)
            .execute()
            .await;

        assert!(matches!(outcome, RunOutcome::Clean));
    }
}
