use super::types::{LifecycleReport, ShutdownReason};
use super::AppContext;
use crate::error::Result;
use crate::http::HttpServer;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{error, info, warn};

impl AppContext {
    /// Initialize services, serve HTTP until a signal arrives, then shut down.
    ///
    /// This is the only place that drives the lifecycle. Returns the process
    /// exit code.
    pub async fn run(&self) -> Result<i32> {
        // Address errors surface before any service is initialized
        let server = HttpServer::new(self)?;

        let startup = self.lifecycle.initialize_all().await?;
        log_report(&startup);

        info!("Chatbot backend listening on {}", server.address());
        let mut server_task = tokio::spawn(server.serve(self.shutdown.clone()));

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        setup_signal_handlers(shutdown_sender);

        let mut server_finished = false;
        let reason = tokio::select! {
            received = shutdown_receiver => received.unwrap_or_else(|_| {
                ShutdownReason::Error("Signal handlers exited without a signal".to_string())
            }),
            joined = &mut server_task => {
                server_finished = true;
                match joined {
                    Ok(Ok(())) => ShutdownReason::Error("HTTP server exited unexpectedly".to_string()),
                    Ok(Err(e)) => ShutdownReason::Error(e.to_string()),
                    Err(e) => ShutdownReason::Error(format!("HTTP server task failed: {}", e)),
                }
            }
        };

        info!("Shutdown initiated: {:?}", reason);

        // Stop accepting and let in-flight requests drain
        self.shutdown.cancel();
        if !server_finished {
            let grace = self.config.shutdown_grace();
            match timeout(grace, &mut server_task).await {
                Ok(_) => info!("In-flight requests drained"),
                Err(_) => {
                    warn!(
                        "Requests still in flight after {:?}, closing connections",
                        grace
                    );
                    server_task.abort();
                }
            }
        }

        let report = self.lifecycle.shutdown_all().await?;
        log_report(&report);

        let exit_code = match reason {
            ShutdownReason::Error(_) => 1,
            _ if report.has_failures() => 1,
            _ => 0,
        };
        info!("Chatbot backend shutdown complete");
        Ok(exit_code)
    }

    /// Run startup and shutdown without serving; for `--dry-run`
    pub async fn dry_run(&self) -> Result<i32> {
        let startup = self.lifecycle.initialize_all().await?;
        log_report(&startup);
        let shutdown = self.lifecycle.shutdown_all().await?;
        log_report(&shutdown);

        Ok(if startup.critical_failures() > 0 || shutdown.has_failures() {
            1
        } else {
            0
        })
    }
}

fn log_report(report: &LifecycleReport) {
    for entry in report.entries() {
        if entry.outcome.is_failure() {
            error!(
                service = %entry.service,
                phase = ?report.phase(),
                "{:?}",
                entry.outcome
            );
        } else {
            info!(
                service = %entry.service,
                phase = ?report.phase(),
                elapsed_ms = entry.elapsed_ms,
                "{:?}",
                entry.outcome
            );
        }
    }
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown_sender: oneshot::Sender<ShutdownReason>) {
    let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

    // Handle SIGTERM - Unix only
    #[cfg(unix)]
    {
        let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to register SIGTERM handler: {}", e);
                    return;
                }
            };
            if let Some(()) = sigterm.recv().await {
                info!("Received SIGTERM signal");
                if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                }
            }
        });
    }

    // Handle SIGINT (Ctrl+C) - Cross-platform
    let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            info!("Received SIGINT signal (Ctrl+C)");
            if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
            }
        }
    });
}
