use super::routes::build_router;
use crate::app::AppContext;
use crate::error::{Result, ServerError};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// HTTP front end over the assembled router
pub struct HttpServer {
    address: SocketAddr,
    router: Router,
}

impl HttpServer {
    pub fn new(context: &AppContext) -> Result<Self> {
        Ok(Self {
            address: context.config.bind_address()?,
            router: build_router(context.clone()),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let listener =
            TcpListener::bind(self.address)
                .await
                .map_err(|e| ServerError::BindFailed {
                    address: self.address.to_string(),
                    source: e,
                })?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// On cancellation the listener stops accepting and the call returns once
    /// in-flight requests have completed.
    pub async fn serve_on(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        info!("HTTP server accepting connections on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::ServeFailed {
            details: format!("Server error: {}", e),
        })?;

        info!("HTTP server stopped");
        Ok(())
    }
}
