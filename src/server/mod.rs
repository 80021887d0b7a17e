//! HTTP servers: the public gateway entrypoint and the admin surface.

mod admin;
mod public;

pub use admin::admin_router;
pub use public::public_router;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::Result;

/// One HTTP listener serving a router until shutdown.
pub struct Server {
    name: &'static str,
    address: String,
    router: Router,
}

impl Server {
    /// Create a server serving `router` on `address`
    #[must_use]
    pub fn new(name: &'static str, address: impl Into<String>, router: Router) -> Self {
        Self {
            name,
            address: address.into(),
            router,
        }
    }

    /// Bind and serve until `shutdown` fires; in-flight requests drain.
    ///
    /// # Errors
    ///
    /// Returns an error when binding or serving fails.
    pub async fn run(self, shutdown: &broadcast::Sender<()>) -> Result<()> {
        let listener = TcpListener::bind(&self.address).await?;
        info!(kind = self.name, addr = %self.address, "starting http server");

        let mut shutdown_rx = shutdown.subscribe();
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

        info!(kind = self.name, "http server stopped");
        Ok(())
    }
}
