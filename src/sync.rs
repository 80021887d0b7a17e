//! Periodic synchronization of provider descriptions.
//!
//! Providers declare their own policy; the synchronizer pulls each registered
//! provider's description into the policy store at startup and on every tick
//! thereafter. A provider that fails to answer keeps its previously stored
//! policy; failures never halt the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::processor::PolicyStore;
use crate::provider::ClientRegistry;
use crate::{Error, Result};

/// Pull every registered provider's description into the policy store.
///
/// # Errors
///
/// Per-provider failures are isolated: the remaining providers still sync and
/// prior policies stay untouched. All failures are joined into a single
/// returned error.
pub async fn sync_once(clients: &ClientRegistry, descriptions: &PolicyStore) -> Result<()> {
    let mut failures = Vec::new();

    for (name, client) in clients.snapshot() {
        match client.description().await {
            Ok(policy) => {
                debug!(service = %name, methods = policy.methods.len(), "description synced");
                descriptions.set(name, Arc::new(policy));
            }
            Err(e) => failures.push(format!("could not get description for {name}: {e}")),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::DescriptionSync(failures.join("; ")))
    }
}

/// Run an initial sync, then keep the policy store fresh every `period` until
/// `shutdown` fires. An iteration in flight when the signal arrives drains
/// before the task stops.
pub async fn run(
    period: Duration,
    clients: Arc<ClientRegistry>,
    descriptions: Arc<PolicyStore>,
    shutdown: &broadcast::Sender<()>,
) {
    if let Err(e) = sync_once(&clients, &descriptions).await {
        error!(error = %e, "failed to sync some provider descriptions");
    }

    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately and the initial sync already ran.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = sync_once(&clients, &descriptions).await {
                        error!(error = %e, "failed to sync some provider descriptions");
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    });
}
