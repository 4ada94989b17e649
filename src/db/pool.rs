//! Shared, lazily initialized connection handle.
//!
//! # Design Decisions
//!
//! - **`OnceCell` for the handle**: the first caller runs the initializer,
//!   concurrent callers await the same attempt instead of opening their own
//!   pool. A failed attempt leaves the cell empty so the next call retries.
//! - **`AtomicBool` for teardown**: `close()` is synchronous and idempotent;
//!   once closed, every `get` fails with a connection error. The handle itself
//!   is released when the owning `Arc` is dropped.

use crate::error::{GatewayError, GatewayResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub struct LazyHandle<T> {
    label: &'static str,
    cell: OnceCell<T>,
    closed: AtomicBool,
}

impl<T> LazyHandle<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            cell: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the handle, initializing it on first use.
    ///
    /// Initialization is single-flight: concurrent callers wait for the
    /// in-progress attempt.
    pub async fn get<F, Fut>(&self, init: F) -> GatewayResult<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.ensure_open()?;
        let value = self
            .cell
            .get_or_try_init(|| async move {
                debug!(handle = self.label, "Initializing shared handle");
                let value = init().await?;
                info!(handle = self.label, "Shared handle ready");
                Ok::<_, GatewayError>(value)
            })
            .await?;
        // close() may have raced with a slow initializer
        self.ensure_open()?;
        Ok(value)
    }

    /// Whether the handle has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Reject all further use. Returns false if already closed.
    pub fn close(&self) -> bool {
        let was_open = !self.closed.swap(true, Ordering::AcqRel);
        if was_open {
            info!(handle = self.label, "Shared handle closed");
        }
        was_open
    }

    fn ensure_open(&self) -> GatewayResult<()> {
        if self.is_closed() {
            return Err(GatewayError::connection(
                format!("{} is closed", self.label),
                "The server is shutting down; retry against a running instance",
            ));
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for LazyHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyHandle")
            .field("label", &self.label)
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .finish()
    }
}
