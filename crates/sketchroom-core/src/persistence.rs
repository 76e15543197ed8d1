//! Persistence gateway contract for saving finished artwork.
//!
//! The gateway itself lives outside the core (an HTTP API in the app shell);
//! this module fixes the request shape and the error taxonomy, and provides
//! an in-memory implementation for tests and offline use.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save rejected with status {status}")]
    Rejected { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Author of a saved artwork, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorIdentity {
    /// Stable subject identifier.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl AuthorIdentity {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            picture: None,
        }
    }
}

/// Body of a save call: the encoded image plus who drew it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Image as a `data:` URL.
    pub art: String,
    pub user: AuthorIdentity,
}

/// Accepts finished artwork for storage.
///
/// Implementations report failure; they never retry internally.
pub trait PersistenceGateway {
    fn save(&self, request: SaveRequest) -> BoxFuture<'_, PersistenceResult<()>>;
}

/// Gateway that keeps saved requests in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    saved: RwLock<Vec<SaveRequest>>,
    /// When set, every save is rejected with this status.
    reject_with: RwLock<Option<u16>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail (`Some(status)`) or succeed (`None`).
    pub fn set_reject(&self, status: Option<u16>) {
        if let Ok(mut reject) = self.reject_with.write() {
            *reject = status;
        }
    }

    /// Requests accepted so far, oldest first.
    pub fn saved(&self) -> Vec<SaveRequest> {
        self.saved.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn save(&self, request: SaveRequest) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            let reject = self
                .reject_with
                .read()
                .map_err(|e| PersistenceError::Transport(format!("Lock error: {}", e)))?;
            if let Some(status) = *reject {
                return Err(PersistenceError::Rejected { status });
            }
            drop(reject);

            let mut saved = self
                .saved
                .write()
                .map_err(|e| PersistenceError::Transport(format!("Lock error: {}", e)))?;
            saved.push(request);
            Ok(())
        })
    }
}

/// Drive a future to completion on the current thread (tests only).
#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, Waker};

    let mut cx = Context::from_waker(Waker::noop());
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(out) = f.as_mut().poll(&mut cx) {
            return out;
        }
    }
}
