//! Single-flight coordination for token refreshes.

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::error::ClientError;

type InFlight = Shared<BoxFuture<'static, Result<String, ClientError>>>;

/// Coalesces concurrent refresh attempts into one.
///
/// The first caller starts the refresh; anyone arriving while it is still
/// running awaits the same future and receives the same result. Once it
/// settles the slot is emptied, so a later expiry triggers a fresh
/// refresh. Each gate is independent; two clients never share one.
#[derive(Default)]
pub struct RefreshGate {
    slot: Mutex<Option<InFlight>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight refresh, or start one with `start`.
    pub async fn run<F>(&self, start: F) -> Result<String, ClientError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<String, ClientError>>,
    {
        let in_flight = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let fresh = start().shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        let result = in_flight.clone().await;

        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|s| s.ptr_eq(&in_flight)) {
            *slot = None;
        }
        result
    }
}
