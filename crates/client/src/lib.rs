//! Typed HTTP client for the Pomodoro tracker API.
//!
//! [`ApiClient`] keeps the current access token in memory and the refresh
//! token in its cookie store. When a request comes back `401`, the client
//! refreshes once and retries; concurrent callers on the same client share
//! that single refresh through [`RefreshGate`](refresh::RefreshGate).

pub mod client;
pub mod error;
pub mod models;
pub mod refresh;

pub use client::ApiClient;
pub use error::ClientError;
