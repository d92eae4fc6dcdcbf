//! Shared success envelope for API handlers.
//!
//! Every successful JSON response is `{ "status": "ok", "data": ... }`,
//! mirroring the `{ "status": "error", "error": ... }` shape produced by
//! [`AppError`](crate::error::AppError).

use serde::Serialize;

/// Standard `{ "status": "ok", "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse::new(items)))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}
