//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod refresh_token_repo;
pub mod task_repo;
pub mod user_repo;
pub mod work_session_repo;

pub use refresh_token_repo::RefreshTokenRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
pub use work_session_repo::WorkSessionRepo;
