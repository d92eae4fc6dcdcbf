//! Well-known role name constants and the ownership rule.
//!
//! These must match the CHECK constraint on `users.role` in
//! `20260301000001_create_users.sql`.

use crate::error::CoreError;
use crate::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

pub fn is_admin(role: &str) -> bool {
    role == ROLE_ADMIN
}

/// Allow the call when the actor owns the resource or is an administrator.
pub fn ensure_owner_or_admin(
    actor_id: DbId,
    actor_role: &str,
    owner_id: DbId,
) -> Result<(), CoreError> {
    if is_admin(actor_role) || actor_id == owner_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "You do not have access to this resource".into(),
        ))
    }
}
