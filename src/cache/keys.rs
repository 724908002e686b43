//! Cache key formatting.
//!
//! Key shapes are shared with external cache deployments, so they are plain
//! strings rather than typed keys.

use uuid::Uuid;

use crate::domain::types::VisitorIdentity;

/// Key of the cached denormalized response for a paste.
pub fn paste_key(paste_id: Uuid) -> String {
    format!("paste:{paste_id}")
}

/// Dedup key for one visitor's view of one paste.
pub fn view_key(visitor: &VisitorIdentity, paste_id: Uuid) -> String {
    match visitor {
        VisitorIdentity::User(user_id) => format!("view:user:{user_id}:paste:{paste_id}"),
        VisitorIdentity::Ip(ip) => format!("view:ip:{ip}:paste:{paste_id}"),
    }
}
