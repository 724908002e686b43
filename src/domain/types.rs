//! Shared domain enumerations aligned with persisted database enums.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Outbound notification categories recorded in the sent-notification ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
pub enum NotificationKind {
    PopularityReached,
    ExpirationWarning,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::PopularityReached => "popularity_reached",
            NotificationKind::ExpirationWarning => "expiration_warning",
        }
    }
}

/// Two-phase deletion state of a paste.
///
/// Legal transitions: `Active → SoftDeleted` (expiry or manual delete),
/// `SoftDeleted → Active` (restore), `SoftDeleted → Purged` (retention
/// elapsed). Everything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    SoftDeleted { at: OffsetDateTime },
    Purged,
}

impl LifecycleState {
    pub fn can_transition_to(&self, next: &LifecycleState) -> bool {
        matches!(
            (self, next),
            (LifecycleState::Active, LifecycleState::SoftDeleted { .. })
                | (LifecycleState::SoftDeleted { .. }, LifecycleState::Active)
                | (LifecycleState::SoftDeleted { .. }, LifecycleState::Purged)
        )
    }

    pub fn is_soft_deleted(&self) -> bool {
        matches!(self, LifecycleState::SoftDeleted { .. })
    }
}

/// Who is reading a paste, for view dedup purposes.
///
/// Authenticated readers are identified by user id; anonymous readers by
/// client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitorIdentity {
    User(Uuid),
    Ip(IpAddr),
}

impl VisitorIdentity {
    /// Resolve the visitor identity the way the edge sees it: authenticated
    /// user id when present, otherwise the first `X-Forwarded-For` entry,
    /// falling back to the direct peer address.
    pub fn resolve(user_id: Option<Uuid>, forwarded_for: Option<&str>, peer: IpAddr) -> Self {
        if let Some(user_id) = user_id {
            return VisitorIdentity::User(user_id);
        }

        let forwarded = forwarded_for
            .and_then(|header| header.split(',').next())
            .and_then(|entry| entry.trim().parse::<IpAddr>().ok());

        VisitorIdentity::Ip(forwarded.unwrap_or(peer))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let now = OffsetDateTime::now_utc();
        let active = LifecycleState::Active;
        let deleted = LifecycleState::SoftDeleted { at: now };

        assert!(active.can_transition_to(&deleted));
        assert!(deleted.can_transition_to(&LifecycleState::Active));
        assert!(deleted.can_transition_to(&LifecycleState::Purged));

        assert!(!active.can_transition_to(&LifecycleState::Purged));
        assert!(!active.can_transition_to(&LifecycleState::Active));
        assert!(!LifecycleState::Purged.can_transition_to(&active));
        assert!(!LifecycleState::Purged.can_transition_to(&deleted));
    }

    #[test]
    fn visitor_prefers_authenticated_user() {
        let peer = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let user = Uuid::new_v4();

        let identity = VisitorIdentity::resolve(Some(user), Some("203.0.113.7"), peer);
        assert_eq!(identity, VisitorIdentity::User(user));
    }

    #[test]
    fn visitor_takes_first_forwarded_entry() {
        let peer = IpAddr::V4(Ipv4Addr::LOCALHOST);

        let identity = VisitorIdentity::resolve(None, Some("203.0.113.7, 10.0.0.1"), peer);
        assert_eq!(
            identity,
            VisitorIdentity::Ip("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn visitor_falls_back_to_peer_on_garbage_header() {
        let peer = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

        let identity = VisitorIdentity::resolve(None, Some("not-an-address"), peer);
        assert_eq!(identity, VisitorIdentity::Ip(peer));

        let identity = VisitorIdentity::resolve(None, None, peer);
        assert_eq!(identity, VisitorIdentity::Ip(peer));
    }
}
