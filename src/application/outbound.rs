//! Seams toward the collaborating services: notification dispatch, search
//! indexing, and the hash directory.
//!
//! The engine never talks to those services directly; it publishes through
//! these traits and lets the infra adapters worry about transport.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{entities::PasteRecord, types::NotificationKind};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collaborator responded with status {status}")]
    Status { status: u16 },
}

/// Payload handed to the notification channel: recipient, template kind, and
/// the display fields the renderer substitutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub recipient: Uuid,
    pub kind: NotificationKind,
    pub fields: BTreeMap<String, String>,
}

impl NotificationMessage {
    pub fn for_paste(paste: &PasteRecord, kind: NotificationKind) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("paste_title".to_string(), paste.title.clone());
        Self {
            recipient: paste.author_id,
            kind,
            fields,
        }
    }
}

/// Denormalized snapshot published to the search indexer on every lifecycle
/// change (create, soft delete, restore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: Uuid,
    pub slug: String,
    pub hash: Option<String>,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub author_id: Uuid,
    pub rating: i16,
    pub views_count: i64,
    pub likes_count: i64,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&PasteRecord> for SearchDocument {
    fn from(paste: &PasteRecord) -> Self {
        Self {
            id: paste.id,
            slug: paste.slug.clone(),
            hash: paste.hash.clone(),
            title: paste.title.clone(),
            content: paste.content.clone(),
            summary: paste.summary.clone(),
            author_id: paste.author_id,
            rating: paste.rating,
            views_count: paste.views_count,
            likes_count: paste.likes_count,
            is_deleted: paste.is_deleted,
            expires_at: paste.expires_at,
            created_at: paste.created_at,
        }
    }
}

/// Fire-and-forget publish toward the email/notification service. Delivery is
/// the channel's concern; implementations log failures and move on.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, message: NotificationMessage);
}

/// Fire-and-forget publish toward the search indexer.
#[async_trait]
pub trait SearchIndexPublisher: Send + Sync {
    async fn publish(&self, document: SearchDocument);
}

/// Synchronous client of the hash directory service.
#[async_trait]
pub trait HashDirectory: Send + Sync {
    /// External alias for a paste, when one has been generated.
    async fn lookup(&self, paste_id: Uuid) -> Result<Option<String>, CollaboratorError>;

    async fn mark_deleted(&self, paste_id: Uuid) -> Result<(), CollaboratorError>;

    async fn mark_restored(&self, paste_id: Uuid) -> Result<(), CollaboratorError>;
}
