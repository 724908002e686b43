//! Paste CRUD surface: create, fetch (with cache fast path and view
//! recording), soft delete, restore, and the per-author bulk variants.
//!
//! Every lifecycle change republishes the paste to the search indexer and
//! keeps the hash directory in step; both collaborators are best effort and
//! never fail the request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::{
    error::AppError,
    outbound::{HashDirectory, SearchDocument, SearchIndexPublisher},
    repos::{CreatePasteParams, PastesRepo, PastesWriteRepo, RepoError},
    views::ViewService,
};
use crate::cache::{ResponseCache, paste_key};
use crate::domain::{
    entities::PasteRecord,
    types::{LifecycleState, VisitorIdentity},
};

/// Externally visible projection of a paste; also the payload cached by the
/// popularity pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasteResponse {
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
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&PasteRecord> for PasteResponse {
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
            expires_at: paste.expires_at,
            created_at: paste.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePaste {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub author_id: Uuid,
    /// How long the paste should live; `None` means it never expires.
    pub lifetime: Option<Duration>,
}

/// The three addressing schemes a paste answers to.
#[derive(Debug, Clone, Copy)]
pub enum PasteLocator<'a> {
    Id(Uuid),
    Slug(&'a str),
    Hash(&'a str),
}

pub struct PasteService {
    pastes: Arc<dyn PastesRepo>,
    writes: Arc<dyn PastesWriteRepo>,
    cache: Arc<dyn ResponseCache>,
    views: Arc<ViewService>,
    search: Arc<dyn SearchIndexPublisher>,
    hashes: Arc<dyn HashDirectory>,
}

impl PasteService {
    pub fn new(
        pastes: Arc<dyn PastesRepo>,
        writes: Arc<dyn PastesWriteRepo>,
        cache: Arc<dyn ResponseCache>,
        views: Arc<ViewService>,
        search: Arc<dyn SearchIndexPublisher>,
        hashes: Arc<dyn HashDirectory>,
    ) -> Self {
        Self {
            pastes,
            writes,
            cache,
            views,
            search,
            hashes,
        }
    }

    pub async fn create(
        &self,
        request: CreatePaste,
        now: OffsetDateTime,
    ) -> Result<PasteRecord, AppError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        if request.content.is_empty() {
            return Err(AppError::validation("content must not be empty"));
        }

        let params = CreatePasteParams {
            slug: unique_slug(title),
            title: title.to_string(),
            content: request.content,
            summary: request.summary.unwrap_or_default(),
            author_id: request.author_id,
            expires_at: request.lifetime.map(|lifetime| now + lifetime),
        };

        let mut paste = self.writes.create_paste(params).await?;

        match self.hashes.lookup(paste.id).await {
            Ok(Some(hash)) => {
                self.writes.assign_hash(paste.id, &hash).await?;
                paste.hash = Some(hash);
            }
            Ok(None) => {}
            Err(err) => warn!(
                target: "application::pastes",
                paste_id = %paste.id,
                error = %err,
                "hash directory lookup failed; paste stays addressable by slug"
            ),
        }

        self.search.publish(SearchDocument::from(&paste)).await;

        info!(
            target: "application::pastes",
            paste_id = %paste.id,
            slug = paste.slug,
            "paste created"
        );
        Ok(paste)
    }

    /// Fetch a paste for display, recording the visitor's view.
    ///
    /// Lookups by id take the cache fast path; the cached snapshot may trail
    /// the store by up to its TTL.
    pub async fn fetch(
        &self,
        locator: PasteLocator<'_>,
        visitor: &VisitorIdentity,
    ) -> Result<PasteResponse, AppError> {
        let response = match locator {
            PasteLocator::Id(id) => match self.cached_response(id).await {
                Some(response) => response,
                None => self.load_live(self.pastes.find_live_by_id(id).await?)?,
            },
            PasteLocator::Slug(slug) => {
                self.load_live(self.pastes.find_live_by_slug(slug).await?)?
            }
            PasteLocator::Hash(hash) => {
                self.load_live(self.pastes.find_live_by_hash(hash).await?)?
            }
        };

        self.views.record_view(response.id, visitor).await?;

        Ok(response)
    }

    pub async fn delete(
        &self,
        id: Uuid,
        actor: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        let paste = self
            .pastes
            .find_live_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        check_owner(&paste, actor)?;

        let state = paste.lifecycle()?;
        if !state.can_transition_to(&LifecycleState::SoftDeleted { at: now }) {
            return Err(AppError::conflict("paste is already deleted"));
        }

        let deleted = self.writes.soft_delete(id, now).await?;

        self.cache.delete(&paste_key(id)).await;
        self.retire_hash(id).await;
        self.search.publish(SearchDocument::from(&deleted)).await;

        info!(target: "application::pastes", paste_id = %id, "paste soft-deleted");
        Ok(())
    }

    /// Bring a soft-deleted paste back. With an explicit `new_lifetime` the
    /// expiry restarts from `now`; otherwise the lifetime remaining at
    /// deletion time is preserved.
    pub async fn restore(
        &self,
        id: Uuid,
        actor: Uuid,
        new_lifetime: Option<Duration>,
        now: OffsetDateTime,
    ) -> Result<PasteRecord, AppError> {
        let Some(paste) = self.pastes.find_deleted_by_id(id).await? else {
            return if self.pastes.find_live_by_id(id).await?.is_some() {
                Err(AppError::conflict("paste is not deleted"))
            } else {
                Err(AppError::NotFound)
            };
        };
        check_owner(&paste, actor)?;

        let state = paste.lifecycle()?;
        if !state.can_transition_to(&LifecycleState::Active) {
            return Err(AppError::conflict("paste cannot be restored"));
        }

        let expires_at = match new_lifetime {
            Some(lifetime) => Some(now + lifetime),
            None => paste.restored_expires_at(now),
        };

        let restored = self.writes.restore(id, expires_at, now).await?;

        self.revive_hash(id).await;
        self.search.publish(SearchDocument::from(&restored)).await;

        info!(target: "application::pastes", paste_id = %id, "paste restored");
        Ok(restored)
    }

    pub async fn delete_all_by_author(
        &self,
        author_id: Uuid,
        actor: Uuid,
        now: OffsetDateTime,
    ) -> Result<u64, AppError> {
        if author_id != actor {
            return Err(AppError::Forbidden);
        }

        let pastes = self.pastes.list_live_by_author(author_id).await?;
        if pastes.is_empty() {
            return Err(AppError::NotFound);
        }

        let mut deleted = 0u64;
        for paste in pastes {
            match self.writes.soft_delete(paste.id, now).await {
                Ok(record) => {
                    deleted += 1;
                    self.cache.delete(&paste_key(paste.id)).await;
                    self.retire_hash(paste.id).await;
                    self.search.publish(SearchDocument::from(&record)).await;
                }
                // A concurrent delete got there first; nothing left to do.
                Err(RepoError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            target: "application::pastes",
            author_id = %author_id,
            deleted,
            "author pastes soft-deleted"
        );
        Ok(deleted)
    }

    pub async fn restore_all_by_author(
        &self,
        author_id: Uuid,
        actor: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<PasteRecord>, AppError> {
        if author_id != actor {
            return Err(AppError::Forbidden);
        }

        let pastes = self.pastes.list_deleted_by_author(author_id).await?;
        if pastes.is_empty() {
            return Err(AppError::NotFound);
        }

        let mut restored = Vec::with_capacity(pastes.len());
        for paste in pastes {
            let expires_at = paste.restored_expires_at(now);
            match self.writes.restore(paste.id, expires_at, now).await {
                Ok(record) => {
                    self.revive_hash(paste.id).await;
                    self.search.publish(SearchDocument::from(&record)).await;
                    restored.push(record);
                }
                Err(RepoError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            target: "application::pastes",
            author_id = %author_id,
            restored = restored.len(),
            "author pastes restored"
        );
        Ok(restored)
    }

    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<PasteRecord>, AppError> {
        Ok(self.pastes.list_live_by_author(author_id).await?)
    }

    pub async fn list_deleted_by_author(
        &self,
        author_id: Uuid,
        actor: Uuid,
    ) -> Result<Vec<PasteRecord>, AppError> {
        if author_id != actor {
            return Err(AppError::Forbidden);
        }
        Ok(self.pastes.list_deleted_by_author(author_id).await?)
    }

    async fn cached_response(&self, id: Uuid) -> Option<PasteResponse> {
        let body = self.cache.get(&paste_key(id)).await?;
        match serde_json::from_str(&body) {
            Ok(response) => Some(response),
            Err(err) => {
                warn!(
                    target: "application::pastes",
                    paste_id = %id,
                    error = %err,
                    "cached paste snapshot is unreadable; falling back to the store"
                );
                self.cache.delete(&paste_key(id)).await;
                None
            }
        }
    }

    fn load_live(&self, paste: Option<PasteRecord>) -> Result<PasteResponse, AppError> {
        paste
            .as_ref()
            .map(PasteResponse::from)
            .ok_or(AppError::NotFound)
    }

    async fn retire_hash(&self, id: Uuid) {
        if let Err(err) = self.hashes.mark_deleted(id).await {
            warn!(
                target: "application::pastes",
                paste_id = %id,
                error = %err,
                "hash directory delete failed"
            );
        }
    }

    async fn revive_hash(&self, id: Uuid) {
        if let Err(err) = self.hashes.mark_restored(id).await {
            warn!(
                target: "application::pastes",
                paste_id = %id,
                error = %err,
                "hash directory restore failed"
            );
        }
    }
}

fn check_owner(paste: &PasteRecord, actor: Uuid) -> Result<(), AppError> {
    if paste.author_id == actor {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Slugified title plus a short random suffix so identical titles coexist.
fn unique_slug(title: &str) -> String {
    let base = slug::slugify(title);
    let suffix = Uuid::new_v4().simple().to_string();
    if base.is_empty() {
        format!("paste-{}", &suffix[..8])
    } else {
        format!("{base}-{}", &suffix[..8])
    }
}
