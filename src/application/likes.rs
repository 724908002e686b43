//! Likes with per-(paste, user) uniqueness, backing the `likes_count`
//! counter.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::{
    error::AppError,
    repos::{LikesRepo, PastesRepo, PastesWriteRepo},
};

pub struct LikeService {
    likes: Arc<dyn LikesRepo>,
    pastes: Arc<dyn PastesRepo>,
    writes: Arc<dyn PastesWriteRepo>,
}

impl LikeService {
    pub fn new(
        likes: Arc<dyn LikesRepo>,
        pastes: Arc<dyn PastesRepo>,
        writes: Arc<dyn PastesWriteRepo>,
    ) -> Self {
        Self {
            likes,
            pastes,
            writes,
        }
    }

    pub async fn like(
        &self,
        paste_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        if self.pastes.find_live_by_id(paste_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        match self.likes.insert_like(paste_id, user_id, now).await {
            Ok(_) => {}
            Err(err) if err.is_duplicate() => {
                return Err(AppError::conflict("paste is already liked"));
            }
            Err(err) => return Err(err.into()),
        }

        // The unique like row above makes this increment fire at most once
        // per (paste, user); the counter itself is a store-side add.
        self.writes.increment_likes(paste_id, 1).await?;

        info!(target: "application::likes", paste_id = %paste_id, "paste liked");
        Ok(())
    }

    pub async fn unlike(&self, paste_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if !self.likes.delete_like(paste_id, user_id).await? {
            return Err(AppError::NotFound);
        }

        self.writes.increment_likes(paste_id, -1).await?;

        info!(target: "application::likes", paste_id = %paste_id, "paste unliked");
        Ok(())
    }

    pub async fn has_liked(&self, paste_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.likes.exists(paste_id, user_id).await?)
    }
}
