//! Reader reviews: the grades feeding the rating pass.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::{
    error::AppError,
    repos::{PastesRepo, ReviewsRepo},
};
use crate::domain::entities::ReviewRecord;
use crate::domain::rating::{MAX_RATING, MIN_RATING};

pub struct ReviewService {
    reviews: Arc<dyn ReviewsRepo>,
    pastes: Arc<dyn PastesRepo>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewsRepo>, pastes: Arc<dyn PastesRepo>) -> Self {
        Self { reviews, pastes }
    }

    pub async fn add_review(
        &self,
        paste_id: Uuid,
        reviewer_id: Uuid,
        grade: i16,
        now: OffsetDateTime,
    ) -> Result<ReviewRecord, AppError> {
        if !(MIN_RATING..=MAX_RATING).contains(&grade) {
            return Err(AppError::validation(format!(
                "grade must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }

        if self.pastes.find_live_by_id(paste_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let review = self
            .reviews
            .insert_review(paste_id, reviewer_id, grade, now)
            .await?;

        info!(
            target: "application::reviews",
            paste_id = %paste_id,
            review_id = %review.id,
            grade,
            "review added"
        );
        Ok(review)
    }

    pub async fn list_for_paste(&self, paste_id: Uuid) -> Result<Vec<ReviewRecord>, AppError> {
        if self.pastes.find_live_by_id(paste_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        Ok(self.reviews.list_for_paste(paste_id).await?)
    }

    pub async fn delete_review(&self, review_id: Uuid) -> Result<(), AppError> {
        if self.reviews.delete_review(review_id).await? {
            info!(target: "application::reviews", review_id = %review_id, "review deleted");
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }
}
