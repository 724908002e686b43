//! Rating pass: recompute the 1–5 score of every live paste from one
//! consistent snapshot of likes, views, and reader grades.

use tracing::{debug, info};

use crate::application::repos::RepoError;
use crate::domain::rating::{RatingInputs, weighted_rating};

use super::context::PassContext;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RatingOutcome {
    pub recomputed: u64,
}

/// Recompute all ratings and write them back in a single batch, so readers
/// never observe a mix of old- and new-formula values from one run.
pub async fn run_rating_pass(ctx: &PassContext) -> Result<RatingOutcome, RepoError> {
    let bases = ctx.pastes.rating_bases().await?;
    let live = ctx.pastes.list_live().await?;
    if live.is_empty() {
        debug!(target: "application::jobs::rating", "no live pastes to rate");
        return Ok(RatingOutcome::default());
    }

    let mut ratings = Vec::with_capacity(live.len());
    for paste in &live {
        let average_grade = ctx.reviews.average_grade(paste.id).await?;
        let rating = weighted_rating(
            RatingInputs {
                likes: paste.likes_count,
                views: paste.views_count,
                average_grade,
            },
            bases,
        );
        ratings.push((paste.id, rating));
    }

    let recomputed = ctx.writes.write_ratings(&ratings).await?;
    metrics::counter!("ritaglio_ratings_updated_total").increment(recomputed);

    info!(
        target: "application::jobs::rating",
        recomputed,
        max_likes = bases.max_likes,
        max_views = bases.max_views,
        "rating pass finished"
    );
    Ok(RatingOutcome { recomputed })
}
