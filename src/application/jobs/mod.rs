mod context;
mod expire;
mod popularity;
mod purge;
mod rating;
mod scheduler;

pub use context::{EngineTuning, PassContext};
pub use expire::{ExpireOutcome, run_expire_pass};
pub use popularity::{PopularityOutcome, run_popularity_pass};
pub use purge::{PurgeOutcome, run_purge_pass};
pub use rating::{RatingOutcome, run_rating_pass};
pub use scheduler::{Cadence, PassHandle, spawn_pass};
