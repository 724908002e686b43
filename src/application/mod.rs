pub mod error;
pub mod jobs;
pub mod likes;
pub mod notify;
pub mod outbound;
pub mod pastes;
pub mod repos;
pub mod reviews;
pub mod views;
