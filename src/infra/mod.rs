pub mod clients;
pub mod db;
pub mod error;
pub mod events;
pub mod telemetry;
