//! Ritaglio: the content lifecycle and popularity engine of a self-hosted
//! paste service.
//!
//! The crate keeps a mutable, expiring, softly-deleted paste record
//! consistent with a read-through response cache, a deduplicated view
//! counter, a derived popularity rating, and an at-most-once notification
//! ledger — while request traffic reads and mutates the same rows.
//!
//! Layout:
//! - [`domain`] — entities, lifecycle state machine, the rating formula;
//! - [`application`] — repository traits, services, and the four background
//!   passes with their scheduler;
//! - [`cache`] — TTL cache and view-ledger contracts plus in-memory stores;
//! - [`infra`] — Postgres repositories, collaborator clients, the outbound
//!   event channel, telemetry;
//! - [`config`] — layered settings (file → environment → CLI).

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
