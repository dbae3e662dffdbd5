//! Cardbox Core Sync Engine
//!
//! Dual-persistence synchronization for note-card documents: every card
//! lives in a durable on-device store and, best-effort, in a single-file
//! cloud backend. The engine decides per read and write which side to serve
//! or update, queues remote mutations while offline, and reconciles
//! divergence in the background.
//!
//! # Architecture
//!
//! - **Local first**: a save is durable the moment the local write lands;
//!   remote durability is eventual, never blocking
//! - **Typed failures**: every layer surfaces a classified error; transient
//!   classes retry with exponential backoff, permanent ones surface at once
//! - **Whole-document resolution**: divergence resolves by modification
//!   time, newer side wins, with a tolerance band for clock skew
//!
//! # Modules
//!
//! - [`models`] - data structures (Card, RemoteFileMeta, SyncTask)
//! - [`db`] - local store (libsql) behind the [`db::CardStore`] trait
//! - [`remote`] - cloud backend client behind the [`remote::RemoteStore`] trait
//! - [`services`] - orchestrator, offline queue, reconciler
//! - [`utils`] - the card markdown format

pub mod config;
pub mod db;
pub mod metrics;
pub mod models;
pub mod remote;
pub mod retry;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::SyncConfig;
pub use models::*;
pub use services::*;
