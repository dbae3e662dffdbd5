//! Local Store Layer
//!
//! Durable on-device persistence for cards, cached remote-file metadata, and
//! the sync queue, backed by libsql:
//!
//! - [`DatabaseService`] - connection management and schema
//! - [`CardStore`] - the persistence trait the sync services depend on
//! - [`TursoStore`] - the libsql implementation (retry + metrics wrapped)
//! - [`UnavailableStore`] - null object for contexts without local storage

mod card_store;
mod database;
mod error;
mod turso_store;

pub use card_store::{CardStore, UnavailableStore};
pub use database::DatabaseService;
pub use error::StoreError;
pub use turso_store::TursoStore;
