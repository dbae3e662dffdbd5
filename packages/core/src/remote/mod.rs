//! Remote Store Layer
//!
//! HTTP client for the single-file cloud backend:
//!
//! - [`RemoteStore`] - the client contract the sync services depend on
//! - [`HttpRemoteStore`] - reqwest implementation (auth, timeout, retry,
//!   classified errors)
//! - [`RemoteError`] - the remote failure taxonomy
//! - `types` - validated wire shapes

mod client;
mod error;
pub mod types;

pub use client::{HttpRemoteStore, RemoteStore};
pub use error::RemoteError;
pub use types::UploadTarget;
