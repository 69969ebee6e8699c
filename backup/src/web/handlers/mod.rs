//! HTTP request handlers for the backup API.
//!
//! - `backup` - archive download
//! - `common` - response and error types shared by the handlers
//! - `health` - liveness probe
//! - `restore` - SQL upload and replay

pub mod backup;
pub mod common;
pub mod health;
pub mod restore;

pub use backup::*;
pub use health::*;
pub use restore::*;
