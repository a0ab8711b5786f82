//! Data models for the application
//!
//! `upload` holds the new-upload form and the validated request, `asset` the asset
//! records returned by the plugin API, and `language` the auto-caption language table.

mod asset;
mod language;
mod upload;

pub use asset::*;
pub use language::*;
pub use upload::*;
