//! Data models for storage service properties.

mod includes;
mod service;
mod variant;

pub use includes::*;
pub use service::*;
pub use variant::*;
