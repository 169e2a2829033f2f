//! Storage layer for service properties.

mod properties;

pub use properties::*;
