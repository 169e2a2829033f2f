//! XML serialization and deserialization of service properties documents.

pub mod deserialize;
pub mod serialize;

pub use deserialize::*;
pub use serialize::*;
