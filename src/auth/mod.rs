//! Authentication for the storage service API.

mod middleware;
mod shared_key;

pub use middleware::*;
pub use shared_key::*;
