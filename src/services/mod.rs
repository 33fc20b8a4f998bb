//! Collaborator services driven by the confirmation flow

mod store;
mod syncer;

pub use store::*;
pub use syncer::*;
