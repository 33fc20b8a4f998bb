//! Import Module
//!
//! Seed phrase entry: per-word slots, the pure import state machine, the
//! async session that drives it, and the confirmation flow.

mod confirm;
mod session;
mod slot;
mod state;

pub use confirm::*;
pub use session::*;
pub use slot::*;
pub use state::*;
