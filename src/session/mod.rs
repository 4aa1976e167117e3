//! Bounded per-session transcripts and outbound turn composition.
//!
//! Transcripts live in memory for the lifetime of the process. Each append adds
//! one user/model exchange and trims the oldest exchanges beyond the cap.

pub mod compose;
pub mod store;
pub mod types;

pub use compose::build_contents;
pub use store::{DEFAULT_MAX_TURNS, InMemorySessionStore, SessionStore};
pub use types::*;

/// Create an in-memory session store with the given transcript cap.
pub fn create_session_store(max_turns: usize) -> anyhow::Result<Box<dyn SessionStore>> {
    Ok(Box::new(InMemorySessionStore::with_max_turns(max_turns)?))
}
