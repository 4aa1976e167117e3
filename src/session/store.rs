//! Session transcript storage.
//!
//! A [`SessionStore`] maps a session identifier to a bounded [`Transcript`].
//! The in-memory backend keeps everything for the lifetime of the process.

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::types::{Role, Transcript, Turn};

/// Default transcript cap: 10 user/model exchanges.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Keyed storage for per-session transcripts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Snapshot of the transcript for `session_id`, created empty if absent.
    async fn get(&self, session_id: &str) -> Result<Transcript>;

    /// Append a user/model pair and trim the oldest pairs past the cap.
    /// Returns the resulting transcript length.
    async fn append(&self, session_id: &str, user: Turn, model: Turn) -> Result<usize>;

    /// Reset the transcript for `session_id` to empty.
    async fn clear(&self, session_id: &str) -> Result<()>;

    /// The name of this session store implementation.
    fn name(&self) -> &str;
}

/// An in-memory session store backed by a mutex-protected hash map.
///
/// The lock is held only for the clone, append or clear itself, never across
/// a model call.
pub struct InMemorySessionStore {
    transcripts: Mutex<HashMap<String, Transcript>>,
    max_turns: usize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            transcripts: Mutex::new(HashMap::new()),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Store with a custom cap. The cap must be even and at least one pair.
    pub fn with_max_turns(max_turns: usize) -> Result<Self> {
        validate_max_turns(max_turns)?;
        Ok(Self {
            transcripts: Mutex::new(HashMap::new()),
            max_turns,
        })
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_max_turns(max_turns: usize) -> Result<()> {
    if max_turns < 2 || max_turns % 2 != 0 {
        bail!("session max_turns must be an even number >= 2 (got {max_turns})");
    }
    Ok(())
}

/// Push the pair, then drop whole exchanges from the front until the cap holds.
fn push_exchange(transcript: &mut Transcript, user: Turn, model: Turn, max_turns: usize) {
    debug_assert_eq!(user.role, Role::User);
    debug_assert_eq!(model.role, Role::Model);

    transcript.push_back(user);
    transcript.push_back(model);
    while transcript.len() > max_turns {
        transcript.drain(..2);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Transcript> {
        let mut transcripts = self.transcripts.lock();
        Ok(transcripts
            .entry(session_id.to_string())
            .or_default()
            .clone())
    }

    async fn append(&self, session_id: &str, user: Turn, model: Turn) -> Result<usize> {
        let mut transcripts = self.transcripts.lock();
        let transcript = transcripts.entry(session_id.to_string()).or_default();
        push_exchange(transcript, user, model, self.max_turns);
        Ok(transcript.len())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let mut transcripts = self.transcripts.lock();
        transcripts.insert(session_id.to_string(), Transcript::new());
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
