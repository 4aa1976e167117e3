//! Outbound turn list composition.

use super::types::{Part, Turn};

/// Prior turns in order, followed by one new user turn built from `user_parts`.
///
/// The store is not touched; the exchange is appended only after the model
/// answers.
pub fn build_contents<'a>(
    history: impl IntoIterator<Item = &'a Turn>,
    user_parts: Vec<Part>,
) -> Vec<Turn> {
    let mut contents: Vec<Turn> = history.into_iter().cloned().collect();
    contents.push(Turn::user(user_parts));
    contents
}
