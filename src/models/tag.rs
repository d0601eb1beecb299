//! Tag model
//!
//! Tags are shared between articles: a name is created on first use and
//! reused afterwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag name (unique)
    pub name: String,
}

impl Tag {
    /// Create a new Tag. The ID is assigned by the database.
    pub fn new(name: String) -> Self {
        Self { id: 0, name }
    }
}

/// Normalize a client-supplied tag list: trim names, drop empty ones and
/// remove duplicates while preserving first-seen order.
pub fn normalize_tag_list<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = Vec::new();
    for tag in tags {
        let name = tag.as_ref().trim();
        if !name.is_empty() && !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}
