//! Item identifiers and stored records.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vector::core::embedding::Embedding;

/// Stable identifier of a recommendable item, assigned upstream.
///
/// Integer ids from a metadata provider are stored in their decimal form, so
/// `ItemId::from(603u64) == ItemId::from("603")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an id from anything string-like.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the id as an integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<&String> for ItemId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for ItemId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

/// One stored item: id, embedding and the optional text that was embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Item identifier.
    pub id: ItemId,
    /// The item's embedding.
    pub embedding: Embedding,
    /// Text that produced the embedding, kept for display.
    pub document: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_integer_and_string_ids_agree() {
        assert_eq!(ItemId::from(603u64), ItemId::from("603"));
        assert_eq!(ItemId::from(-1i32).as_str(), "-1");
        assert_eq!(ItemId::from("603").as_u64(), Some(603));
        assert_eq!(ItemId::from("tt0088763").as_u64(), None);
    }

    #[test]
    fn test_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(ItemId::from("105"), 1usize);
        assert_eq!(map.get("105"), Some(&1));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&ItemId::from(11u64)).unwrap();
        assert_eq!(json, "\"11\"");
    }
}
