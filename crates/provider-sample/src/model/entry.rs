use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored key/value pair, as held by the store actor.
///
/// Serializes to exactly the output shape of the `xyz:index:KeyValue`
/// resource, so the resource implementation can hand it back as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Starts at 1 and increases with every in-place update.
    pub revision: u64,
}

/// Payload for writing an entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryWrite {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(write: EntryWrite) -> Self {
        Self {
            key: write.key,
            value: write.value,
            tags: write.tags,
            revision: 1,
        }
    }

    /// Overwrites the value and tags, bumping the revision.
    pub fn apply(&mut self, write: EntryWrite) {
        self.value = write.value;
        self.tags = write.tags;
        self.revision += 1;
    }
}
