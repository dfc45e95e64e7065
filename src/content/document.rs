//! Document model returned by the content source.

use serde::{Deserialize, Serialize};

use crate::cache::Versioned;

/// A document and its blocks, as served by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Opaque content payload
    #[serde(default)]
    pub content: serde_json::Value,
    /// Last modification (Unix milliseconds), 0 when unknown
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// A nested sub-resource carrying its own modification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub last_modified: i64,
}

/// What the cache holds for a document.
///
/// The plain key `page:{id}` carries the latest known modification time, and
/// the body lives under the version-aware key derived from it. Documents
/// without timestamps keep their body under the plain key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CachedPage {
    Version(i64),
    Body(Document),
}

impl Versioned for Document {
    fn modification_times(&self) -> Box<dyn Iterator<Item = i64> + '_> {
        Box::new(
            std::iter::once(self.last_modified)
                .chain(self.blocks.iter().map(|block| block.last_modified)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::latest_mod_time;

    #[test]
    fn test_block_edit_bumps_document_version() {
        let document = Document {
            id: "abc".to_string(),
            content: serde_json::json!({"title": "Hello"}),
            last_modified: 100,
            blocks: vec![
                Block { id: "b1".to_string(), last_modified: 50 },
                Block { id: "b2".to_string(), last_modified: 250 },
            ],
        };

        assert_eq!(latest_mod_time([&document]), 250);
    }

    #[test]
    fn test_version_marker_is_small() {
        let marker = serde_json::to_string(&CachedPage::Version(1_700_000_000_000)).unwrap();
        assert_eq!(marker, r#"{"version":1700000000000}"#);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let document: Document = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();

        assert_eq!(document.last_modified, 0);
        assert!(document.blocks.is_empty());
        assert!(document.content.is_null());
        assert_eq!(latest_mod_time([&document]), 0);
    }
}
