use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

/// Identifier of a document within one committed generation of the index.
/// Reassigned on every commit; the path is the stable key.
pub type DocId = u32;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// A document as stored in the index, keyed by `path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub path: PathBuf,
    /// Modification time in nanoseconds since the Unix epoch
    pub mtime: u64,
    /// Raw text, present only when the schema stores content
    pub content: Option<String>,
}

/// One occurrence of one phrase word in one document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermOccurrence {
    pub word: String,
    pub position: u32,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

/// Fields the index keeps for each document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schema {
    pub store_content: bool,
}

/// Index metadata stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub project_root: PathBuf,
    pub schema: Schema,
    pub doc_count: u32,
    /// Incremented on every commit
    pub generation: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl IndexMeta {
    pub fn new(project_root: PathBuf, schema: Schema) -> Self {
        let now = unix_now();
        Self {
            version: FORMAT_VERSION,
            project_root,
            schema,
            doc_count: 0,
            generation: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A document matched by a phrase query
#[derive(Debug, Clone)]
pub struct PhraseHit {
    pub document: IndexedDocument,
    /// Every occurrence of every phrase word in the document, by start offset
    pub occurrences: Vec<TermOccurrence>,
    /// Number of distinct words in the analyzed phrase
    pub distinct_words: usize,
}

/// Modification time of a file in nanoseconds, 0 when unavailable
pub fn mtime_of(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64)
        .unwrap_or(0)
}

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
