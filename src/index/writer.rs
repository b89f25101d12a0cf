use crate::error::{Error, Result};
use crate::index::store::{
    index_exists, read_documents, read_meta, write_documents, write_meta, write_token_index,
    IndexService, StoredDoc, WriteLock,
};
use crate::index::types::{unix_now, IndexMeta, IndexedDocument, Schema};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default flush threshold when no limit is configured
const DEFAULT_RAM_LIMIT: usize = 256 * 1024 * 1024;

/// Single writer over one index directory.
///
/// Holds the directory's write lock for its whole lifetime. Changes are kept
/// in memory and persisted on [`commit`](IndexService::commit), or earlier
/// whenever the text added since the last commit exceeds the RAM limit.
pub struct IndexWriter {
    index_path: PathBuf,
    meta: IndexMeta,
    docs: BTreeMap<PathBuf, StoredDoc>,
    /// Bytes of text added since the last commit
    pending_bytes: usize,
    ram_limit: usize,
    dirty: bool,
    _lock: WriteLock,
}

impl IndexWriter {
    /// Start a new, empty index, replacing whatever the directory held
    pub fn create(index_path: &Path, project_root: &Path, schema: Schema) -> Result<Self> {
        fs::create_dir_all(index_path)?;
        let lock = WriteLock::acquire(index_path)?;

        let mut writer = Self {
            index_path: index_path.to_path_buf(),
            meta: IndexMeta::new(project_root.to_path_buf(), schema),
            docs: BTreeMap::new(),
            pending_bytes: 0,
            ram_limit: DEFAULT_RAM_LIMIT,
            dirty: true,
            _lock: lock,
        };
        writer.commit()?;

        Ok(writer)
    }

    /// Reopen an existing index for writing
    pub fn open(index_path: &Path) -> Result<Self> {
        if !index_exists(index_path) {
            return Err(Error::IndexMissing(index_path.to_path_buf()));
        }

        let lock = WriteLock::acquire(index_path)?;
        let meta = read_meta(index_path)?;
        let docs = read_documents(index_path)?
            .into_iter()
            .map(|doc| (doc.document.path.clone(), doc))
            .collect();

        Ok(Self {
            index_path: index_path.to_path_buf(),
            meta,
            docs,
            pending_bytes: 0,
            ram_limit: DEFAULT_RAM_LIMIT,
            dirty: false,
            _lock: lock,
        })
    }

    /// Flush automatically once this many bytes of text are pending
    pub fn with_ram_limit(mut self, bytes: usize) -> Self {
        self.ram_limit = bytes.max(1);
        self
    }

    pub fn schema(&self) -> Schema {
        self.meta.schema
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Get current document count
    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    pub fn get(&self, path: &Path) -> Option<&IndexedDocument> {
        self.docs.get(path).map(|doc| &doc.document)
    }

    /// Whether uncommitted changes exist
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl IndexService for IndexWriter {
    fn stored_documents(&self) -> impl Iterator<Item = &IndexedDocument> {
        self.docs.values().map(|doc| &doc.document)
    }

    fn add_document(&mut self, path: PathBuf, content: String, mtime: u64) -> Result<()> {
        if self.docs.contains_key(&path) {
            log::warn!(
                "{} is already indexed; delete it before adding, keeping the stored copy",
                path.display()
            );
            return Ok(());
        }

        self.pending_bytes += content.len();
        let doc = StoredDoc::analyze(path.clone(), mtime, content, self.meta.schema);
        self.docs.insert(path, doc);
        self.dirty = true;

        if self.pending_bytes >= self.ram_limit {
            log::debug!(
                "flushing {} pending bytes (limit {})",
                self.pending_bytes,
                self.ram_limit
            );
            self.commit()?;
        }

        Ok(())
    }

    fn delete_by_key(&mut self, path: &Path) -> Result<bool> {
        let removed = self.docs.remove(path).is_some();
        self.dirty |= removed;
        Ok(removed)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let docs: Vec<&StoredDoc> = self.docs.values().collect();
        write_documents(&self.index_path, docs.iter().copied())?;
        write_token_index(&self.index_path, &docs)?;

        self.meta.doc_count = docs.len() as u32;
        self.meta.generation += 1;
        self.meta.updated_at = unix_now();
        // Readers check meta.json first, so it goes last
        write_meta(&self.index_path, &self.meta)?;

        self.pending_bytes = 0;
        self.dirty = false;
        Ok(())
    }
}
