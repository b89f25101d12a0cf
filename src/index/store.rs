//! On-disk layout of an index directory and the write-lock.
//!
//! ```text
//! <index dir>/
//!   meta.json         IndexMeta (written last on commit)
//!   docs.bin          document table with per-document term vectors
//!   tokens.dict       sorted token dictionary: token, offset, length, doc_freq
//!   tokens.postings   delta-encoded doc ids, memory-mapped by readers
//!   write.lock        file-locked while a writer is open
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! reader sees either the old or the new version of each file.

use crate::error::{Error, Result};
use crate::index::types::{DocId, IndexMeta, IndexedDocument, Schema};
use crate::utils::{
    analyze, decode_varints, delta_encode, encode_varint, read_bytes, read_u32_le, read_u64_le,
    write_bytes, write_u32_le, write_u64_le, Token,
};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const META_FILE: &str = "meta.json";
pub const DOCS_FILE: &str = "docs.bin";
pub const TOKENS_DICT_FILE: &str = "tokens.dict";
pub const TOKENS_POSTINGS_FILE: &str = "tokens.postings";
pub const LOCK_FILE: &str = "write.lock";

/// Write path of the index service.
///
/// Adding a path that is already stored is a caller error: delete it first.
pub trait IndexService {
    /// Snapshot of every stored document
    fn stored_documents(&self) -> impl Iterator<Item = &IndexedDocument>;

    /// Insert one document, analyzing `content`
    fn add_document(&mut self, path: PathBuf, content: String, mtime: u64) -> Result<()>;

    /// Remove the document stored under `path`; returns whether one existed
    fn delete_by_key(&mut self, path: &Path) -> Result<bool>;

    /// Persist pending changes
    fn commit(&mut self) -> Result<()>;
}

/// One position of a term inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermPos {
    pub position: u32,
    pub start: u32,
    pub end: u32,
}

impl TermPos {
    /// Position of `token`, or `None` when its offsets do not fit in 32 bits
    pub fn from_token(token: &Token) -> Option<Self> {
        Some(Self {
            position: token.position,
            start: u32::try_from(token.start).ok()?,
            end: u32::try_from(token.end).ok()?,
        })
    }
}

/// Term -> positions, ascending
pub type TermVector = BTreeMap<String, Vec<TermPos>>;

/// A document together with its analyzed term vector
#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub document: IndexedDocument,
    pub terms: TermVector,
}

impl StoredDoc {
    /// Analyze `content`, keeping the raw text only if the schema asks for it
    pub fn analyze(path: PathBuf, mtime: u64, content: String, schema: Schema) -> Self {
        let mut terms = TermVector::new();
        for token in analyze(&content) {
            let Some(pos) = TermPos::from_token(&token) else {
                log::warn!("{}: offsets past 4 GiB are not indexed", path.display());
                break;
            };
            terms.entry(token.text).or_default().push(pos);
        }

        Self {
            document: IndexedDocument {
                path,
                mtime,
                content: schema.store_content.then_some(content),
            },
            terms,
        }
    }
}

/// Exclusive writer lock on `write.lock`.
///
/// The lock is an OS file lock, so it goes away with the holding process
/// even if that process dies without dropping the writer. The file itself
/// stays behind and is reused by the next writer.
#[derive(Debug)]
pub struct WriteLock {
    file: File,
}

impl WriteLock {
    /// Take the lock or fail immediately if another writer holds it
    pub fn acquire(index_path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(index_path.join(LOCK_FILE))?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            let contended = fs2::lock_contended_error();
            if e.kind() == io::ErrorKind::WouldBlock
                || e.raw_os_error() == contended.raw_os_error()
            {
                return Err(Error::IndexLocked(index_path.to_path_buf()));
            }
            return Err(e.into());
        }

        // Holder pid, for humans inspecting a stuck lock
        if file.set_len(0).is_ok() {
            let _ = write!(file, "{}", std::process::id());
        }
        Ok(Self { file })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Whether `index_path` holds a committed index
pub fn index_exists(index_path: &Path) -> bool {
    index_path.join(META_FILE).exists()
}

/// Write `path` through a temporary sibling and rename it into place
fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = BufWriter::new(File::create(&tmp)?);
        write(&mut file)?;
        file.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn corrupt(file: &str, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Corrupt(format!("{} is truncated", file))
    } else {
        Error::Io(e)
    }
}

/// Read metadata
pub fn read_meta(index_path: &Path) -> Result<IndexMeta> {
    let meta_path = index_path.join(META_FILE);
    if !meta_path.exists() {
        return Err(Error::IndexMissing(index_path.to_path_buf()));
    }

    let file = File::open(&meta_path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write metadata
pub fn write_meta(index_path: &Path, meta: &IndexMeta) -> Result<()> {
    let tmp = index_path.join(format!("{}.tmp", META_FILE));
    fs::write(&tmp, serde_json::to_vec_pretty(meta)?)?;
    fs::rename(&tmp, index_path.join(META_FILE))?;
    Ok(())
}

/// Write the document table
pub fn write_documents<'a, I>(index_path: &Path, docs: I) -> Result<()>
where
    I: ExactSizeIterator<Item = &'a StoredDoc>,
{
    write_atomic(&index_path.join(DOCS_FILE), |file| {
        write_u32_le(file, docs.len() as u32)?;

        for doc in docs {
            write_bytes(file, doc.document.path.to_string_lossy().as_bytes())?;
            write_u64_le(file, doc.document.mtime)?;

            match &doc.document.content {
                Some(content) => {
                    write_u32_le(file, 1)?;
                    write_bytes(file, content.as_bytes())?;
                }
                None => write_u32_le(file, 0)?,
            }

            write_u32_le(file, doc.terms.len() as u32)?;
            for (term, positions) in &doc.terms {
                write_bytes(file, term.as_bytes())?;
                write_bytes(file, &encode_positions(positions))?;
            }
        }

        Ok(())
    })
}

/// Read the document table, in doc id order
pub fn read_documents(index_path: &Path) -> Result<Vec<StoredDoc>> {
    let docs_path = index_path.join(DOCS_FILE);
    let mut file = BufReader::new(File::open(&docs_path)?);
    read_documents_from(&mut file).map_err(|e| corrupt(DOCS_FILE, e))
}

fn read_documents_from<R: io::Read>(file: &mut R) -> io::Result<Vec<StoredDoc>> {
    let count = read_u32_le(file)? as usize;
    let mut documents = Vec::with_capacity(count.min(1 << 16));

    for _ in 0..count {
        let path = PathBuf::from(String::from_utf8_lossy(&read_bytes(file)?).as_ref());
        let mtime = read_u64_le(file)?;

        let content = match read_u32_le(file)? {
            0 => None,
            _ => Some(String::from_utf8_lossy(&read_bytes(file)?).into_owned()),
        };

        let term_count = read_u32_le(file)? as usize;
        let mut terms = TermVector::new();
        for _ in 0..term_count {
            let term = String::from_utf8_lossy(&read_bytes(file)?).into_owned();
            let positions = decode_positions(&read_bytes(file)?);
            terms.insert(term, positions);
        }

        documents.push(StoredDoc {
            document: IndexedDocument {
                path,
                mtime,
                content,
            },
            terms,
        });
    }

    Ok(documents)
}

/// Encode positions as (position delta, start delta, length) varint triples
fn encode_positions(positions: &[TermPos]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(positions.len() * 3);
    let mut prev = TermPos {
        position: 0,
        start: 0,
        end: 0,
    };

    for pos in positions {
        encode_varint(pos.position - prev.position, &mut buf);
        encode_varint(pos.start - prev.start, &mut buf);
        encode_varint(pos.end - pos.start, &mut buf);
        prev = *pos;
    }

    buf
}

fn decode_positions(buf: &[u8]) -> Vec<TermPos> {
    let mut position = 0u32;
    let mut start = 0u32;

    decode_varints(buf)
        .chunks_exact(3)
        .map(|triple| {
            position = position.saturating_add(triple[0]);
            start = start.saturating_add(triple[1]);
            TermPos {
                position,
                start,
                end: start.saturating_add(triple[2]),
            }
        })
        .collect()
}

/// Write the token dictionary and postings for documents numbered from 1
pub fn write_token_index(index_path: &Path, docs: &[&StoredDoc]) -> Result<()> {
    let mut postings: BTreeMap<&str, Vec<DocId>> = BTreeMap::new();
    for (idx, doc) in docs.iter().enumerate() {
        let doc_id = idx as DocId + 1;
        for term in doc.terms.keys() {
            postings.entry(term.as_str()).or_default().push(doc_id);
        }
    }

    let mut encoded_postings = Vec::new();
    write_atomic(&index_path.join(TOKENS_DICT_FILE), |dict| {
        write_u32_le(dict, postings.len() as u32)?;

        for (token, doc_ids) in &postings {
            // Doc ids are pushed in ascending order, no sort needed
            let mut encoded = Vec::new();
            delta_encode(doc_ids, &mut encoded);

            write_bytes(dict, token.as_bytes())?;
            write_u64_le(dict, encoded_postings.len() as u64)?;
            write_u32_le(dict, encoded.len() as u32)?;
            write_u32_le(dict, doc_ids.len() as u32)?;

            encoded_postings.extend_from_slice(&encoded);
        }

        Ok(())
    })?;

    write_atomic(&index_path.join(TOKENS_POSTINGS_FILE), |file| {
        file.write_all(&encoded_postings)
    })
}

/// Token dictionary entry
pub struct TokenDictEntry {
    pub token: String,
    pub offset: u64,
    pub length: u32,
    pub doc_freq: u32,
}

/// Token dictionary, sorted by token
pub struct TokenDict {
    entries: Vec<TokenDictEntry>,
}

impl TokenDict {
    pub fn lookup(&self, token: &str) -> Option<&TokenDictEntry> {
        self.entries
            .binary_search_by(|e| e.token.as_str().cmp(token))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read token dictionary
pub fn read_token_dict(index_path: &Path) -> Result<TokenDict> {
    let dict_path = index_path.join(TOKENS_DICT_FILE);

    if !dict_path.exists() {
        return Ok(TokenDict {
            entries: Vec::new(),
        });
    }

    let mut file = BufReader::new(File::open(&dict_path)?);
    read_token_dict_from(&mut file).map_err(|e| corrupt(TOKENS_DICT_FILE, e))
}

fn read_token_dict_from<R: io::Read>(file: &mut R) -> io::Result<TokenDict> {
    let count = read_u32_le(file)? as usize;
    let mut entries = Vec::with_capacity(count.min(1 << 16));

    for _ in 0..count {
        let token = String::from_utf8_lossy(&read_bytes(file)?).into_owned();
        let offset = read_u64_le(file)?;
        let length = read_u32_le(file)?;
        let doc_freq = read_u32_le(file)?;

        entries.push(TokenDictEntry {
            token,
            offset,
            length,
            doc_freq,
        });
    }

    // Written from a BTreeMap, already sorted
    Ok(TokenDict { entries })
}
