use crate::error::{Error, Result};
use crate::index::store::{
    index_exists, read_documents, read_meta, read_token_dict, StoredDoc, TermPos, TokenDict,
    TOKENS_POSTINGS_FILE,
};
use crate::index::types::*;
use crate::utils::{analyze_phrase, delta_decode};
use memmap2::Mmap;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use rustc_hash::FxHashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Read-only view of one committed index generation
pub struct IndexReader {
    index_path: PathBuf,
    pub meta: IndexMeta,
    /// Doc id `n` lives at `documents[n - 1]`
    documents: Vec<StoredDoc>,
    token_dict: TokenDict,
    /// None when the index has no tokens
    token_postings: Option<Mmap>,
}

impl IndexReader {
    /// Open the index stored in `index_path`
    pub fn open(index_path: &Path) -> Result<Self> {
        if !index_exists(index_path) {
            return Err(Error::IndexMissing(index_path.to_path_buf()));
        }

        let meta = read_meta(index_path)?;

        let (documents, token_dict) = rayon::join(
            || read_documents(index_path),
            || read_token_dict(index_path),
        );
        let documents = documents?;
        let token_dict = token_dict?;

        let postings_path = index_path.join(TOKENS_POSTINGS_FILE);
        let token_postings = match File::open(&postings_path) {
            Ok(file) if file.metadata()?.len() > 0 => Some(unsafe { Mmap::map(&file)? }),
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if documents.len() != meta.doc_count as usize {
            log::warn!(
                "{}: meta.json lists {} documents, docs.bin has {} (concurrent commit?)",
                index_path.display(),
                meta.doc_count,
                documents.len()
            );
        }

        Ok(Self {
            index_path: index_path.to_path_buf(),
            meta,
            documents,
            token_dict,
            token_postings,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Stored documents in doc id order
    pub fn documents(&self) -> impl ExactSizeIterator<Item = &IndexedDocument> {
        self.documents.iter().map(|doc| &doc.document)
    }

    /// Get document by ID
    pub fn get_document(&self, doc_id: DocId) -> Option<&IndexedDocument> {
        let idx = (doc_id as usize).checked_sub(1)?;
        self.documents.get(idx).map(|doc| &doc.document)
    }

    /// Number of distinct tokens in the dictionary
    pub fn token_count(&self) -> usize {
        self.token_dict.len()
    }

    /// Documents containing an (already analyzed) token
    pub fn get_token_docs(&self, token: &str) -> RoaringBitmap {
        let (Some(entry), Some(postings)) = (self.token_dict.lookup(token), &self.token_postings)
        else {
            return RoaringBitmap::new();
        };

        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        if end > postings.len() {
            log::warn!("postings for {:?} run past the end of the file", token);
            return RoaringBitmap::new();
        }

        delta_decode(&postings[start..end]).into_iter().collect()
    }

    /// Documents where the words of `phrase` occur at consecutive positions.
    ///
    /// Each hit carries every occurrence of every distinct phrase word in the
    /// document, ordered by start offset, not only the ones forming the phrase.
    pub fn search_phrase(&self, phrase: &str) -> Result<Vec<PhraseHit>> {
        let words = analyze_phrase(phrase);
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut distinct: Vec<&str> = Vec::with_capacity(words.len());
        for word in &words {
            if !distinct.contains(&word.as_str()) {
                distinct.push(word);
            }
        }

        // Rarest word first so the intersection shrinks quickly
        let mut by_freq: Vec<&str> = distinct.clone();
        by_freq.sort_by_key(|w| self.token_dict.lookup(w).map(|e| e.doc_freq).unwrap_or(0));

        let mut candidates: Option<RoaringBitmap> = None;
        for word in by_freq {
            let docs = self.get_token_docs(word);
            let next = match candidates {
                Some(c) => c & docs,
                None => docs,
            };
            if next.is_empty() {
                return Ok(Vec::new());
            }
            candidates = Some(next);
        }

        let candidates: Vec<DocId> = candidates.map(|c| c.iter().collect()).unwrap_or_default();
        log::debug!("{} candidate documents for {:?}", candidates.len(), phrase);

        let hits = candidates
            .par_iter()
            .filter_map(|&doc_id| {
                let doc = self.documents.get((doc_id as usize).checked_sub(1)?)?;
                phrase_hit(doc, &words, &distinct)
            })
            .collect();

        Ok(hits)
    }
}

/// Build a hit if `words` occur consecutively in `doc`
fn phrase_hit(doc: &StoredDoc, words: &[String], distinct: &[&str]) -> Option<PhraseHit> {
    let first = doc.terms.get(&words[0])?;

    let following: Vec<FxHashSet<u32>> = words[1..]
        .iter()
        .map(|w| {
            doc.terms
                .get(w)
                .map(|positions| positions.iter().map(|p| p.position).collect())
                .unwrap_or_default()
        })
        .collect();

    let matched = first.iter().any(|p| {
        following
            .iter()
            .enumerate()
            .all(|(k, set)| set.contains(&(p.position + k as u32 + 1)))
    });
    if !matched {
        return None;
    }

    let mut occurrences: Vec<TermOccurrence> = distinct
        .iter()
        .flat_map(|&word| {
            doc.terms
                .get(word)
                .into_iter()
                .flatten()
                .map(move |pos: &TermPos| TermOccurrence {
                    word: word.to_string(),
                    position: pos.position,
                    start: pos.start as usize,
                    end: pos.end as usize,
                })
        })
        .collect();
    occurrences.sort_by_key(|occ| occ.start);

    Some(PhraseHit {
        document: doc.document.clone(),
        occurrences,
        distinct_words: distinct.len(),
    })
}
