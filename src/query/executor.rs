use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::types::{PhraseHit, TermOccurrence};
use crate::query::fragment::{locate, Fragments};
use crate::query::highlight::matched_tokens;
use crate::utils::Project;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// A document matching a phrase, with everything needed to locate fragments
#[derive(Debug, Clone)]
pub struct DocumentMatch {
    pub path: PathBuf,
    /// Stored content, or the file as read at search time
    pub text: String,
    /// Highlighted occurrences, by start offset
    pub occurrences: Vec<TermOccurrence>,
    pub distinct_words: usize,
}

impl DocumentMatch {
    /// Matching lines of the document, in document order
    pub fn fragments(&self) -> Fragments<'_> {
        locate(&self.text, &self.occurrences, self.distinct_words)
    }
}

/// Run a phrase query against the project's index
pub fn search(project: &Project, phrase: &str) -> Result<Vec<DocumentMatch>> {
    let reader = IndexReader::open(&project.index_dir()?)?;
    search_reader(&reader, phrase)
}

/// Run a phrase query against an open reader.
///
/// Documents are read and highlighted in parallel; the result is ordered by
/// path. Hits whose file can no longer be read are dropped.
pub fn search_reader(reader: &IndexReader, phrase: &str) -> Result<Vec<DocumentMatch>> {
    let mut hits = reader.search_phrase(phrase)?;
    hits.sort_by(|a, b| a.document.path.cmp(&b.document.path));

    let matches: Vec<DocumentMatch> = hits.par_iter().filter_map(document_match).collect();

    log::info!(
        "{:?}: {} matching documents ({} readable)",
        phrase,
        hits.len(),
        matches.len()
    );
    Ok(matches)
}

fn document_match(hit: &PhraseHit) -> Option<DocumentMatch> {
    let text = match &hit.document.content {
        Some(content) => content.clone(),
        None => read_text(&hit.document.path)?,
    };
    let (occurrences, distinct_words) = matched_tokens(hit);

    Some(DocumentMatch {
        path: hit.document.path.clone(),
        text,
        occurrences,
        distinct_words,
    })
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(
            String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        ),
        Err(e) => {
            log::warn!("cannot read {}: {}", path.display(), e);
            None
        }
    }
}
