use crate::index::types::{PhraseHit, TermOccurrence};

/// Prepare a hit's occurrences for [`locate`](super::fragment::locate).
///
/// Occurrences are ordered by start offset; when several share a start only
/// the longest is kept. Returns them with the number of distinct phrase words.
pub fn matched_tokens(hit: &PhraseHit) -> (Vec<TermOccurrence>, usize) {
    let mut tokens = hit.occurrences.clone();
    tokens.sort_by_key(|t| t.start);

    let mut kept: Vec<TermOccurrence> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match kept.last_mut() {
            Some(last) if last.start == token.start => {
                if token.end > last.end {
                    *last = token;
                }
            }
            _ => kept.push(token),
        }
    }

    (kept, hit.distinct_words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::IndexedDocument;

    fn occ(word: &str, start: usize, end: usize) -> TermOccurrence {
        TermOccurrence {
            word: word.into(),
            position: 0,
            start,
            end,
        }
    }

    #[test]
    fn test_sorted_and_longest_kept() {
        let hit = PhraseHit {
            document: IndexedDocument {
                path: "/p/a".into(),
                mtime: 0,
                content: None,
            },
            occurrences: vec![occ("b", 10, 11), occ("ab", 0, 2), occ("a", 0, 1), occ("c", 4, 5)],
            distinct_words: 3,
        };

        let (tokens, distinct) = matched_tokens(&hit);
        let spans: Vec<_> = tokens.iter().map(|t| (t.word.as_str(), t.start)).collect();
        assert_eq!(spans, vec![("ab", 0), ("c", 4), ("b", 10)]);
        assert_eq!(distinct, 3);
    }
}
