//! Line-bounded snippets around phrase matches.
//!
//! Fragments are built from the occurrence offsets the index already holds;
//! the document is never re-tokenized. A fragment is one line of the document
//! that contains every distinct word of the phrase. Word order inside the line
//! is not checked.

use crate::index::types::TermOccurrence;
use memchr::{memchr2, memrchr};
use rustc_hash::FxHashSet;

/// One matching line of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Whole document text; the fragment is `text[start..end]`
    pub text: &'a str,
    /// Byte offset of the line start
    pub start: usize,
    /// Byte offset of the line end, before its line break
    pub end: usize,
    /// Occurrences inside the line, by start offset
    pub terms: &'a [TermOccurrence],
}

impl<'a> Fragment<'a> {
    /// Text of the line
    pub fn as_str(&self) -> &'a str {
        &self.text[self.start..self.end]
    }

    /// 1-based line number of the fragment within the document
    pub fn line_number(&self) -> usize {
        memchr::memchr_iter(b'\n', &self.text.as_bytes()[..self.start]).count() + 1
    }

    /// Term spans relative to the fragment start.
    ///
    /// Occurrences that do not fit the current text are left out.
    pub fn term_spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.terms
            .iter()
            .filter(|t| fits(self.text, t))
            .map(move |t| (t.start - self.start, t.end - self.start))
    }
}

/// Lazy iterator over the fragments of one document
pub struct Fragments<'a> {
    text: &'a str,
    occurrences: &'a [TermOccurrence],
    distinct_words: usize,
    next: usize,
}

/// Find every line of `text` holding all `distinct_words` phrase words.
///
/// `occurrences` must be sorted by start offset. Fragments come out in
/// document order, each line at most once.
pub fn locate<'a>(
    text: &'a str,
    occurrences: &'a [TermOccurrence],
    distinct_words: usize,
) -> Fragments<'a> {
    debug_assert!(
        occurrences.windows(2).all(|w| w[0].start <= w[1].start),
        "occurrences must be sorted by start offset"
    );

    Fragments {
        text,
        occurrences,
        distinct_words,
        next: 0,
    }
}

/// Whether `occ` is a non-empty span of `text` on char boundaries.
///
/// Offsets come from the index, so they can be stale when the file changed
/// after it was indexed.
fn fits(text: &str, occ: &TermOccurrence) -> bool {
    occ.start < occ.end
        && occ.end <= text.len()
        && text.is_char_boundary(occ.start)
        && text.is_char_boundary(occ.end)
}

impl<'a> Fragments<'a> {
    fn line_bounds(&self, occ: &TermOccurrence) -> Option<(usize, usize)> {
        if !fits(self.text, occ) {
            return None;
        }

        let bytes = self.text.as_bytes();

        let left = memrchr(b'\n', &bytes[..occ.start]).map_or(0, |nl| nl + 1);
        let right = memchr2(b'\n', b'\r', &bytes[occ.end..]).map_or(bytes.len(), |p| occ.end + p);
        Some((left, right))
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Fragment<'a>> {
        if self.distinct_words == 0 {
            return None;
        }

        let occurrences = self.occurrences;
        while self.next < occurrences.len() {
            let i = self.next;
            let Some((left, right)) = self.line_bounds(&occurrences[i]) else {
                self.next += 1;
                continue;
            };

            let mut j = i;
            while j + 1 < occurrences.len() && occurrences[j + 1].end <= right {
                j += 1;
            }
            // Absorbed occurrences are never window starts
            self.next = j + 1;

            let group = &occurrences[i..=j];
            let valid = || group.iter().filter(|t| fits(self.text, t));
            if valid().count() < self.distinct_words {
                continue;
            }

            let words: FxHashSet<&str> = valid().map(|t| t.word.as_str()).collect();
            if words.len() != self.distinct_words {
                continue;
            }

            return Some(Fragment {
                text: self.text,
                start: left,
                end: right,
                terms: group,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::analyze;

    /// Occurrences of `words` in `text`, as the index would report them
    fn occurrences(text: &str, words: &[&str]) -> Vec<TermOccurrence> {
        analyze(text)
            .into_iter()
            .filter(|t| words.contains(&t.text.as_str()))
            .map(|t| TermOccurrence {
                word: t.text,
                position: t.position,
                start: t.start,
                end: t.end,
            })
            .collect()
    }

    fn lines<'a>(text: &'a str, occ: &'a [TermOccurrence], distinct: usize) -> Vec<&'a str> {
        locate(text, occ, distinct).map(|f| f.as_str()).collect()
    }

    #[test]
    fn test_single_line_holds_phrase() {
        let text = "foo bar\nhello world foo\n";
        let occ = occurrences(text, &["world", "foo"]);
        assert_eq!(occ.len(), 3);

        let fragments: Vec<_> = locate(text, &occ, 2).collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_str(), "hello world foo");
        assert_eq!((fragments[0].start, fragments[0].end), (8, 23));
        assert_eq!(fragments[0].terms.len(), 2);
        assert_eq!(fragments[0].line_number(), 2);
    }

    #[test]
    fn test_repeated_words_make_one_fragment() {
        let text = "a b a b\n";
        let occ = occurrences(text, &["a", "b"]);

        let fragments: Vec<_> = locate(text, &occ, 2).collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_str(), "a b a b");
        assert_eq!(fragments[0].terms.len(), 4);
    }

    #[test]
    fn test_word_order_is_not_checked() {
        // Only co-occurrence within a line matters, so the reversed line
        // matches as well
        let text = "alpha beta\nbeta alpha\nalpha\n";
        let occ = occurrences(text, &["alpha", "beta"]);
        assert_eq!(lines(text, &occ, 2), vec!["alpha beta", "beta alpha"]);
    }

    #[test]
    fn test_fragments_are_line_bounded_and_ordered() {
        let text = "x\r\nred green\r\nnothing here\ngreen red blue\nred";
        let occ = occurrences(text, &["red", "green"]);

        let fragments: Vec<_> = locate(text, &occ, 2).collect();
        assert_eq!(fragments.len(), 2);

        let mut last_start = 0;
        for fragment in &fragments {
            let line = fragment.as_str();
            assert!(!line.contains('\n') && !line.contains('\r'));
            assert!(fragment.start == 0 || text.as_bytes()[fragment.start - 1] == b'\n');
            assert!(fragment.start >= last_start);
            last_start = fragment.start;

            let words: FxHashSet<&str> = fragment.terms.iter().map(|t| t.word.as_str()).collect();
            assert_eq!(words.len(), 2);
            for (start, end) in fragment.term_spans() {
                assert!(end <= line.len() && start < end);
            }
        }
        assert_eq!(fragments[0].as_str(), "red green");
        assert_eq!(fragments[1].as_str(), "green red blue");
    }

    #[test]
    fn test_last_line_without_newline() {
        let text = "one\ntwo three";
        let occ = occurrences(text, &["two", "three"]);
        assert_eq!(lines(text, &occ, 2), vec!["two three"]);
    }

    #[test]
    fn test_words_on_separate_lines() {
        let text = "hello\nworld\n";
        let occ = occurrences(text, &["hello", "world"]);
        assert!(lines(text, &occ, 2).is_empty());
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(locate("", &[], 1).count(), 0);
        assert_eq!(locate("text", &[], 1).count(), 0);

        let occ = occurrences("text", &["text"]);
        assert_eq!(locate("text", &occ, 0).count(), 0);
        assert_eq!(lines("text", &occ, 1), vec!["text"]);
    }

    #[test]
    fn test_out_of_range_occurrence_is_ignored() {
        // Offsets from an index built before the file shrank
        let occ = vec![TermOccurrence {
            word: "gone".into(),
            position: 0,
            start: 10,
            end: 14,
        }];
        assert_eq!(locate("short", &occ, 1).count(), 0);
    }

    #[test]
    fn test_stale_offsets_inside_characters_are_ignored() {
        // Indexed as "a foo bar", then rewritten without re-indexing
        let text = "aé€ bar x";
        let occ = vec![
            TermOccurrence { word: "foo".into(), position: 1, start: 2, end: 5 },
            TermOccurrence { word: "bar".into(), position: 2, start: 6, end: 9 },
        ];
        assert_eq!(locate(text, &occ, 2).count(), 0);

        // A single-word query still matches; the broken span is not reported
        let occ = vec![
            TermOccurrence { word: "bar".into(), position: 1, start: 2, end: 5 },
            TermOccurrence { word: "bar".into(), position: 2, start: 6, end: 9 },
        ];
        let fragments: Vec<_> = locate(text, &occ, 1).collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_str(), text);
        assert_eq!(fragments[0].term_spans().collect::<Vec<_>>(), vec![(6, 9)]);
    }

    #[test]
    fn test_lazy_iteration() {
        let text = "k v\nk v\nk v\n";
        let occ = occurrences(text, &["k", "v"]);
        let mut fragments = locate(text, &occ, 2);
        assert_eq!(fragments.next().unwrap().start, 0);
        assert_eq!(fragments.next().unwrap().start, 4);
        assert_eq!(fragments.next().unwrap().start, 8);
        assert!(fragments.next().is_none());
    }
}
