#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use phrasedex::index::types::TermOccurrence;
use phrasedex::query::locate;

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    /// (word index, start, length), possibly out of range
    spans: Vec<(u8, u16, u8)>,
    distinct_words: u8,
}

fuzz_target!(|input: Input| {
    let mut occurrences: Vec<TermOccurrence> = input
        .spans
        .iter()
        .filter(|(_, start, _)| input.text.is_char_boundary(*start as usize))
        .filter(|(_, start, len)| input.text.is_char_boundary(*start as usize + *len as usize))
        // Real tokens never contain line breaks
        .filter(|(_, start, len)| {
            let span = &input.text[*start as usize..*start as usize + *len as usize];
            !span.contains(['\n', '\r'])
        })
        .map(|&(word, start, len)| TermOccurrence {
            word: format!("w{}", word % 4),
            position: 0,
            start: start as usize,
            end: start as usize + len as usize,
        })
        .collect();
    occurrences.sort_by_key(|o| o.start);

    let mut last_start = 0;
    for fragment in locate(&input.text, &occurrences, input.distinct_words as usize) {
        // Fragments never span a line break and come out in order
        assert!(!fragment.as_str().contains('\n'));
        assert!(fragment.start >= last_start);
        last_start = fragment.start;
    }
});
