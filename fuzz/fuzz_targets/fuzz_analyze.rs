#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Tokens must always slice back into the text they came from
    let text = String::from_utf8_lossy(data);
    for token in phrasedex::utils::analyze(&text) {
        assert!(token.start < token.end);
        assert_eq!(text[token.start..token.end].to_lowercase(), token.text);
    }
    let _ = phrasedex::utils::is_binary(data);
});
