/// Maximum token length to store in the index.
/// Tokens longer than this are likely base64, hex dumps, or other non-searchable content.
const MAX_TOKEN_LENGTH: usize = 128;

/// A word found in a text, with its ordinal position and byte span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
    pub start: usize,
    pub end: usize,
}

/// Split text into lowercase word tokens.
///
/// A word is a run of alphanumeric characters or underscores. Offsets are byte
/// offsets into `text`; positions count only the tokens that were kept, so an
/// over-long token does not leave a gap in phrase positions.
pub fn analyze(text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len() / 6);
    let mut token_start: Option<usize> = None;
    let mut position = 0u32;

    for (i, ch) in text.char_indices() {
        if is_word_char(ch) {
            if token_start.is_none() {
                token_start = Some(i);
            }
        } else if let Some(start) = token_start.take() {
            push_token(&mut tokens, text, start, i, &mut position);
        }
    }

    // Handle last token
    if let Some(start) = token_start {
        push_token(&mut tokens, text, start, text.len(), &mut position);
    }

    tokens
}

/// Words of a phrase query, in order, analyzed the same way as documents
pub fn analyze_phrase(phrase: &str) -> Vec<String> {
    analyze(phrase.trim().trim_matches('"'))
        .into_iter()
        .map(|t| t.text)
        .collect()
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn push_token(tokens: &mut Vec<Token>, text: &str, start: usize, end: usize, position: &mut u32) {
    let slice = &text[start..end];
    if slice.len() > MAX_TOKEN_LENGTH {
        return;
    }

    tokens.push(Token {
        text: slice.to_lowercase(),
        position: *position,
        start,
        end,
    });
    *position += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_offsets() {
        let tokens = analyze("foo bar\nhello world foo\n");
        let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["foo", "bar", "hello", "world", "foo"]);

        assert_eq!((tokens[3].start, tokens[3].end), (14, 19));
        assert_eq!((tokens[4].start, tokens[4].end), (20, 23));
        assert_eq!(tokens[4].position, 4);
    }

    #[test]
    fn test_analyze_lowercases_and_keeps_underscores() {
        let tokens = analyze("fn My_Function123(x)");
        let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["fn", "my_function123", "x"]);
    }

    #[test]
    fn test_analyze_unicode_offsets_are_bytes() {
        let text = "größe maß";
        let tokens = analyze(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&text[tokens[1].start..tokens[1].end], "maß");
    }

    #[test]
    fn test_long_tokens_do_not_consume_positions() {
        let long = "a".repeat(MAX_TOKEN_LENGTH + 1);
        let text = format!("one {} two", long);
        let tokens = analyze(&text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "two");
        assert_eq!(tokens[1].position, 1);
    }

    #[test]
    fn test_analyze_phrase_strips_quotes() {
        assert_eq!(analyze_phrase("\"Hello, World\""), vec!["hello", "world"]);
        assert!(analyze_phrase("  ").is_empty());
    }
}
