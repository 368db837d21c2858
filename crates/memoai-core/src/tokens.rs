//! Token count estimate.
//!
//! This is a heuristic, not a tokenizer: roughly four characters per token,
//! plus surcharges for punctuation and line breaks. Session statistics treat
//! it as an approximate metric.

/// Estimate the number of tokens in `text`.
///
/// `ceil(len / 4) + ceil(special / 2) + ceil(newlines / 2)` where `len` and
/// `special` count UTF-16 code units. A unit is special unless it is a word
/// character (`[A-Za-z0-9_]`), whitespace, or a lowercase Russian letter, so
/// uppercase Cyrillic is special and a character outside the BMP counts as
/// two.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let length: usize = text.chars().map(char::len_utf16).sum();
    let special: usize = text.chars().filter(|&c| is_special(c)).map(char::len_utf16).sum();
    let newlines = text.chars().filter(|&c| c == '\n').count();

    length.div_ceil(4) + special.div_ceil(2) + newlines.div_ceil(2)
}

fn is_special(c: char) -> bool {
    let word = c.is_ascii_alphanumeric() || c == '_';
    let russian_lower = ('а'..='я').contains(&c) || c == 'ё';
    !(word || is_js_whitespace(c) || russian_lower)
}

/// Whitespace as matched by `\s` in ECMAScript regular expressions: Unicode
/// `White_Space` plus the byte order mark, minus NEL.
fn is_js_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_free() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn plain_ascii() {
        // 5 chars -> 2
        assert_eq!(estimate_tokens("hello"), 2);
        // 12 chars -> 3, "!" special -> 1
        assert_eq!(estimate_tokens("Hello there!"), 4);
    }

    #[test]
    fn newlines_and_punctuation() {
        // "a\nb\nc." : 6 chars -> 2, "." -> 1, 2 newlines -> 1
        assert_eq!(estimate_tokens("a\nb\nc."), 4);
    }

    #[test]
    fn cyrillic_lowercase_is_not_special() {
        // "привет": 6 chars -> 2
        assert_eq!(estimate_tokens("привет"), 2);
        // "Привет": "П" is special -> +1
        assert_eq!(estimate_tokens("Привет"), 3);
    }

    #[test]
    fn astral_chars_count_twice() {
        // one emoji: 2 code units -> 1, 2 special units -> 1
        assert_eq!(estimate_tokens("😀"), 2);
        // two emoji: 4 code units -> 1, 4 special units -> 2
        assert_eq!(estimate_tokens("😀😀"), 3);
    }

    #[test]
    fn next_line_is_not_whitespace() {
        // "a\u{85}": 2 chars -> 1, NEL special -> 1
        assert_eq!(estimate_tokens("a\u{85}"), 2);
        // "a\u{a0}b": NBSP is whitespace, 3 chars -> 1
        assert_eq!(estimate_tokens("a\u{a0}b"), 1);
        // BOM is whitespace too
        assert_eq!(estimate_tokens("\u{feff}"), 1);
    }
}
