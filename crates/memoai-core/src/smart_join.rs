//! Chunk concatenation for streamed answers.
//!
//! Streaming splits model output at arbitrary points, which occasionally glues
//! a fenced code block onto the preceding prose or its language tag onto the
//! first line of code. [`smart_join`] patches exactly those two cases and
//! otherwise concatenates verbatim. It is not a markdown parser: fences
//! without a language tag, nested fences and markers split across chunks are
//! left alone.

/// Opening fence marker.
pub const FENCE: &str = "```";

/// Language tags recognised directly after an opening fence.
pub const FENCE_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "cpp",
    "c",
    "php",
    "ruby",
    "go",
    "rust",
    "swift",
    "kotlin",
    "scala",
    "html",
    "css",
    "sql",
    "bash",
    "shell",
    "json",
    "xml",
    "yaml",
];

/// Append `chunk` to `existing`.
///
/// 1. `existing` ends with a fence plus language tag: join with `\n`.
/// 2. `chunk` starts with a fence and `existing` ends with a Latin or Russian
///    letter: join with `\n\n`.
/// 3. Otherwise join directly.
///
/// ```
/// use memoai_core::smart_join::smart_join;
///
/// assert_eq!(smart_join("```rust", "fn main() {}"), "```rust\nfn main() {}");
/// assert_eq!(smart_join("Example", "```bash"), "Example\n\n```bash");
/// assert_eq!(smart_join("Hello", " there"), "Hello there");
/// ```
pub fn smart_join(existing: &str, chunk: &str) -> String {
    if existing.is_empty() {
        return chunk.to_string();
    }
    if chunk.is_empty() {
        return existing.to_string();
    }

    let separator = if ends_with_fence_language(existing) {
        "\n"
    } else if chunk.starts_with(FENCE) && existing.chars().last().is_some_and(is_prose_letter) {
        "\n\n"
    } else {
        ""
    };

    let mut joined = String::with_capacity(existing.len() + separator.len() + chunk.len());
    joined.push_str(existing);
    joined.push_str(separator);
    joined.push_str(chunk);
    joined
}

/// Whether `text` ends with a fence immediately followed by a known language
/// tag.
pub fn ends_with_fence_language(text: &str) -> bool {
    FENCE_LANGUAGES.iter().any(|language| {
        text.strip_suffix(language).is_some_and(|head| head.ends_with(FENCE))
    })
}

fn is_prose_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}
