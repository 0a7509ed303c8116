use unicode_normalization::UnicodeNormalization;

const DEFAULT_MAX_LEN: usize = 64;

/// ASCII-only, lowercase, underscore-separated identifier derived from an
/// arbitrary Unicode string: NFKD-decompose, drop non-ASCII, lowercase,
/// collapse runs of non-alphanumerics to a single `_`, trim leading/trailing
/// `_`, then truncate (stripping a trailing `_` left by the cut).
///
/// `slug(slug(x)) == slug(x)` for every `x`; empty input yields `""`.
pub fn slug(value: &str) -> String {
    slug_with_max(value, DEFAULT_MAX_LEN)
}

pub fn slug_with_max(value: &str, max_len: usize) -> String {
    if value.is_empty() {
        return String::new();
    }

    let ascii_lower: String = value
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase();

    let mut collapsed = String::with_capacity(ascii_lower.len());
    let mut last_was_sep = true; // swallow any leading separator
    for ch in ascii_lower.chars() {
        if ch.is_ascii_alphanumeric() {
            collapsed.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            collapsed.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = collapsed.trim_end_matches('_');

    let truncated: String = trimmed.chars().take(max_len).collect();
    truncated.trim_end_matches('_').to_string()
}
