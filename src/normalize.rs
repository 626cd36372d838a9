use itertools::Itertools;

/// Collapse every whitespace run into a single space and trim both ends.
/// Comparison downstream is case-sensitive, so no folding happens here.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// [`normalize`] for text that is still being typed. A trailing whitespace
/// run is kept as one space so a finished word stays finished.
pub fn normalize_partial(text: &str) -> String {
    let mut out = normalize(text);
    if !out.is_empty() && text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out
}

/// Number of words in the normalized form of `text`
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
