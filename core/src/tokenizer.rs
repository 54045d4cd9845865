use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"[[:punct:]]+").expect("valid regex");
    static ref NON_WORD: Regex = Regex::new(r"[^\p{Alphabetic}\p{Nd}\s]+").expect("valid regex");
}

/// Normalize one line of text: trim, lower-case, drop ASCII punctuation.
pub fn clean(line: &str) -> String {
    PUNCT.replace_all(&line.trim().to_lowercase(), "").into_owned()
}

/// Split cleaned text on whitespace, skipping empty tokens.
pub fn split_words(cleaned: &str) -> impl Iterator<Item = &str> + '_ {
    cleaned.split_whitespace()
}

/// Clean and split a single line into owned tokens.
pub fn tokenize_line(line: &str) -> Vec<String> {
    split_words(&clean(line)).map(str::to_owned).collect()
}

/// Tokenize plain text extracted from a web page: every character that is not
/// alphanumeric or whitespace is removed before lower-casing and splitting.
pub fn parse_words(text: &str) -> Vec<String> {
    NON_WORD
        .replace_all(text, "")
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}
