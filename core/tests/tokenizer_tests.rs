use wordindex_core::tokenizer::{clean, parse_words, tokenize_line};

#[test]
fn it_lowercases_and_strips_punctuation() {
    let words = tokenize_line("  Cat dog. Dog, DOG!  ");
    assert_eq!(words, vec!["cat", "dog", "dog", "dog"]);
}

#[test]
fn it_keeps_non_ascii_letters() {
    assert_eq!(clean("Café's MENU"), "cafés menu");
}

#[test]
fn it_skips_punctuation_only_tokens() {
    assert_eq!(tokenize_line("-- ... cat !!"), vec!["cat"]);
    assert!(tokenize_line("").is_empty());
}

#[test]
fn it_parses_page_text() {
    let words = parse_words("Hello,\tWorld 2024 — ünïcode\n");
    assert_eq!(words, vec!["hello", "world", "2024", "ünïcode"]);
}
