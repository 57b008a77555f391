//! Comment and literal stripping.
//!
//! Every count in this crate runs on cleaned text so that identifiers inside
//! comments or strings cannot pollute the signals.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn lexeme_regex() -> &'static Regex {
    static LEXEME: OnceLock<Regex> = OnceLock::new();
    LEXEME.get_or_init(|| {
        // Leftmost alternative wins, so `//` inside a string literal stays part
        // of the literal and quotes inside comments stay part of the comment.
        Regex::new(r#"(?s)//[^\n]*|/\*.*?\*/|"(?:\\.|[^"\\\n])*"|'(?:\\.|[^'\\\n])*'"#).unwrap()
    })
}

/// Remove line and block comments; replace string and character literals by
/// empty placeholders (`""`, `''`).
pub fn clean_source(text: &str) -> String {
    lexeme_regex()
        .replace_all(text, |caps: &Captures| {
            let lexeme = &caps[0];
            if lexeme.starts_with('"') {
                "\"\""
            } else if lexeme.starts_with('\'') {
                "''"
            } else {
                ""
            }
        })
        .into_owned()
}
