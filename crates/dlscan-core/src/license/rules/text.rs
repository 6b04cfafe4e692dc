//! Text normalization shared by the field rules.

use super::patterns::{HORIZONTAL_SPACE, LINE_BREAK};

/// Collapse horizontal whitespace runs to one space and strip every line,
/// dropping blank lines. Newlines survive as line separators.
pub fn normalize_whitespace(text: &str) -> String {
    let collapsed = HORIZONTAL_SPACE.replace_all(text, " ");
    LINE_BREAK.replace_all(&collapsed, "\n").into_owned()
}

/// Capitalize the first letter of every word and lowercase the rest.
///
/// A letter starts a word when it follows anything that is not a letter or
/// digit, so `O'BRIEN` becomes `O'Brien` and `21ST` becomes `21st`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = c.is_numeric();
        }
    }
    out
}
