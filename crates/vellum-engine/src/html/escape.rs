//! Character-level escaping for serialized output.
//!
//! Ports the original engine's output escaping: markup metacharacters become
//! entities, runs of spaces are padded with `&nbsp;` so browsers keep them
//! visible, and anything outside printable ASCII becomes a numeric character
//! reference. Engine filler characters are dropped entirely.

use std::fmt::Write;

use crate::constants::is_filler;

/// Appends `text` to `out`, escaped for HTML text content.
pub fn append_escaped(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if is_filler(c) {
            continue;
        }
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            ' ' => {
                // a run of n spaces renders as n-1 non-breaking spaces
                // followed by one regular space
                while chars.peek() == Some(&' ') {
                    out.push_str("&nbsp;");
                    chars.next();
                }
                out.push(' ');
            }
            c if (c as u32) > 0x7E || c < ' ' => {
                let _ = write!(out, "&#{};", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Convenience wrapper returning a fresh string.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    append_escaped(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAGIC_CHAR, ZWJ};

    #[test]
    fn markup_metacharacters() {
        assert_eq!(escape("a < b > c & d"), "a &lt; b &gt; c &amp; d");
    }

    #[test]
    fn space_runs_become_nbsp() {
        assert_eq!(escape("a  b"), "a&nbsp; b");
        assert_eq!(escape("a   b"), "a&nbsp;&nbsp; b");
        assert_eq!(escape("a b"), "a b");
    }

    #[test]
    fn non_breaking_space() {
        assert_eq!(escape("a\u{A0}b"), "a&nbsp;b");
    }

    #[test]
    fn astral_code_points_become_numeric_references() {
        assert_eq!(escape("\u{1F600}"), "&#128512;");
    }

    #[test]
    fn non_ascii_and_controls_become_numeric_references() {
        assert_eq!(escape("é"), "&#233;");
        assert_eq!(escape("\t"), "&#9;");
    }

    #[test]
    fn fillers_are_dropped() {
        assert_eq!(escape(&format!("a{ZWJ}b{MAGIC_CHAR}c")), "abc");
    }
}
