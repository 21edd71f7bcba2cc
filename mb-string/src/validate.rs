//! UTF-8 membership checks.

use serde::Deserialize;

/// How thoroughly [`is_utf8`] inspects its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Full RFC 3629 grammar: no overlong forms, no surrogates, nothing
    /// above U+10FFFF.
    Strict,
    /// ASCII short-circuit, then lead/continuation byte structure only.
    Quick,
}

pub fn is_utf8(input: &[u8], strictness: Strictness) -> bool {
    match strictness {
        Strictness::Strict => std::str::from_utf8(input).is_ok(),
        Strictness::Quick => is_utf8_quick(input),
    }
}

fn is_utf8_quick(input: &[u8]) -> bool {
    if input.is_ascii() {
        return true;
    }

    let mut i = 0;
    while i < input.len() {
        let width = match sequence_width(input[i]) {
            Some(width) => width,
            None => return false,
        };
        if i + width > input.len() {
            return false;
        }
        if !input[i + 1..i + width].iter().all(|b| is_continuation(*b)) {
            return false;
        }
        i += width;
    }
    true
}

/// Sequence length announced by a lead byte, `None` for a stray continuation
/// or an invalid lead.
pub(crate) fn sequence_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_both_modes() {
        assert!(is_utf8(b"plain ascii", Strictness::Strict));
        assert!(is_utf8(b"plain ascii", Strictness::Quick));
        assert!(is_utf8(b"", Strictness::Quick));
    }

    #[test]
    fn well_formed_multibyte_passes_both_modes() {
        let text = "价格 ¥12 🎉".as_bytes();
        assert!(is_utf8(text, Strictness::Strict));
        assert!(is_utf8(text, Strictness::Quick));
    }

    #[test]
    fn overlong_and_surrogate_only_fail_strict() {
        // Overlong encoding of '/'.
        let overlong = [0xC0, 0xAF];
        assert!(!is_utf8(&overlong, Strictness::Strict));
        assert!(is_utf8(&overlong, Strictness::Quick));

        // Encoded UTF-16 surrogate U+D800.
        let surrogate = [0xED, 0xA0, 0x80];
        assert!(!is_utf8(&surrogate, Strictness::Strict));
        assert!(is_utf8(&surrogate, Strictness::Quick));
    }

    #[test]
    fn broken_structure_fails_both_modes() {
        let truncated = [b'a', 0xE4, 0xBD];
        assert!(!is_utf8(&truncated, Strictness::Strict));
        assert!(!is_utf8(&truncated, Strictness::Quick));

        let stray_continuation = [0x80, b'a'];
        assert!(!is_utf8(&stray_continuation, Strictness::Quick));

        let invalid_lead = [0xFF];
        assert!(!is_utf8(&invalid_lead, Strictness::Quick));
    }
}
