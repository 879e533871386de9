//! Property-based tests for the escaping guarantees.
//!
//! Whatever bytes a caller hands in, one value must stay one value: it is bare
//! only when bare is unambiguous, a quoted value can only end at its closing
//! quote, and the output is always valid UTF-8 on a single line.

use logfmt_encoder::escape::{needs_quotes, write_value};
use logfmt_encoder::{Encoder, ObjectEncoder};
use proptest::prelude::*;

fn render(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

/// Returns the index of the first quote that is not preceded by an escaping
/// backslash, scanning the interior of a quoted value.
fn first_unescaped_quote(interior: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < interior.len() {
        match interior[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn byte_strings() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

fn invalid_byte_count(value: &[u8]) -> usize {
    value.utf8_chunks().map(|chunk| chunk.invalid().len()).sum()
}

proptest! {
    #[test]
    fn prop_safe_strings_stay_bare(s in "[A-Za-z0-9_./:@+\\-\\[\\],]{0,40}") {
        let mut enc = Encoder::default();
        enc.add_string("k", &s);
        let expected = format!("k={s}");
        prop_assert_eq!(enc.as_str(), Some(expected.as_str()));
    }

    #[test]
    fn prop_space_forces_quotes(left in "[a-z]{0,10}", right in "[a-z]{0,10}") {
        let value = format!("{left} {right}");
        prop_assert!(needs_quotes(value.as_bytes()));
        let out = render(value.as_bytes());
        prop_assert_eq!(out, format!("\"{value}\"").into_bytes());
    }

    #[test]
    fn prop_quoted_value_ends_only_at_closing_quote(bytes in byte_strings()) {
        let out = render(&bytes);
        prop_assert!(std::str::from_utf8(&out).is_ok());
        prop_assert!(!out.contains(&b'\n'));
        prop_assert!(!out.contains(&b'\r'));

        if needs_quotes(&bytes) {
            prop_assert!(out.len() >= 2);
            prop_assert_eq!(out[0], b'"');
            prop_assert_eq!(out[out.len() - 1], b'"');
            let interior = &out[1..out.len() - 1];
            prop_assert_eq!(first_unescaped_quote(interior), None);
            // A dangling backslash would swallow the closing quote.
            let trailing = interior.iter().rev().take_while(|&&b| b == b'\\').count();
            prop_assert!(trailing % 2 == 0);
        } else {
            prop_assert_eq!(out, bytes);
        }
    }

    #[test]
    fn prop_invalid_bytes_become_replacement_characters(bytes in byte_strings()) {
        let literal = bytes
            .utf8_chunks()
            .map(|chunk| chunk.valid().matches('\u{FFFD}').count())
            .sum::<usize>();
        let expected = invalid_byte_count(&bytes) + literal;

        let out = String::from_utf8(render(&bytes)).unwrap();
        prop_assert_eq!(out.matches('\u{FFFD}').count(), expected);
        if expected > 0 {
            prop_assert!(out.starts_with('"'));
        }
    }

    #[test]
    fn prop_tokens_never_merge(values in prop::collection::vec(".{0,16}", 1..6)) {
        let mut enc = Encoder::default();
        for value in &values {
            enc.add_string("f", value);
        }
        let text = enc.as_str().unwrap();
        prop_assert!(text.starts_with("f="));
        prop_assert!(!text.contains('\n'));
    }
}
