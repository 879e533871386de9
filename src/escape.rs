//! Value quoting and escaping.
//!
//! A logfmt value is written bare when it is *safe*: it contains no byte at or
//! below `0x20` (space and the C0 controls), no `=`, no `"`, and no invalid
//! UTF-8. Anything else is wrapped in double quotes and escaped so the value
//! can never end early or forge a `key=` boundary:
//!
//! | Input | Output |
//! |-------|--------|
//! | `\` | `\\` |
//! | `"` | `\"` |
//! | newline | `\n` |
//! | carriage return | `\r` |
//! | tab | `\t` |
//! | other control byte | `\u00XX` (lowercase hex) |
//! | each byte of an invalid UTF-8 sequence | U+FFFD |
//!
//! Runs of text between escape points are copied in bulk.
//!
//! ```rust
//! use logfmt_encoder::escape::{needs_quotes, write_value};
//!
//! assert!(!needs_quotes(b"plain"));
//! assert!(needs_quotes(b"two words"));
//!
//! let mut out = Vec::new();
//! write_value(&mut out, b"say \"hi\"");
//! assert_eq!(out, br#""say \"hi\"""#);
//! ```

const HEX: &[u8; 16] = b"0123456789abcdef";
const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;
const REPLACEMENT_UTF8: &[u8] = "\u{FFFD}".as_bytes();

/// Returns `true` when `value` cannot be written bare.
///
/// A literal U+FFFD also forces quoting: it is indistinguishable from a
/// replaced decode error once written.
#[inline]
pub fn needs_quotes(value: &[u8]) -> bool {
    value.utf8_chunks().any(|chunk| {
        !chunk.invalid().is_empty()
            || chunk
                .valid()
                .chars()
                .any(|c| c <= ' ' || c == '=' || c == '"' || c == REPLACEMENT)
    })
}

/// Appends `value`, quoting and escaping it only if [`needs_quotes`] says so.
#[inline]
pub fn write_value(out: &mut Vec<u8>, value: &[u8]) {
    if needs_quotes(value) {
        write_quoted(out, value);
    } else {
        out.extend_from_slice(value);
    }
}

/// Appends `value` wrapped in double quotes with every unsafe byte escaped.
pub fn write_quoted(out: &mut Vec<u8>, value: &[u8]) {
    out.reserve(value.len() + 2);
    out.push(b'"');
    for chunk in value.utf8_chunks() {
        let valid = chunk.valid().as_bytes();
        let mut start = 0;
        for (i, &b) in valid.iter().enumerate() {
            let short: &[u8] = match b {
                b'\\' => b"\\\\",
                b'"' => b"\\\"",
                b'\n' => b"\\n",
                b'\r' => b"\\r",
                b'\t' => b"\\t",
                0x00..=0x1f | 0x7f => {
                    out.extend_from_slice(&valid[start..i]);
                    out.extend_from_slice(b"\\u00");
                    out.push(HEX[usize::from(b >> 4)]);
                    out.push(HEX[usize::from(b & 0xf)]);
                    start = i + 1;
                    continue;
                }
                _ => continue,
            };
            out.extend_from_slice(&valid[start..i]);
            out.extend_from_slice(short);
            start = i + 1;
        }
        out.extend_from_slice(&valid[start..]);

        // One replacement character per offending byte keeps later text aligned.
        for _ in chunk.invalid() {
            out.extend_from_slice(REPLACEMENT_UTF8);
        }
    }
    out.push(b'"');
}
