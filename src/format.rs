//! Allocation-free rendering of numbers and timestamps.
//!
//! All writers append to a byte buffer and never fail.
//!
//! Floats use general (`%g`-style) formatting with three significant digits:
//! fixed notation for moderate exponents, exponential notation (`1.23e+05`)
//! otherwise, trailing zeros removed. This is a known precision limitation:
//! `3.14159` renders as `3.14` and `1234.5` as `1.23e+03`, so float fields do
//! not round-trip.
//!
//! ```rust
//! use logfmt_encoder::format::{write_f64, write_i64};
//!
//! let mut out = Vec::new();
//! write_i64(&mut out, -7);
//! out.push(b' ');
//! write_f64(&mut out, 3.14159);
//! assert_eq!(out, b"-7 3.14");
//! ```

use chrono::{DateTime, Datelike, Offset, TimeZone, Timelike};
use std::fmt::Write as _;

/// Significant digits kept by [`write_f64`].
pub const FLOAT_PRECISION: usize = 3;

/// Appends the base-10 representation of `value`.
#[inline]
pub fn write_u64(out: &mut Vec<u8>, mut value: u64) {
    let mut buf = [0u8; 20];
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    out.extend_from_slice(&buf[pos..]);
}

/// Appends the base-10 representation of `value`, with a leading `-` when negative.
#[inline]
pub fn write_i64(out: &mut Vec<u8>, value: i64) {
    if value < 0 {
        out.push(b'-');
    }
    write_u64(out, value.unsigned_abs());
}

/// Appends `value` in `%g` style with [`FLOAT_PRECISION`] significant digits.
///
/// Special values render as `NaN`, `+Inf` and `-Inf`.
pub fn write_f64(out: &mut Vec<u8>, value: f64) {
    if value.is_nan() {
        out.extend_from_slice(b"NaN");
        return;
    }
    if value.is_infinite() {
        out.extend_from_slice(if value > 0.0 { b"+Inf" } else { b"-Inf" });
        return;
    }
    if value.is_sign_negative() {
        out.push(b'-');
    }

    let digits = Decimal::round(value.abs(), FLOAT_PRECISION);
    let prec = FLOAT_PRECISION as i32;
    let nd = digits.len as i32;
    let dp = digits.point;

    let mut eprec = prec;
    if eprec > nd && nd >= dp {
        eprec = nd;
    }
    let exp = dp - 1;
    if exp < -4 || exp >= eprec {
        write_exponential(out, &digits, prec.min(nd) - 1);
    } else {
        let shown = if prec > dp { nd } else { prec };
        write_fixed(out, &digits, (shown - dp).max(0));
    }
}

/// Significant decimal digits of a non-negative float, trailing zeros removed.
///
/// The value equals `0.d1d2d3 * 10^point`; zero has no digits and `point == 0`.
struct Decimal {
    digits: [u8; FLOAT_PRECISION],
    len: usize,
    point: i32,
}

impl Decimal {
    fn round(value: f64, precision: usize) -> Self {
        let mut decimal = Decimal {
            digits: [b'0'; FLOAT_PRECISION],
            len: 0,
            point: 0,
        };
        if value == 0.0 {
            return decimal;
        }

        // `{:.Ne}` rounds exactly (half to even) and yields `d.ddde<exp>`.
        let mut scratch = StackBuf::new();
        if write!(scratch, "{:.*e}", precision - 1, value).is_err() {
            return decimal;
        }
        let text = scratch.as_bytes();
        let split = text.iter().position(|&b| b == b'e').unwrap_or(text.len());
        for &b in text[..split].iter().filter(|b| b.is_ascii_digit()) {
            if decimal.len < FLOAT_PRECISION {
                decimal.digits[decimal.len] = b;
                decimal.len += 1;
            }
        }
        while decimal.len > 0 && decimal.digits[decimal.len - 1] == b'0' {
            decimal.len -= 1;
        }

        let mut exponent: i32 = 0;
        let mut negative = false;
        for &b in text.get(split + 1..).unwrap_or_default() {
            match b {
                b'-' => negative = true,
                b'0'..=b'9' => exponent = exponent * 10 + i32::from(b - b'0'),
                _ => {}
            }
        }
        if negative {
            exponent = -exponent;
        }
        decimal.point = exponent + 1;
        decimal
    }

    fn digit(&self, index: i32) -> u8 {
        if index >= 0 && (index as usize) < self.len {
            self.digits[index as usize]
        } else {
            b'0'
        }
    }
}

fn write_exponential(out: &mut Vec<u8>, digits: &Decimal, prec: i32) {
    out.push(digits.digit(0));
    if prec > 0 {
        out.push(b'.');
        for i in 1..=prec {
            out.push(digits.digit(i));
        }
    }
    out.push(b'e');
    let mut exp = if digits.len == 0 { 0 } else { digits.point - 1 };
    if exp < 0 {
        out.push(b'-');
        exp = -exp;
    } else {
        out.push(b'+');
    }
    if exp < 10 {
        out.push(b'0');
    }
    write_u64(out, exp as u64);
}

fn write_fixed(out: &mut Vec<u8>, digits: &Decimal, prec: i32) {
    if digits.point > 0 {
        for i in 0..digits.point {
            out.push(digits.digit(i));
        }
    } else {
        out.push(b'0');
    }
    if prec > 0 {
        out.push(b'.');
        for i in 1..=prec {
            out.push(digits.digit(digits.point + i - 1));
        }
    }
}

/// Fixed-size `fmt::Write` target; large enough for any `{:.2e}` float.
struct StackBuf {
    buf: [u8; 32],
    len: usize,
}

impl StackBuf {
    fn new() -> Self {
        StackBuf {
            buf: [0; 32],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl std::fmt::Write for StackBuf {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let end = self.len + s.len();
        if end > self.buf.len() {
            return Err(std::fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Appends `time` as RFC 3339 with nanoseconds.
///
/// The fractional part is trimmed of trailing zeros and dropped when zero; a
/// UTC offset renders as `Z`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use logfmt_encoder::format::write_rfc3339_nano;
///
/// let time = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
/// let mut out = Vec::new();
/// write_rfc3339_nano(&mut out, &time);
/// assert_eq!(out, b"2024-01-15T10:30:00Z");
/// ```
pub fn write_rfc3339_nano<Tz: TimeZone>(out: &mut Vec<u8>, time: &DateTime<Tz>) {
    let local = time.naive_local();
    let year = local.year();
    if year < 0 {
        out.push(b'-');
    }
    write_padded(out, year.unsigned_abs(), 4);
    out.push(b'-');
    write_padded(out, local.month(), 2);
    out.push(b'-');
    write_padded(out, local.day(), 2);
    out.push(b'T');
    write_padded(out, local.hour(), 2);
    out.push(b':');
    write_padded(out, local.minute(), 2);
    out.push(b':');
    write_padded(out, local.second(), 2);

    // chrono encodes a leap second as nanos >= 1e9
    let nanos = local.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let mut fraction = [b'0'; 9];
        let mut rest = nanos;
        for slot in fraction.iter_mut().rev() {
            *slot = b'0' + (rest % 10) as u8;
            rest /= 10;
        }
        let len = fraction
            .iter()
            .rposition(|&b| b != b'0')
            .map_or(0, |i| i + 1);
        out.push(b'.');
        out.extend_from_slice(&fraction[..len]);
    }

    let offset = time.offset().fix().local_minus_utc();
    if offset == 0 {
        out.push(b'Z');
        return;
    }
    out.push(if offset < 0 { b'-' } else { b'+' });
    let minutes = offset.unsigned_abs() / 60;
    write_padded(out, minutes / 60, 2);
    out.push(b':');
    write_padded(out, minutes % 60, 2);
}

fn write_padded(out: &mut Vec<u8>, value: u32, width: usize) {
    let start = out.len();
    write_u64(out, u64::from(value));
    let written = out.len() - start;
    if written < width {
        let pad = width - written;
        out.splice(start..start, std::iter::repeat(b'0').take(pad));
    }
}
