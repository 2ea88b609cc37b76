//! Repair of the non-standard numeric tokens the backend can emit.
//!
//! The backend serializes missing floats as bare `NaN` (and occasionally
//! `Infinity`), which is not JSON. Outside of string literals those tokens are
//! rewritten to `null` before parsing.

use std::borrow::Cow;

/// Tokens that stand for non-finite numbers. `-Infinity` must be tried first.
const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace non-finite numeric tokens with `null`, leaving string contents untouched.
pub fn scrub_non_finite(raw: &str) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        let matched = NON_FINITE_TOKENS
            .iter()
            .find(|token| bytes[i..].starts_with(token.as_bytes()));

        match matched {
            Some(token) => {
                let buf = out.get_or_insert_with(|| String::with_capacity(raw.len()));
                buf.push_str(&raw[copied..i]);
                buf.push_str("null");
                i += token.len();
                copied = i;
            }
            None => i += 1,
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&raw[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(raw),
    }
}
