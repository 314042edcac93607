//! Corrects legacy escaped-unicode sequences in human-readable text.
//!
//! The upstream double-encodes some text fields: after JSON decoding, the
//! string still contains literal `\uXXXX` sequences. This module replaces
//! them with the characters they denote.

use std::sync::OnceLock;

use regex::Regex;

static ESCAPE_RUN: OnceLock<Regex> = OnceLock::new();

fn escape_run() -> &'static Regex {
    ESCAPE_RUN.get_or_init(|| {
        Regex::new(r"(?:\\u[0-9a-fA-F]{4})+").expect("Failed to compile escape pattern")
    })
}

/// Replace every literal `\uXXXX` escape with the character it denotes.
///
/// Pure and total. Runs of consecutive escapes are decoded as UTF-16, so a
/// surrogate pair becomes the astral character it encodes. An escape that
/// does not form a valid unit (an unpaired surrogate) is left as written;
/// malformed escapes never match the pattern at all.
pub fn normalize_escapes(input: &str) -> String {
    if !input.contains("\\u") {
        return input.to_string();
    }
    escape_run()
        .replace_all(input, |caps: &regex::Captures<'_>| decode_escape_run(&caps[0]))
        .into_owned()
}

/// Decode one run of `\uXXXX` escapes. Each escape is exactly 6 ASCII bytes.
fn decode_escape_run(run: &str) -> String {
    let units: Vec<u16> = run
        .as_bytes()
        .chunks(6)
        .filter_map(|esc| std::str::from_utf8(&esc[2..]).ok())
        .filter_map(|hex| u16::from_str_radix(hex, 16).ok())
        .collect();

    let mut out = String::with_capacity(run.len());
    let mut consumed = 0;
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(c) => {
                out.push(c);
                consumed += c.len_utf16();
            }
            Err(_) => {
                // Unpaired surrogate: keep the original escape text.
                out.push_str(&run[consumed * 6..(consumed + 1) * 6]);
                consumed += 1;
            }
        }
    }
    out
}
