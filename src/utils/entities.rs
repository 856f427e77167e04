//! HTML entity decoding
//!
//! Meta tag contents and embedded JSON frequently arrive double-encoded
//! (`&amp;#39;`), so decoding repeats until the text stops changing.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap()
});

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "copy" => '\u{00A9}',
        _ => return None,
    };
    Some(c)
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        named_entity(body)
    }
}

fn decode_once(input: &str) -> Cow<'_, str> {
    ENTITY_REGEX.replace_all(input, |caps: &Captures| match decode_entity(&caps[1]) {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    })
}

/// Decode numeric, hex and named HTML entities until a fixed point.
///
/// Every successful replacement shortens the text, so the loop terminates.
pub fn decode_html_entities(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = match decode_once(&current) {
            Cow::Borrowed(_) => return current,
            Cow::Owned(s) => s,
        };
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Decode entities, collapse runs of whitespace and trim.
pub fn clean_text(input: &str) -> String {
    decode_html_entities(input)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_hex_and_named() {
        assert_eq!(decode_html_entities("It&#39;s"), "It's");
        assert_eq!(decode_html_entities("It&#x27;s"), "It's");
        assert_eq!(
            decode_html_entities("&quot;A&quot; &amp; &lt;B&gt;"),
            "\"A\" & <B>"
        );
    }

    #[test]
    fn test_double_encoded_resolves_fully() {
        assert_eq!(decode_html_entities("&amp;#39;"), "'");
        assert_eq!(decode_html_entities("Rock &amp;amp; Roll"), "Rock & Roll");
    }

    #[test]
    fn test_idempotent_on_decoded_text() {
        let decoded = decode_html_entities("Tom &amp; Jerry&#39;s");
        assert_eq!(decode_html_entities(&decoded), decoded);
        assert_eq!(decode_html_entities("plain text"), "plain text");
    }

    #[test]
    fn test_unknown_entities_are_left_alone() {
        assert_eq!(decode_html_entities("&bogus; &#xD800;"), "&bogus; &#xD800;");
        assert_eq!(decode_html_entities("AT&T"), "AT&T");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Midnight\n   Drive&nbsp; "), "Midnight Drive");
    }
}
