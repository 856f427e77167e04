//! Canonical identifiers for songs and playlists
//!
//! An identifier is a 36-character hyphenated hex token (8-4-4-4-12). It is
//! matched case-insensitively and always stored lowercase.

use crate::utils::config::ExtractorSettings;
use crate::utils::error::{Result, SunoloaderError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

pub const IDENTIFIER_LEN: usize = 36;

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

static EXACT_IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

/// Trim and ASCII-lowercase. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// A normalized song or playlist identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parse a bare identifier, normalizing case
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if EXACT_IDENTIFIER_REGEX.is_match(&normalized) {
            Some(Self(normalized))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = SunoloaderError;

    fn try_from(value: String) -> Result<Self> {
        Identifier::parse(&value).ok_or(SunoloaderError::InvalidReference(value))
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Every distinct identifier-shaped token in `text`, in order of first
/// appearance, de-duplicated case-insensitively.
///
/// Tokens embedded in words (`image_<id>.jpeg`) count; a match that is part
/// of a longer hex run does not.
pub fn find_all(text: &str) -> Vec<Identifier> {
    let bytes = text.as_bytes();
    let mut seen = HashSet::new();
    IDENTIFIER_REGEX
        .find_iter(text)
        .filter(|m| {
            let before = m.start().checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(m.end()).copied();
            !before.is_some_and(|b| b.is_ascii_hexdigit())
                && !after.is_some_and(|b| b.is_ascii_hexdigit())
        })
        .filter_map(|m| Identifier::parse(m.as_str()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Resolve a playlist reference: a bare identifier or a URL containing
/// `/<playlist_path>/<identifier>`.
///
/// Performs no I/O; malformed input fails immediately.
pub fn parse_playlist_reference(input: &str, settings: &ExtractorSettings) -> Result<Identifier> {
    if let Some(id) = Identifier::parse(input) {
        return Ok(id);
    }

    let marker = format!("/{}/", settings.playlist_path.trim_matches('/'));
    let lowered = normalize(input);
    lowered
        .find(&marker)
        .and_then(|pos| {
            let rest = &lowered[pos + marker.len()..];
            rest.get(..IDENTIFIER_LEN).filter(|candidate| {
                // the token must end at a path/query boundary
                rest[IDENTIFIER_LEN..]
                    .chars()
                    .next()
                    .map_or(true, |c| matches!(c, '/' | '?' | '#'))
                    && EXACT_IDENTIFIER_REGEX.is_match(candidate)
            })
        })
        .and_then(Identifier::parse)
        .ok_or_else(|| SunoloaderError::InvalidReference(input.to_string()))
}

/// Parse a list of raw song identifiers, skipping anything malformed.
pub fn parse_many<I, S>(raw: I) -> (Vec<Identifier>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ok = Vec::new();
    let mut rejected = Vec::new();
    for item in raw {
        let item = item.as_ref();
        match Identifier::parse(item).or_else(|| find_all(item).into_iter().next()) {
            Some(id) => ok.push(id),
            None => rejected.push(item.to_string()),
        }
    }
    (ok, rejected)
}
