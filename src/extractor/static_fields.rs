//! Static-tier extraction from raw HTML and embedded JSON
//!
//! Each field has an ordered chain of heuristics. A heuristic is a plain
//! function from the parsed page to `Option<String>`; the first `Some` wins
//! and `None` simply advances the chain. Nothing in here returns an error
//! for malformed markup.

use crate::extractor::identifier::Identifier;
use crate::extractor::models::{ExtractionTier, SongFields, SongRecord};
use crate::extractor::traits::SongExtractor;
use crate::fetcher::PageFetcher;
use crate::utils::config::ExtractorSettings;
use crate::utils::entities::{clean_text, decode_html_entities};
use crate::utils::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

static META_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script>").unwrap());

static FLIGHT_PUSH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*self\.__next_f\.push\((\[.*\])\)\s*;?\s*$").unwrap());

static BY_HANDLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bby\s+@([A-Za-z0-9_][A-Za-z0-9_.\-]*)").unwrap());

static PROFILE_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/@([A-Za-z0-9_][A-Za-z0-9_.\-]*)").unwrap());

/// Meta tags consulted for the platform creator
const CREATOR_META_KEYS: &[&str] = &["twitter:creator", "creator", "author"];

/// Keys on the song object (or its `metadata`) holding the style tags
const STYLE_KEYS: &[&str] = &["tags", "style"];

/// Keys on the song object (or its `metadata`) holding a description
const DESCRIPTION_KEYS: &[&str] = &["caption", "description", "gpt_description_prompt"];

/// Structured data recovered from `<script>` blocks
#[derive(Debug, Default)]
struct StructuredData {
    /// Top-level `name` of a JSON-LD block
    ld_name: Option<String>,
    /// The JSON object describing this song, wherever it was embedded
    song: Option<Value>,
}

/// A page prepared for heuristics: meta tags indexed once, scripts parsed once
pub struct StaticPage<'a> {
    html: &'a str,
    id: &'a Identifier,
    settings: &'a ExtractorSettings,
    meta: HashMap<String, String>,
    structured: StructuredData,
}

impl<'a> StaticPage<'a> {
    pub fn parse(html: &'a str, id: &'a Identifier, settings: &'a ExtractorSettings) -> Self {
        Self {
            html,
            id,
            settings,
            meta: index_meta_tags(html),
            structured: find_structured_data(html, id),
        }
    }

    /// Content of a `<meta property|name=key>` tag, raw (undecoded)
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn song_field(&self, keys: &[&str]) -> Option<String> {
        let song = self.structured.song.as_ref()?;
        let metadata = song.get("metadata");
        keys.iter()
            .flat_map(|key| [metadata.and_then(|m| m.get(*key)), song.get(*key)])
            .flatten()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// A named heuristic; position in its chain is its priority
pub type Heuristic = (&'static str, fn(&StaticPage<'_>) -> Option<String>);

pub const TITLE_CHAIN: &[Heuristic] = &[
    ("structured-data", title_from_structured_data),
    ("og:title", title_from_og_title),
];

pub const COVER_CHAIN: &[Heuristic] = &[("og:image", cover_from_og_image)];

pub const ARTIST_CHAIN: &[Heuristic] = &[
    ("og:description", artist_from_og_description),
    ("profile-link", artist_from_profile_link),
    ("by-handle", artist_from_document_by_handle),
    ("creator-meta", artist_from_creator_meta),
];

pub const STYLE_CHAIN: &[Heuristic] = &[("structured-data", style_from_structured_data)];

pub const DESCRIPTION_CHAIN: &[Heuristic] =
    &[("structured-data", description_from_structured_data)];

/// Run a chain top-down, returning the first non-empty result
pub fn run_chain(field: &str, chain: &[Heuristic], page: &StaticPage<'_>) -> Option<String> {
    for (name, heuristic) in chain {
        if let Some(value) = heuristic(page).filter(|v| !v.trim().is_empty()) {
            trace!("{} for {} resolved by {}", field, page.id, name);
            return Some(value);
        }
    }
    trace!("{} for {} unresolved", field, page.id);
    None
}

/// Extract every field from raw HTML.
///
/// Style and description come only from structured data at this tier and
/// read as an empty string when absent.
pub fn extract_fields(html: &str, id: &Identifier, settings: &ExtractorSettings) -> SongFields {
    let page = StaticPage::parse(html, id, settings);
    SongFields {
        title: run_chain("title", TITLE_CHAIN, &page),
        artist: run_chain("artist", ARTIST_CHAIN, &page),
        cover_url: run_chain("cover", COVER_CHAIN, &page),
        style: Some(run_chain("style", STYLE_CHAIN, &page).unwrap_or_default()),
        description: Some(run_chain("description", DESCRIPTION_CHAIN, &page).unwrap_or_default()),
    }
}

// ------------------------------------------------------------
// Heuristics
// ------------------------------------------------------------

fn title_from_structured_data(page: &StaticPage<'_>) -> Option<String> {
    page.song_field(&["title"])
        .or_else(|| page.structured.ld_name.clone())
        .map(|t| clean_text(&t))
}

fn title_from_og_title(page: &StaticPage<'_>) -> Option<String> {
    let title = clean_text(page.meta("og:title")?);
    Some(strip_site_suffix(&title, &page.settings.site_name))
}

fn cover_from_og_image(page: &StaticPage<'_>) -> Option<String> {
    page.meta("og:image").map(decode_html_entities).map(|s| s.trim().to_string())
}

fn artist_from_og_description(page: &StaticPage<'_>) -> Option<String> {
    let description = decode_html_entities(page.meta("og:description")?);
    capture_handle(&BY_HANDLE_REGEX, &description)
}

fn artist_from_profile_link(page: &StaticPage<'_>) -> Option<String> {
    capture_handle(&PROFILE_LINK_REGEX, page.html)
}

fn artist_from_document_by_handle(page: &StaticPage<'_>) -> Option<String> {
    capture_handle(&BY_HANDLE_REGEX, &decode_html_entities(page.html))
}

fn artist_from_creator_meta(page: &StaticPage<'_>) -> Option<String> {
    CREATOR_META_KEYS
        .iter()
        .filter_map(|key| page.meta(key))
        .map(|v| clean_text(v).trim_start_matches('@').to_string())
        .find(|v| !v.is_empty())
}

fn style_from_structured_data(page: &StaticPage<'_>) -> Option<String> {
    page.song_field(STYLE_KEYS).map(|s| clean_text(&s))
}

fn description_from_structured_data(page: &StaticPage<'_>) -> Option<String> {
    page.song_field(DESCRIPTION_KEYS)
        .map(|s| decode_html_entities(&s).trim().to_string())
}

// ------------------------------------------------------------
// Parsing helpers
// ------------------------------------------------------------

fn capture_handle(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', '-']).to_string())
        .filter(|h| !h.is_empty())
}

/// Drop a trailing `| Site`, `- Site` or `– Site`
pub fn strip_site_suffix(title: &str, site_name: &str) -> String {
    if site_name.is_empty() {
        return title.to_string();
    }
    for sep in ['|', '-', '\u{2013}', '\u{2014}'] {
        if let Some((head, tail)) = title.rsplit_once(sep) {
            if tail.trim().eq_ignore_ascii_case(site_name) && !head.trim().is_empty() {
                return head.trim().to_string();
            }
        }
    }
    title.to_string()
}

fn index_meta_tags(html: &str) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    for tag in META_TAG_REGEX.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for caps in ATTRIBUTE_REGEX.captures_iter(tag.as_str()) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string());
            match caps[1].to_ascii_lowercase().as_str() {
                "property" | "name" | "itemprop" => key = value.map(|v| v.to_ascii_lowercase()),
                "content" => content = value,
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            // first occurrence wins
            meta.entry(key).or_insert(content);
        }
    }
    meta
}

fn find_structured_data(html: &str, id: &Identifier) -> StructuredData {
    let mut data = StructuredData::default();
    let mut flight = String::new();

    for caps in SCRIPT_REGEX.captures_iter(html) {
        let attrs = caps[1].to_ascii_lowercase();
        let body = caps[2].trim();
        if body.is_empty() {
            continue;
        }

        if attrs.contains("application/ld+json") || attrs.contains("__next_data__") || attrs.contains("application/json") {
            match serde_json::from_str::<Value>(body) {
                Ok(value) => {
                    if data.ld_name.is_none() && attrs.contains("ld+json") {
                        data.ld_name = ld_json_name(&value);
                    }
                    if data.song.is_none() {
                        data.song = find_song_object(&value, id);
                    }
                }
                Err(e) => debug!("Skipping unparseable JSON block: {}", e),
            }
        } else if let Some(push) = FLIGHT_PUSH_REGEX.captures(body) {
            // Streaming payload: [tag, "escaped chunk"]
            if let Ok(Value::Array(parts)) = serde_json::from_str::<Value>(&push[1]) {
                if let Some(chunk) = parts.get(1).and_then(Value::as_str) {
                    flight.push_str(chunk);
                }
            }
        }
    }

    if data.song.is_none() && !flight.is_empty() {
        data.song = find_song_in_text(&flight, id);
    }
    data
}

fn ld_json_name(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(ld_json_name),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Depth-first search for an object whose `id` equals the identifier
fn find_song_object(value: &Value, id: &Identifier) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let matches_id = map
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case(id.as_str()));
            if matches_id && (map.contains_key("title") || map.contains_key("metadata")) {
                return Some(value.clone());
            }
            map.values().find_map(|v| find_song_object(v, id))
        }
        Value::Array(items) => items.iter().find_map(|v| find_song_object(v, id)),
        _ => None,
    }
}

/// Locate the song object inside non-JSON text (e.g. a streamed render
/// payload) by trying each `{` before an `"id":"<identifier>"` occurrence.
fn find_song_in_text(text: &str, id: &Identifier) -> Option<Value> {
    const MAX_BACKTRACK: usize = 16;
    let needle = format!("\"id\":\"{}\"", id.as_str());
    let lowered = text.to_ascii_lowercase();

    for (pos, _) in lowered.match_indices(&needle) {
        let starts = text[..pos].rmatch_indices('{').take(MAX_BACKTRACK);
        for (start, _) in starts {
            if let Some(object) = balanced_object(&text[start..]) {
                if let Ok(value) = serde_json::from_str::<Value>(object) {
                    if let Some(song) = find_song_object(&value, id) {
                        return Some(song);
                    }
                }
            }
        }
    }
    None
}

/// The balanced `{...}` prefix of `text`, honouring JSON string escapes
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Static-tier extractor: plain GET, then heuristic chains
pub struct StaticExtractor {
    fetcher: Arc<dyn PageFetcher>,
    settings: Arc<ExtractorSettings>,
}

impl StaticExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: Arc<ExtractorSettings>) -> Self {
        Self { fetcher, settings }
    }
}

#[async_trait]
impl SongExtractor for StaticExtractor {
    fn id(&self) -> &'static str {
        "static-html"
    }

    fn tier(&self) -> ExtractionTier {
        ExtractionTier::Static
    }

    async fn extract_song(&self, id: &Identifier) -> Result<SongRecord> {
        let url = self.settings.song_url(id.as_str());
        let html = self
            .fetcher
            .fetch(&url, self.settings.fetch_timeout())
            .await?;
        let fields = extract_fields(&html, id, &self.settings);
        debug!(
            "Static extraction for {}: title={:?} artist={:?}",
            id, fields.title, fields.artist
        );
        Ok(fields.into_record(id, ExtractionTier::Static, &self.settings))
    }
}
