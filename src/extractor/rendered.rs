//! Rendered-tier extraction from the live DOM
//!
//! Slower than the static tier but sees client-rendered content. The page
//! is navigated, given a bounded wait for the profile link to appear, then
//! its DOM snapshot is queried with CSS selectors from `RenderedSelectors`.

use crate::extractor::identifier::Identifier;
use crate::extractor::models::{ExtractionTier, SongFields, SongRecord};
use crate::extractor::static_fields::strip_site_suffix;
use crate::extractor::traits::SongExtractor;
use crate::render::{NavigateOptions, PageHandle, RenderEngine, RenderedPageSession};
use crate::utils::config::{ExtractorSettings, RenderedSelectors};
use crate::utils::entities::{clean_text, decode_html_entities};
use crate::utils::error::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// How many ancestors to climb from an expand/collapse control
const AFFORDANCE_CLIMB: usize = 3;
const MAX_DESCRIPTION_CHARS: usize = 5_000;
const MAX_STYLE_LINE_CHARS: usize = 200;

pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Ignoring invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn is_leaf(el: &ElementRef<'_>) -> bool {
    el.children().filter_map(ElementRef::wrap).next().is_none()
}

/// Handle from an anchor: its text without `@`, else the `/@handle` href
pub(crate) fn handle_from_anchor(el: &ElementRef<'_>) -> Option<String> {
    let text = element_text(el);
    let text = text.trim_start_matches('@').trim();
    if !text.is_empty() && !text.contains(' ') {
        return Some(text.to_string());
    }
    el.value()
        .attr("href")
        .and_then(|href| href.split("/@").nth(1))
        .map(|h| h.split(['/', '?', '#']).next().unwrap_or(h).to_string())
        .filter(|h| !h.is_empty())
        .or_else(|| (!text.is_empty()).then(|| text.to_string()))
}

/// Count configured keywords in `text`; single words must match whole tokens
pub fn keyword_hits(text: &str, keywords: &[String]) -> usize {
    let lower = text.to_lowercase();
    let tokens: HashSet<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '&' || c == '-'))
        .filter(|t| !t.is_empty())
        .collect();
    keywords
        .iter()
        .filter(|kw| {
            let kw = kw.to_lowercase();
            if kw.contains(' ') {
                lower.contains(&kw)
            } else {
                tokens.contains(kw.as_str())
            }
        })
        .count()
}

fn artist_from_dom(doc: &Html, selectors: &RenderedSelectors) -> Option<String> {
    let sel = selector(&selectors.profile_link)?;
    doc.select(&sel).find_map(|el| handle_from_anchor(&el))
}

fn title_from_dom(doc: &Html, settings: &ExtractorSettings) -> Option<String> {
    settings
        .selectors
        .title
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| {
            doc.select(&sel).find_map(|el| {
                let text = match el.value().attr("content") {
                    Some(content) => clean_text(content),
                    None => element_text(&el),
                };
                (!text.is_empty()).then(|| strip_site_suffix(&text, &settings.site_name))
            })
        })
}

fn cover_from_dom(doc: &Html, id: &Identifier) -> Option<String> {
    let og = selector(r#"meta[property="og:image"]"#)?;
    if let Some(url) = doc
        .select(&og)
        .find_map(|el| el.value().attr("content"))
        .map(|c| decode_html_entities(c).trim().to_string())
        .filter(|c| !c.is_empty())
    {
        return Some(url);
    }
    let img = selector(&format!(r#"img[src*="{}"]"#, id.as_str()))?;
    doc.select(&img)
        .find_map(|el| el.value().attr("src"))
        .map(|s| decode_html_entities(s))
}

/// Text sitting next to a "show more"/"show less" style control
fn description_from_dom(doc: &Html, selectors: &RenderedSelectors) -> Option<String> {
    let controls = selector("button, [role=button], span, a")?;
    let keywords: Vec<String> = selectors
        .expand_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();

    let mut best: Option<String> = None;
    for control in doc.select(&controls) {
        let label = element_text(&control);
        let normalized = label
            .trim_end_matches(['.', '\u{2026}'])
            .trim()
            .to_lowercase();
        if !keywords.contains(&normalized) {
            continue;
        }

        let mut node = control;
        for _ in 0..AFFORDANCE_CLIMB {
            let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                break;
            };
            let full = element_text(&parent);
            let remainder = clean_text(&full.replacen(&label, " ", 1));
            if !remainder.is_empty() {
                if remainder.chars().count() <= MAX_DESCRIPTION_CHARS
                    && best.as_ref().map_or(true, |b| remainder.len() > b.len())
                {
                    best = Some(remainder);
                }
                break;
            }
            node = parent;
        }
    }
    best
}

fn style_from_dom(doc: &Html, selectors: &RenderedSelectors) -> Option<String> {
    // 1. anchors into style pages
    if let Some(sel) = selector(&selectors.style_link) {
        let mut seen = HashSet::new();
        let tags: Vec<String> = doc
            .select(&sel)
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .collect();
        if !tags.is_empty() {
            return Some(tags.join(", "));
        }
    }

    // 2. a labeled container ("Styles: ...")
    let labels: Vec<String> = selectors
        .style_labels
        .iter()
        .map(|l| l.to_lowercase())
        .collect();
    let candidates = selector("div, span, p, h2, h3, h4, dt, label")?;
    for el in doc.select(&candidates) {
        if !is_leaf(&el) {
            continue;
        }
        let text = element_text(&el);
        let label = text.trim_end_matches(':').trim().to_lowercase();
        if !labels.contains(&label) {
            continue;
        }
        let sibling = el
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(|s| element_text(&s))
            .find(|t| !t.is_empty());
        if let Some(style) = sibling {
            return Some(style);
        }
    }

    // 3. a short leaf line dense with genre words
    let lines = selector("span, div, p, a")?;
    doc.select(&lines)
        .filter(is_leaf)
        .map(|el| element_text(&el))
        .filter(|t| (3..=MAX_STYLE_LINE_CHARS).contains(&t.chars().count()))
        .find(|t| keyword_hits(t, &selectors.genre_keywords) >= 2)
}

/// Query every field from a rendered DOM snapshot
pub fn fields_from_dom(html: &str, id: &Identifier, settings: &ExtractorSettings) -> SongFields {
    let doc = Html::parse_document(html);
    SongFields {
        title: title_from_dom(&doc, settings),
        artist: artist_from_dom(&doc, &settings.selectors),
        cover_url: cover_from_dom(&doc, id),
        style: style_from_dom(&doc, &settings.selectors),
        description: description_from_dom(&doc, &settings.selectors),
    }
}

/// Drive an open page to a song and extract it
pub async fn extract_on_page(
    page: &PageHandle,
    id: &Identifier,
    settings: &ExtractorSettings,
) -> Result<SongRecord> {
    let url = settings.song_url(id.as_str());
    page.navigate(&url, NavigateOptions::dom_ready(settings.navigation_timeout()))
        .await?;

    if !page
        .wait_for_selector(&settings.selectors.profile_link, settings.readiness_timeout())
        .await
    {
        debug!("Readiness signal never appeared for {}, extracting anyway", id);
    }

    let html = page.content().await?;
    let fields = fields_from_dom(&html, id, settings);
    debug!(
        "Rendered extraction for {}: title={:?} artist={:?}",
        id, fields.title, fields.artist
    );
    Ok(fields.into_record(id, ExtractionTier::Rendered, settings))
}

/// Open a page in `session`, extract, and close the page on every path
pub async fn extract_in_session(
    session: &RenderedPageSession,
    id: &Identifier,
    settings: &ExtractorSettings,
) -> Result<SongRecord> {
    let mut page = session.new_page().await?;
    let outcome = extract_on_page(&page, id, settings).await;
    if let Err(e) = page.close().await {
        warn!("Failed to close page for {}: {}", id, e);
    }
    outcome
}

/// Rendered-tier extractor owning one session per call
pub struct RenderedExtractor {
    engine: Arc<dyn RenderEngine>,
    settings: Arc<ExtractorSettings>,
}

impl RenderedExtractor {
    pub fn new(engine: Arc<dyn RenderEngine>, settings: Arc<ExtractorSettings>) -> Self {
        Self { engine, settings }
    }
}

#[async_trait]
impl SongExtractor for RenderedExtractor {
    fn id(&self) -> &'static str {
        "rendered-dom"
    }

    fn tier(&self) -> ExtractionTier {
        ExtractionTier::Rendered
    }

    async fn extract_song(&self, id: &Identifier) -> Result<SongRecord> {
        let mut session =
            RenderedPageSession::open(self.engine.as_ref(), Arc::clone(&self.settings)).await?;
        let outcome = extract_in_session(&session, id, &self.settings).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session after {}: {}", id, e);
        }
        outcome
    }
}
