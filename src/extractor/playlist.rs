//! Playlist enumeration through a rendered page
//!
//! Members are lazy-loaded as the page scrolls, so the enumerator scrolls
//! until the document stops growing (or a wall-clock ceiling passes) before
//! reading member anchors from the DOM.

use crate::extractor::identifier::{self, parse_playlist_reference, Identifier};
use crate::extractor::models::PlaylistRecord;
use crate::extractor::rendered::{element_text, handle_from_anchor, selector};
use crate::render::{NavigateOptions, PageHandle, RenderEngine, RenderedPageSession};
use crate::utils::config::ExtractorSettings;
use crate::utils::error::Result;
use scraper::Html;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Scroll one viewport and report where we are
const SCROLL_STEP_SCRIPT: &str = r#"(() => {
    const el = document.scrollingElement || document.documentElement;
    window.scrollBy(0, window.innerHeight);
    return {
        position: Math.ceil(window.scrollY + window.innerHeight),
        extent: el.scrollHeight
    };
})()"#;

#[derive(Debug, Deserialize)]
struct ScrollState {
    position: f64,
    extent: f64,
}

/// Discovers a playlist's members and summary fields
pub struct PlaylistEnumerator {
    engine: Arc<dyn RenderEngine>,
    settings: Arc<ExtractorSettings>,
}

impl PlaylistEnumerator {
    pub fn new(engine: Arc<dyn RenderEngine>, settings: Arc<ExtractorSettings>) -> Self {
        Self { engine, settings }
    }

    /// Enumerate a playlist from a bare identifier or playlist URL.
    ///
    /// A malformed reference fails with `InvalidReference` before the
    /// engine is launched.
    pub async fn enumerate(&self, reference: &str) -> Result<PlaylistRecord> {
        let playlist_id = parse_playlist_reference(reference, &self.settings)?;
        info!("Enumerating playlist {}", playlist_id);

        let mut session =
            RenderedPageSession::open(self.engine.as_ref(), Arc::clone(&self.settings)).await?;
        let outcome = self.enumerate_in_session(&session, &playlist_id).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session for playlist {}: {}", playlist_id, e);
        }
        outcome
    }

    async fn enumerate_in_session(
        &self,
        session: &RenderedPageSession,
        playlist_id: &Identifier,
    ) -> Result<PlaylistRecord> {
        let mut page = session.new_page().await?;
        let outcome = self.enumerate_on_page(&page, playlist_id).await;
        if let Err(e) = page.close().await {
            warn!("Failed to close playlist page {}: {}", playlist_id, e);
        }
        outcome
    }

    async fn enumerate_on_page(
        &self,
        page: &PageHandle,
        playlist_id: &Identifier,
    ) -> Result<PlaylistRecord> {
        let url = self.settings.playlist_url(playlist_id.as_str());
        page.navigate(
            &url,
            NavigateOptions::network_idle(
                self.settings.navigation_timeout(),
                self.settings.network_idle_budget(),
            ),
        )
        .await?;

        scroll_to_end(page, &self.settings).await;

        let html = page.content().await?;
        let record = playlist_from_dom(&html, playlist_id, &self.settings);
        info!(
            "Playlist {} has {} members",
            playlist_id,
            record.members.len()
        );
        Ok(record)
    }
}

/// Scroll until the extent is reached and stable, or the ceiling passes
async fn scroll_to_end(page: &PageHandle, settings: &ExtractorSettings) {
    let deadline = Instant::now() + settings.scroll_ceiling();
    let mut last_extent: Option<f64> = None;
    let mut steps = 0usize;

    loop {
        if Instant::now() >= deadline {
            debug!("Scroll ceiling reached after {} steps", steps);
            break;
        }
        match page.evaluate::<ScrollState>(SCROLL_STEP_SCRIPT).await {
            Ok(state) => {
                steps += 1;
                let at_end = state.position >= state.extent;
                if at_end && last_extent == Some(state.extent) {
                    debug!("Reached full scroll extent after {} steps", steps);
                    break;
                }
                last_extent = Some(state.extent);
            }
            Err(e) => {
                warn!("Scroll step failed, reading what has loaded: {}", e);
                break;
            }
        }
        tokio::time::sleep(settings.scroll_step_delay()).await;
    }
}

/// Build the playlist record from a rendered DOM snapshot
pub fn playlist_from_dom(
    html: &str,
    playlist_id: &Identifier,
    settings: &ExtractorSettings,
) -> PlaylistRecord {
    let doc = Html::parse_document(html);
    let selectors = &settings.selectors;

    let first_text = |css: &str| {
        selector(css).and_then(|sel| {
            doc.select(&sel)
                .map(|el| element_text(&el))
                .find(|t| !t.is_empty())
        })
    };

    let title = first_text(&selectors.playlist_title)
        .unwrap_or_else(|| settings.untitled_playlist.clone());
    let description = first_text(&selectors.playlist_description);
    let creator_handle = selector(&selectors.profile_link)
        .and_then(|sel| doc.select(&sel).find_map(|el| handle_from_anchor(&el)));

    let mut members = members_from_anchors(&doc, playlist_id, &selectors.member_anchor);
    if members.is_empty() {
        debug!("No member anchors for {}, scanning body text", playlist_id);
        let body = selector("body")
            .and_then(|sel| doc.select(&sel).next().map(|b| b.html()))
            .unwrap_or_else(|| html.to_string());
        members = members_from_text(&body, playlist_id);
    }

    PlaylistRecord {
        id: playlist_id.clone(),
        title,
        description,
        creator_handle,
        members,
    }
}

/// Identifiers referenced by member anchors, in document order
pub fn members_from_anchors(doc: &Html, playlist_id: &Identifier, anchor_css: &str) -> Vec<Identifier> {
    let Some(sel) = selector(anchor_css) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| identifier::find_all(href).into_iter().next())
        .filter(|id| id != playlist_id && seen.insert(id.clone()))
        .collect()
}

/// Every distinct identifier-shaped token in `text` except the playlist's own
pub fn members_from_text(text: &str, playlist_id: &Identifier) -> Vec<Identifier> {
    identifier::find_all(text)
        .into_iter()
        .filter(|id| id != playlist_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST: &str = "11111111-2222-4333-8444-555555555555";
    const A: &str = "aaaaaaaa-0000-4000-8000-000000000001";
    const B: &str = "bbbbbbbb-0000-4000-8000-000000000002";
    const C: &str = "cccccccc-0000-4000-8000-000000000003";

    fn playlist_id() -> Identifier {
        Identifier::parse(PLAYLIST).unwrap()
    }

    #[test]
    fn test_anchor_members_dedup_and_exclude_self() {
        let html = format!(
            r#"<html><body>
            <h1>Night Drives</h1>
            <div class="line-clamp-2">Songs for the road</div>
            <a href="/@curator">curator</a>
            <a href="/playlist/{PLAYLIST}">self</a>
            <a href="/song/{A}">a</a>
            <a href="/song/{B}">b</a>
            <a href="/song/{}">a again</a>
            <a href="/song/{PLAYLIST}">self as song</a>
            </body></html>"#,
            A.to_uppercase()
        );
        let record = playlist_from_dom(&html, &playlist_id(), &ExtractorSettings::default());
        assert_eq!(record.title, "Night Drives");
        assert_eq!(record.description.as_deref(), Some("Songs for the road"));
        assert_eq!(record.creator_handle.as_deref(), Some("curator"));
        let members: Vec<&str> = record.members.iter().map(|m| m.as_str()).collect();
        assert_eq!(members, vec![A, B]);
    }

    #[test]
    fn test_text_fallback_when_no_anchors() {
        let html = format!(
            r#"<html><body><div data-x="{A}"></div><p>{PLAYLIST}</p>
            <script>var ids = ["{B}", "{C}", "{A}"];</script></body></html>"#
        );
        let record = playlist_from_dom(&html, &playlist_id(), &ExtractorSettings::default());
        let members: Vec<&str> = record.members.iter().map(|m| m.as_str()).collect();
        assert_eq!(members, vec![A, B, C]);
        assert_eq!(record.title, "Untitled Playlist");
        assert_eq!(record.creator_handle, None);
    }

    #[test]
    fn test_text_fallback_reads_ids_inside_words() {
        let html = format!(
            r#"<html><body><img src="https://cdn2.suno.ai/image_{A}.jpeg"><div>x{A}</div></body></html>"#
        );
        let record = playlist_from_dom(&html, &playlist_id(), &ExtractorSettings::default());
        let members: Vec<&str> = record.members.iter().map(|m| m.as_str()).collect();
        assert_eq!(members, vec![A]);

        let members = members_from_text(&format!("image_{B}.jpeg"), &playlist_id());
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].as_str(), B);
    }

    #[test]
    fn test_empty_page() {
        let record = playlist_from_dom("", &playlist_id(), &ExtractorSettings::default());
        assert!(record.members.is_empty());
        assert_eq!(record.description, None);
    }
}
