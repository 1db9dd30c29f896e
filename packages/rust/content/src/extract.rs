//! Per-artifact metadata extraction and the content-root scan.

use std::path::Path;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use pressline_shared::{ContentItem, PresslineError, Result, SiteConfig, sort_by_recency};
use pressline_vcs::HistorySource;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

/// First `N min read` anywhere in the raw document.
static READ_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*min read").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Single document
// ---------------------------------------------------------------------------

/// Extract metadata from one artifact. Timestamps are left at zero.
pub fn extract_metadata(slug: &str, html: &str, site: &SiteConfig) -> ContentItem {
    let doc = Html::parse_document(html);

    let title = site
        .title_selectors
        .iter()
        .find_map(|sel| first_text(&doc, sel))
        .or_else(|| meta(&doc, "property", "og:title"))
        .or_else(|| first_text(&doc, "title").map(|t| strip_site_suffix(&t, &site.name)))
        .unwrap_or_default();

    let description = meta(&doc, "name", "description")
        .or_else(|| meta(&doc, "property", "og:description"))
        .unwrap_or_default();

    let category = meta(&doc, "property", "article:section")
        .unwrap_or_else(|| site.default_category.clone());

    let published_date = meta(&doc, "property", "article:published_time").unwrap_or_default();
    let modified_date = meta(&doc, "property", "article:modified_time")
        .unwrap_or_else(|| published_date.clone());

    let read_time = READ_TIME_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let image_alt = cover_alt(&doc, &site.cover_src(slug))
        .or_else(|| meta(&doc, "property", "og:image:alt"))
        .unwrap_or_else(|| format!("{title} cover image"));

    debug!(slug, %title, %published_date, ?read_time, "extracted metadata");

    ContentItem {
        slug: slug.to_string(),
        title,
        description,
        category,
        published_date,
        modified_date,
        read_time,
        image_alt,
        last_touched: 0,
        created: 0,
    }
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Whitespace-collapsed text of the first element matching `selector`.
fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let Ok(sel) = Selector::parse(selector) else {
        warn!(selector, "invalid selector, ignoring");
        return None;
    };
    let el = doc.select(&sel).next()?;
    let text: String = el.text().collect();
    non_empty(WHITESPACE_RE.replace_all(&text, " ").into_owned())
}

/// `content` of `<meta {attr}="{value}">`.
fn meta(doc: &Html, attr: &str, value: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[{attr}="{value}"]"#)).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .find_map(|c| non_empty(c.to_string()))
}

/// `alt` of the first image whose `src` is exactly the slug's cover path.
fn cover_alt(doc: &Html, src: &str) -> Option<String> {
    let sel = Selector::parse("img[src]").ok()?;
    doc.select(&sel)
        .filter(|el| el.value().attr("src") == Some(src))
        .find_map(|el| el.value().attr("alt").and_then(|a| non_empty(a.to_string())))
}

/// Drop a trailing `| <site name>` from a `<title>`.
fn strip_site_suffix(title: &str, site_name: &str) -> String {
    let name = site_name.trim();
    if name.is_empty() {
        return title.to_string();
    }
    let Some((head, tail)) = title.rsplit_once('|') else {
        return title.to_string();
    };
    if tail.trim().eq_ignore_ascii_case(name) {
        head.trim_end().to_string()
    } else {
        title.to_string()
    }
}

// ---------------------------------------------------------------------------
// Content root scan
// ---------------------------------------------------------------------------

/// Scans a content root and attaches history timestamps.
pub struct Extractor<'a> {
    site: &'a SiteConfig,
    history: &'a dyn HistorySource,
    require_committed: bool,
}

impl<'a> Extractor<'a> {
    pub fn new(site: &'a SiteConfig, history: &'a dyn HistorySource) -> Self {
        Self {
            site,
            history,
            require_committed: false,
        }
    }

    /// Skip artifacts that have never been committed instead of falling back
    /// to filesystem times.
    pub fn require_committed(mut self, yes: bool) -> Self {
        self.require_committed = yes;
        self
    }

    /// One item per `<content_root>/<slug>/<artifact>`, in recency order.
    /// A missing content root yields no items.
    #[instrument(skip_all, fields(root = %content_root.display()))]
    pub async fn extract_all(&self, content_root: &Path) -> Result<Vec<ContentItem>> {
        let mut entries = match tokio::fs::read_dir(content_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("content root does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PresslineError::io(content_root, e)),
        };

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PresslineError::io(content_root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| PresslineError::io(entry.path(), e))?
                .is_dir();
            if !is_dir {
                continue;
            }

            let slug = entry.file_name().to_string_lossy().to_string();
            let artifact = entry.path().join(&self.site.artifact_file);
            if !artifact.is_file() {
                debug!(%slug, "no artifact file, skipping directory");
                continue;
            }

            if let Some(item) = self.extract_one(&slug, &artifact).await? {
                items.push(item);
            }
        }

        sort_by_recency(&mut items);
        info!(items = items.len(), "content items extracted");
        Ok(items)
    }

    async fn extract_one(&self, slug: &str, artifact: &Path) -> Result<Option<ContentItem>> {
        let last_commit = self.history.last_commit_time(artifact).await;
        if self.require_committed && last_commit.is_none() {
            info!(slug, "artifact has no commits yet, excluded");
            return Ok(None);
        }

        let bytes = tokio::fs::read(artifact)
            .await
            .map_err(|e| PresslineError::io(artifact, e))?;
        let html = match String::from_utf8(bytes) {
            Ok(html) => html,
            Err(e) => {
                warn!(slug, "artifact is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let meta = tokio::fs::metadata(artifact)
            .await
            .map_err(|e| PresslineError::io(artifact, e))?;

        let modified = meta.modified().ok().map(unix_secs).unwrap_or(0);
        let born = meta.created().ok().map(unix_secs).unwrap_or(modified);

        let mut item = extract_metadata(slug, &html, self.site);
        item.last_touched = last_commit.unwrap_or(modified);
        item.created = self
            .history
            .first_added_time(artifact)
            .await
            .unwrap_or(born);

        Ok(Some(item))
    }
}

fn unix_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
