//! Full rollup synchronization.

use std::path::Path;

use pressline_content::Extractor;
use pressline_shared::{PresslineError, Result, SiteContext, write_if_changed};
use pressline_vcs::HistorySource;
use tracing::{info, instrument, warn};

use crate::marker::{HOME_MARKER, INDEX_MARKER, Marker, MarkedDocument};
use crate::nav::sync_nav;
use crate::render::{home_cards, index_cards};
use crate::sitemap::render_sitemap;

/// What a synchronization changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub items: usize,
    pub nav_files_changed: usize,
    pub index_updated: bool,
    pub home_updated: bool,
    pub sitemap_written: bool,
}

impl SyncReport {
    pub fn changed_anything(&self) -> bool {
        self.nav_files_changed > 0 || self.index_updated || self.home_updated || self.sitemap_written
    }
}

/// Recompute every derived view from the content on disk.
///
/// Order: nav links, content scan, index region, home region, sitemap.
/// Unchanged files are not rewritten, so a second run is a no-op.
#[instrument(skip_all, fields(root = %ctx.root.display()))]
pub async fn synchronize(ctx: &SiteContext, history: &dyn HistorySource) -> Result<SyncReport> {
    let mut report = SyncReport {
        nav_files_changed: sync_nav(ctx)?,
        ..SyncReport::default()
    };

    let content_root = ctx.path(&ctx.site.content_dir);
    let items = Extractor::new(&ctx.site, history)
        .require_committed(ctx.history.require_committed)
        .extract_all(&content_root)
        .await?;
    if items.is_empty() {
        return Err(PresslineError::NoContent { root: content_root });
    }
    report.items = items.len();

    let index_path = ctx.path(&ctx.site.index_page);
    if index_path.is_file() {
        report.index_updated =
            rewrite_region(&index_path, &INDEX_MARKER, &index_cards(&items, &ctx.site))?;
    } else {
        warn!(path = %index_path.display(), "index page not found, skipping index rollup");
    }

    let home_path = ctx.path(&ctx.site.home_page);
    report.home_updated =
        rewrite_region(&home_path, &HOME_MARKER, &home_cards(&items, &ctx.site))?;

    let sitemap_path = ctx.path(&ctx.site.sitemap);
    report.sitemap_written = write_if_changed(&sitemap_path, &render_sitemap(ctx, &items))?;

    info!(
        items = report.items,
        nav = report.nav_files_changed,
        index = report.index_updated,
        home = report.home_updated,
        sitemap = report.sitemap_written,
        "rollups synchronized"
    );
    Ok(report)
}

/// Replace the marker region of `path` with `body`. Returns whether the
/// file changed.
fn rewrite_region(path: &Path, marker: &Marker, body: &str) -> Result<bool> {
    let text = std::fs::read_to_string(path).map_err(|e| PresslineError::io(path, e))?;
    let next = MarkedDocument::parse(&text, marker, path)?.fill(body);
    let changed = write_if_changed(path, &next)?;
    if changed {
        info!(path = %path.display(), "region updated");
    }
    Ok(changed)
}
