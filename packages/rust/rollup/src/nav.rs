//! Header menu link injection across site pages.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pressline_shared::{NavLink, PresslineError, Result, SiteContext, write_if_changed};
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::render::escape_html;

/// A header menu flavor: the `<ul>` class and its links' class.
#[derive(Debug, Clone, Copy)]
pub struct Menu {
    pub list_class: &'static str,
    pub link_class: &'static str,
}

pub const DESKTOP_MENU: Menu = Menu {
    list_class: "header__menu",
    link_class: "header__link",
};

pub const MOBILE_MENU: Menu = Menu {
    list_class: "header__mobile-menu-list",
    link_class: "header__mobile-link",
};

const DEFAULT_INDENT: &str = "  ";

/// Ensure `link` is in the first `menu` list of `html`.
///
/// Returns `None` when nothing changes: no such menu, the link is already
/// there, or its `after` anchor is absent.
pub fn ensure_link(html: &str, menu: &Menu, link: &NavLink) -> Option<String> {
    let open = format!(r#"<ul class="{}">"#, menu.list_class);
    let start = html.find(&open)?;
    let close = start + html[start..].find("</ul>")?;
    let list = &html[start..close];

    let href = escape_html(&link.href);
    if has_href(list, &href) || has_href(list, &link.href) {
        return None;
    }

    let indent = item_indent(list);
    let item = format!(
        r#"{indent}<li><a href="{href}" class="{}">{}</a></li>"#,
        menu.link_class,
        escape_html(&link.label)
    );

    let insert_at = match &link.after {
        Some(anchor) => {
            let re = Regex::new(&format!(
                r#"<li><a href="(?:{}|{})" class="{}(?:\s+active)?">[^<]*</a></li>"#,
                regex::escape(&escape_html(anchor)),
                regex::escape(anchor),
                regex::escape(menu.link_class)
            ))
            .ok()?;
            start + re.find(list)?.end()
        }
        // Before the whitespace that precedes `</ul>`.
        None => start + list.trim_end().len(),
    };

    let mut out = String::with_capacity(html.len() + item.len() + 1);
    out.push_str(&html[..insert_at]);
    out.push('\n');
    out.push_str(&item);
    out.push_str(&html[insert_at..]);
    Some(out)
}

fn has_href(list: &str, href: &str) -> bool {
    list.contains(&format!(r#"href="{href}""#))
}

/// Indentation of the last `<li>` in a list.
fn item_indent(list: &str) -> &str {
    list.rfind("<li")
        .and_then(|li| {
            let line_start = list[..li].rfind('\n')? + 1;
            let indent = &list[line_start..li];
            indent
                .chars()
                .all(|c| c == ' ' || c == '\t')
                .then_some(indent)
        })
        .unwrap_or(DEFAULT_INDENT)
}

/// Apply every link to both menus.
pub fn apply_links(html: &str, links: &[NavLink]) -> String {
    let mut current = html.to_string();
    for menu in [DESKTOP_MENU, MOBILE_MENU] {
        for link in links {
            if let Some(next) = ensure_link(&current, &menu, link) {
                current = next;
            }
        }
    }
    current
}

/// Pages whose menus are kept in sync, relative to the site root.
fn nav_pages(ctx: &SiteContext) -> Result<Vec<PathBuf>> {
    let site = &ctx.site;
    let mut pages: BTreeSet<PathBuf> = BTreeSet::new();
    pages.insert(PathBuf::from(&site.home_page));
    pages.insert(PathBuf::from(&site.index_page));
    pages.extend(ctx.nav.pages.iter().map(PathBuf::from));

    let mut dirs: BTreeSet<&str> = site.content_types.iter().map(|t| t.dir.as_str()).collect();
    dirs.insert(site.content_dir.as_str());
    for dir in dirs {
        pages.extend(artifacts_under(&ctx.root, Path::new(dir), &site.artifact_file)?);
    }

    Ok(pages
        .into_iter()
        .filter(|p| ctx.root.join(p).is_file())
        .collect())
}

fn artifacts_under(root: &Path, dir: &Path, artifact: &str) -> Result<Vec<PathBuf>> {
    let abs = root.join(dir);
    let entries = match std::fs::read_dir(&abs) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PresslineError::io(&abs, e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PresslineError::io(&abs, e))?;
        if entry.path().is_dir() {
            found.push(dir.join(entry.file_name()).join(artifact));
        }
    }
    Ok(found)
}

/// Inject configured nav links into every page. Returns the number of files
/// rewritten.
#[instrument(skip_all, fields(links = ctx.nav.links.len()))]
pub fn sync_nav(ctx: &SiteContext) -> Result<usize> {
    if ctx.nav.links.is_empty() {
        debug!("no nav links configured");
        return Ok(0);
    }

    let pages = nav_pages(ctx)?;
    let mut changed = 0;
    for rel in &pages {
        let path = ctx.root.join(rel);
        let before = std::fs::read_to_string(&path).map_err(|e| PresslineError::io(&path, e))?;
        let after = apply_links(&before, &ctx.nav.links);
        if after != before && write_if_changed(&path, &after)? {
            changed += 1;
            info!(page = %rel.display(), "nav updated");
        }
    }

    info!(changed, pages = pages.len(), "nav sync done");
    Ok(changed)
}
