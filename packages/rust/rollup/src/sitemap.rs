//! Sitemap rendering.

use pressline_shared::{ContentItem, SiteContext};
use tracing::warn;

use crate::render::escape_html;

const ITEM_CHANGEFREQ: &str = "monthly";
const ITEM_PRIORITY: &str = "0.8";

struct Entry {
    loc: String,
    lastmod: String,
    changefreq: String,
    priority: String,
}

/// Full sitemap: configured static pages, then one entry per item in order.
pub fn render_sitemap(ctx: &SiteContext, items: &[ContentItem]) -> String {
    let today = ctx.today_str();

    let statics = ctx.site.static_pages.iter().map(|page| Entry {
        loc: absolute(ctx, &page.path),
        lastmod: today.clone(),
        changefreq: page.changefreq.clone(),
        priority: page.priority.clone(),
    });

    let articles = items.iter().map(|item| {
        let lastmod = [&item.modified_date, &item.published_date]
            .into_iter()
            .find(|d| !d.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| today.clone());
        Entry {
            loc: absolute(ctx, &ctx.site.item_href(&item.slug)),
            lastmod,
            changefreq: ITEM_CHANGEFREQ.into(),
            priority: ITEM_PRIORITY.into(),
        }
    });

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');
    for entry in statics.chain(articles) {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_html(&entry.loc)));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", escape_html(&entry.lastmod)));
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", entry.changefreq));
        xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn absolute(ctx: &SiteContext, path: &str) -> String {
    match ctx.base_url.join(path) {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!(path, error = %e, "could not resolve sitemap path against base_url");
            format!("{}{}", ctx.base_url.as_str().trim_end_matches('/'), path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;
    use pressline_shared::AppConfig;

    use super::*;

    fn ctx() -> SiteContext {
        let mut config = AppConfig::default();
        config.site.base_url = "https://coursework.example".into();
        SiteContext::new(
            &config,
            Path::new("/site"),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        )
        .unwrap()
    }

    fn item(slug: &str, published: &str, modified: &str) -> ContentItem {
        ContentItem {
            slug: slug.into(),
            title: slug.into(),
            description: String::new(),
            category: "Blog".into(),
            published_date: published.into(),
            modified_date: modified.into(),
            read_time: None,
            image_alt: String::new(),
            last_touched: 0,
            created: 0,
        }
    }

    #[test]
    fn static_pages_then_items() {
        let xml = render_sitemap(
            &ctx(),
            &[
                item("time-management", "2026-10-15", "2026-10-16"),
                item("exam-prep", "2026-10-01", ""),
                item("undated", "", ""),
            ],
        );

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset"));
        assert_eq!(xml.matches("<url>").count(), 6);

        let home = xml.find("<loc>https://coursework.example/</loc>").unwrap();
        let contact = xml.find("<loc>https://coursework.example/contact/</loc>").unwrap();
        let article = xml
            .find("<loc>https://coursework.example/content/time-management/</loc>\n    <lastmod>2026-10-16</lastmod>")
            .unwrap();
        assert!(home < contact && contact < article);

        assert!(xml.contains("<loc>https://coursework.example/content/exam-prep/</loc>\n    <lastmod>2026-10-01</lastmod>"));
        assert!(xml.contains("<loc>https://coursework.example/content/undated/</loc>\n    <lastmod>2026-10-17</lastmod>"));
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let items = [item("a", "2026-10-01", "")];
        assert_eq!(render_sitemap(&ctx(), &items), render_sitemap(&ctx(), &items));
    }
}
