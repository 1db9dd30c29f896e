//! Card markup for the index and homepage regions.

use chrono::NaiveDate;
use pressline_shared::{ContentItem, SiteConfig};

/// The homepage shows this many latest items.
pub const HOME_LIMIT: usize = 3;

/// Excerpt length on index cards.
pub const INDEX_EXCERPT_CHARS: usize = 165;

/// Excerpt length on homepage cards.
pub const HOME_EXCERPT_CHARS: usize = 120;

const CLOCK_SVG: &str = r#"<svg width="14" height="14" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><circle cx="12" cy="12" r="10"/><polyline points="12 6 12 12 16 14"/></svg>"#;

/// Escape `& < > " '` for HTML text and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse whitespace and cut to at most `max` characters at a word
/// boundary, appending `…` when anything was dropped.
///
/// A first word longer than `max` has no boundary to cut at, so it is
/// hard-cut at `max` characters.
pub fn clamp_text(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }

    let cut = collapsed
        .char_indices()
        .nth(max)
        .map_or(collapsed.len(), |(i, _)| i);
    let (head, rest) = collapsed.split_at(cut);

    let clipped = if rest.starts_with(' ') {
        head
    } else {
        // Drop the partial trailing word.
        match head.rfind(' ') {
            Some(space) => &head[..space],
            None => head,
        }
    };
    format!("{}…", clipped.trim_end())
}

/// `2026-10-15` (or a datetime starting with it) → `Oct 15, 2026`.
pub fn date_short(date: &str) -> String {
    date.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_default()
}

fn read_label(item: &ContentItem) -> String {
    item.read_time
        .map(|m| format!("{m} min read"))
        .unwrap_or_default()
}

/// Cards for the paginated index: every item, in the given order.
pub fn index_cards(items: &[ContentItem], site: &SiteConfig) -> String {
    items
        .iter()
        .map(|item| {
            let href = site.item_href(&item.slug);
            let excerpt = clamp_text(&item.description, INDEX_EXCERPT_CHARS);
            [
                r#"          <article class="blog-card">"#.to_string(),
                format!(r#"            <a href="{href}" class="blog-card__image-link">"#),
                format!(
                    r#"              <img src="{}" alt="{}" class="blog-card__image" width="600" height="315" loading="lazy">"#,
                    escape_html(&site.cover_src(&item.slug)),
                    escape_html(&item.image_alt)
                ),
                "            </a>".to_string(),
                r#"            <div class="blog-card__content">"#.to_string(),
                format!(
                    r#"              <span class="blog-card__category">{}</span>"#,
                    escape_html(&item.category)
                ),
                format!(
                    r#"              <h2 class="blog-card__title"><a href="{href}">{}</a></h2>"#,
                    escape_html(&item.title)
                ),
                format!(
                    r#"              <p class="blog-card__excerpt">{}</p>"#,
                    escape_html(&excerpt)
                ),
                r#"              <div class="blog-card__meta">"#.to_string(),
                format!(
                    "                <span>{}</span>",
                    escape_html(&date_short(&item.published_date))
                ),
                r#"                <span class="blog-card__read-time">"#.to_string(),
                format!("                  {CLOCK_SVG}"),
                format!("                  {}", escape_html(&read_label(item))),
                "                </span>".to_string(),
                "              </div>".to_string(),
                "            </div>".to_string(),
                "          </article>".to_string(),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cards for the homepage: the first [`HOME_LIMIT`] items.
pub fn home_cards(items: &[ContentItem], site: &SiteConfig) -> String {
    items
        .iter()
        .take(HOME_LIMIT)
        .map(|item| {
            let href = site.item_href(&item.slug);
            let excerpt = clamp_text(&item.description, HOME_EXCERPT_CHARS);
            [
                r#"          <article class="blog-section__card">"#.to_string(),
                format!(r#"            <a href="{href}" class="blog-section__card-image-link">"#),
                format!(
                    r#"              <img src="{}" alt="{}" class="blog-section__card-img" width="600" height="315" loading="lazy">"#,
                    escape_html(&site.cover_src(&item.slug)),
                    escape_html(&item.image_alt)
                ),
                "            </a>".to_string(),
                r#"            <div class="blog-section__card-content">"#.to_string(),
                format!(
                    r#"              <span class="blog-section__card-category">{}</span>"#,
                    escape_html(&item.category)
                ),
                r#"              <h3 class="blog-section__card-title">"#.to_string(),
                format!(
                    r#"                <a href="{href}">{}</a>"#,
                    escape_html(&item.title)
                ),
                "              </h3>".to_string(),
                format!(
                    r#"              <p class="blog-section__card-excerpt">{}</p>"#,
                    escape_html(&excerpt)
                ),
                r#"              <div class="blog-section__card-meta">"#.to_string(),
                format!("                <span>{}</span>", escape_html(&read_label(item))),
                "              </div>".to_string(),
                "            </div>".to_string(),
                "          </article>".to_string(),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(slug: &str, published: &str) -> ContentItem {
        ContentItem {
            slug: slug.into(),
            title: format!("Title <{slug}>"),
            description: "Short description.".into(),
            category: "Study & Skills".into(),
            published_date: published.into(),
            modified_date: published.into(),
            read_time: Some(6),
            image_alt: "Alt \"quoted\"".into(),
            last_touched: 0,
            created: 0,
        }
    }

    #[test]
    fn escapes_all_five_characters() {
        assert_eq!(escape_html(r#"<a href="x">Tom & Jerry's</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;");
    }

    #[test]
    fn clamp_keeps_short_text() {
        assert_eq!(clamp_text("  hello \n  world  ", 20), "hello world");
    }

    #[test]
    fn clamp_cuts_at_word_boundaries() {
        assert_eq!(clamp_text("alpha beta gamma delta", 13), "alpha beta…");
        assert_eq!(clamp_text("alpha beta gamma delta", 10), "alpha beta…");
        assert_eq!(clamp_text("alpha supercalifragilistic", 12), "alpha…");
    }

    #[test]
    fn clamp_hard_cuts_an_overlong_first_word() {
        assert_eq!(clamp_text("supercalifragilistic", 5), "super…");
        assert_eq!(clamp_text("supercalifragilistic rest", 5), "super…");
    }

    #[test]
    fn clamp_counts_characters_not_bytes() {
        assert_eq!(clamp_text("été été été", 7), "été été…");
    }

    #[test]
    fn short_dates() {
        assert_eq!(date_short("2026-10-05"), "Oct 5, 2026");
        assert_eq!(date_short("2026-01-15T09:30:00Z"), "Jan 15, 2026");
        assert_eq!(date_short(""), "");
        assert_eq!(date_short("someday"), "");
    }

    #[test]
    fn index_card_markup() {
        let site = SiteConfig::default();
        let html = index_cards(&[item("time-management", "2026-10-15")], &site);

        assert!(html.starts_with(r#"          <article class="blog-card">"#));
        assert!(html.contains(r#"<a href="/content/time-management/" class="blog-card__image-link">"#));
        assert!(html.contains(r#"src="/images/content/time-management-cover.webp" alt="Alt &quot;quoted&quot;""#));
        assert!(html.contains("Title &lt;time-management&gt;"));
        assert!(html.contains("Study &amp; Skills"));
        assert!(html.contains("<span>Oct 15, 2026</span>"));
        assert!(html.contains("                  6 min read"));
        assert!(html.ends_with("          </article>"));
    }

    #[test]
    fn home_cards_cap_at_three() {
        let site = SiteConfig::default();
        let items: Vec<_> = ["a", "b", "c", "d"].iter().map(|s| item(s, "2026-10-01")).collect();

        let html = home_cards(&items, &site);
        assert_eq!(html.matches("<article").count(), 3);
        assert!(!html.contains("/content/d/"));

        let html = home_cards(&items[..2], &site);
        assert_eq!(html.matches("<article").count(), 2);
    }
}
