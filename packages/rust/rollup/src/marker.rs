//! Documents with one generated region between two marker comments.

use std::path::Path;

use pressline_shared::{PresslineError, Result};

/// Start/end comment pair delimiting a generated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub start: &'static str,
    pub end: &'static str,
}

/// Region holding every content card on the paginated index.
pub const INDEX_MARKER: Marker = Marker {
    start: "<!-- BLOG_INDEX_CARDS:START -->",
    end: "<!-- BLOG_INDEX_CARDS:END -->",
};

/// Region holding the latest cards on the homepage.
pub const HOME_MARKER: Marker = Marker {
    start: "<!-- HOME_BLOG_CARDS:START -->",
    end: "<!-- HOME_BLOG_CARDS:END -->",
};

/// A document split around its marker region.
///
/// `before` ends with the start marker. `after` begins at the start of the
/// end marker's line when only indentation precedes it on that line, so the
/// marker keeps its indentation across rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkedDocument<'a> {
    before: &'a str,
    after: &'a str,
}

impl<'a> MarkedDocument<'a> {
    /// Locate `marker` in `text`. `document` is only used for errors.
    pub fn parse(text: &'a str, marker: &Marker, document: &Path) -> Result<Self> {
        let missing = |what: String| PresslineError::MarkerMissing {
            document: document.to_path_buf(),
            marker: what,
        };

        let start = text
            .find(marker.start)
            .ok_or_else(|| missing(marker.start.to_string()))?;
        let end = text
            .find(marker.end)
            .ok_or_else(|| missing(marker.end.to_string()))?;
        let before_end = start + marker.start.len();
        if end < before_end {
            return Err(missing(format!(
                "{} must come after {}",
                marker.end, marker.start
            )));
        }

        let line_start = text[..end].rfind('\n').map_or(0, |i| i + 1);
        let after_start = if line_start >= before_end
            && text[line_start..end].chars().all(|c| c == ' ' || c == '\t')
        {
            line_start
        } else {
            end
        };

        Ok(Self {
            before: &text[..before_end],
            after: &text[after_start..],
        })
    }

    /// The document with `body` as the region's content.
    pub fn fill(&self, body: &str) -> String {
        let mut out = String::with_capacity(self.before.len() + body.len() + self.after.len() + 2);
        out.push_str(self.before);
        out.push('\n');
        out.push_str(body);
        out.push('\n');
        out.push_str(self.after);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<html>\n  <main>\n    <!-- HOME_BLOG_CARDS:START -->\n    <p>stale</p>\n    <!-- HOME_BLOG_CARDS:END -->\n  </main>\n</html>\n";

    fn parse(text: &str) -> Result<MarkedDocument<'_>> {
        MarkedDocument::parse(text, &HOME_MARKER, Path::new("index.html"))
    }

    #[test]
    fn fill_replaces_only_the_region() {
        let filled = parse(DOC).unwrap().fill("    <p>fresh</p>");
        assert_eq!(
            filled,
            "<html>\n  <main>\n    <!-- HOME_BLOG_CARDS:START -->\n    <p>fresh</p>\n    <!-- HOME_BLOG_CARDS:END -->\n  </main>\n</html>\n"
        );
    }

    #[test]
    fn refilling_is_idempotent() {
        let once = parse(DOC).unwrap().fill("    <p>fresh</p>");
        let twice = parse(&once).unwrap().fill("    <p>fresh</p>");
        assert_eq!(once, twice);
    }

    #[test]
    fn markers_on_one_line() {
        let text = "a<!-- HOME_BLOG_CARDS:START --><!-- HOME_BLOG_CARDS:END -->b";
        let once = parse(text).unwrap().fill("X");
        assert_eq!(once, "a<!-- HOME_BLOG_CARDS:START -->\nX\n<!-- HOME_BLOG_CARDS:END -->b");
        assert_eq!(parse(&once).unwrap().fill("X"), once);
    }

    #[test]
    fn missing_end_marker_is_reported() {
        let text = "<!-- HOME_BLOG_CARDS:START -->";
        match parse(text) {
            Err(PresslineError::MarkerMissing { document, marker }) => {
                assert_eq!(document, Path::new("index.html"));
                assert_eq!(marker, HOME_MARKER.end);
            }
            other => panic!("expected MarkerMissing, got {other:?}"),
        }
    }

    #[test]
    fn misordered_markers_are_reported() {
        let text = "<!-- HOME_BLOG_CARDS:END -->\n<!-- HOME_BLOG_CARDS:START -->";
        assert!(matches!(
            parse(text),
            Err(PresslineError::MarkerMissing { .. })
        ));
    }
}
