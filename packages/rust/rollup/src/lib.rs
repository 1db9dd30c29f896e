//! Rollup synthesis for Pressline.
//!
//! Derived views are recomputed from the full content set on every run:
//! the paginated index and homepage regions (between marker comments), the
//! sitemap, and header nav links. Output is deterministic for a given file
//! set and run date.

pub mod marker;
pub mod nav;
pub mod render;
pub mod sitemap;
mod sync;

pub use marker::{HOME_MARKER, INDEX_MARKER, MarkedDocument, Marker};
pub use nav::{DESKTOP_MENU, MOBILE_MENU, Menu, apply_links, ensure_link, sync_nav};
pub use render::{HOME_LIMIT, clamp_text, date_short, escape_html, home_cards, index_cards};
pub use sitemap::render_sitemap;
pub use sync::{SyncReport, synchronize};
