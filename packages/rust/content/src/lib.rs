//! Content metadata extraction for Pressline.
//!
//! Every immediate subdirectory of the content root holding the canonical
//! artifact file becomes one [`ContentItem`]. Missing metadata degrades to
//! fallbacks; only filesystem errors are reported.
//!
//! [`ContentItem`]: pressline_shared::ContentItem

mod extract;

pub use extract::{Extractor, extract_metadata};
