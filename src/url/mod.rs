//! URL and handle helpers
//!
//! This module knows the platform's fixed URL shapes: search and tag pages,
//! content items (`/p/<id>/`, `/reel/<id>/`) and profile pages (`/<handle>/`).

mod handle;
mod normalize;

pub use handle::{is_reserved_segment, Handle, RESERVED_SEGMENTS};
pub use normalize::{
    content_owner_segment, is_content_url, normalize_content_url, profile_url, search_url, tag_url,
};
