//! Bilingual Markdown → WordPress mirror.
//!
//! Discovers publishable Markdown documents under a vault folder, pairs the
//! primary-language files with their translations, and reconciles the pairs
//! against a WordPress/Polylang backend idempotently: persisted post ids in
//! the documents' front matter make repeated runs converge on updates instead
//! of duplicate creates.

pub mod config;
pub mod discover;
pub mod frontmatter;
pub mod model;
pub mod pairing;
pub mod reconcile;
pub mod render;
pub mod wordpress;
