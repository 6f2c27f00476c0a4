use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The two sides of the bilingual model. `Primary` is the default language
/// (documents outside any secondary-language folder), `Secondary` its
/// translation counterpart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    Primary,
    Secondary,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Primary => "primary",
            Language::Secondary => "secondary",
        }
    }
}

/// A publishable Markdown document, parsed from disk. `body` is the raw
/// Markdown source; HTML is derived at publish time and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub title: String,
    pub language: Language,
    /// Remote post id persisted in front matter once published.
    pub remote_post_id: Option<u64>,
    /// Remote post id of the translation counterpart, set after linking.
    pub mirror_post_id: Option<u64>,
    /// Explicit author-assigned pairing key, independent of filename/folder.
    pub group_id: Option<String>,
    /// Category name declared under the language-specific front-matter key.
    pub category: Option<String>,
    pub body: String,
}

/// The reconciliation unit: a primary-language document and its optional
/// translation. Remote ids are captured at resolve time so the reconciler
/// can decide create-vs-update without re-reading the files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub primary: Document,
    pub secondary: Option<Document>,
    pub primary_remote_id: Option<u64>,
    pub secondary_remote_id: Option<u64>,
}

impl Pair {
    pub fn new(primary: Document, secondary: Option<Document>) -> Self {
        let primary_remote_id = primary.remote_post_id;
        let secondary_remote_id = secondary.as_ref().and_then(|d| d.remote_post_id);
        Self {
            primary,
            secondary,
            primary_remote_id,
            secondary_remote_id,
        }
    }
}

/// End-of-run aggregate returned by the reconciler. Plain data, no ambient
/// state; the caller decides how to present it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pairs: usize,
    pub primary_created: usize,
    pub primary_updated: usize,
    pub secondary_created: usize,
    pub secondary_updated: usize,
    pub linked: usize,
    pub covers_set: usize,
    pub failed: usize,
    /// Remote operation succeeded but the local front-matter write did not.
    /// Remote and local state disagree until the next run rediscovers the id.
    pub persist_failures: usize,
}

impl RunSummary {
    pub fn record_publish(&mut self, language: Language, updated: bool) {
        match (language, updated) {
            (Language::Primary, false) => self.primary_created += 1,
            (Language::Primary, true) => self.primary_updated += 1,
            (Language::Secondary, false) => self.secondary_created += 1,
            (Language::Secondary, true) => self.secondary_updated += 1,
        }
    }

    pub fn created(&self) -> usize {
        self.primary_created + self.secondary_created
    }

    pub fn updated(&self) -> usize {
        self.primary_updated + self.secondary_updated
    }
}
