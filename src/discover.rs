//! Document discovery: directory traversal and front-matter parsing.

use crate::config::Config;
use crate::frontmatter::{self, KEY_GROUP_ID, KEY_LANGUAGE, KEY_MIRROR_ID, KEY_POST_ID, KEY_PUBLISH, KEY_TITLE};
use crate::model::{Document, Language};
use anyhow::{ensure, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Walk the tree under `root`, pruning any subtree whose directory name is in
/// `excluded`, and collect Markdown files in lexicographic order. Downstream
/// pairing depends on this order being deterministic.
pub fn scan(root: &Path, excluded: &[String]) -> Result<Vec<PathBuf>> {
    ensure!(root.is_dir(), "not a directory: {}", root.display());

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, excluded));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let name = entry.file_name().to_string_lossy();
                if name.ends_with(".md") && !name.starts_with('.') {
                    files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "skipping unreadable entry"),
        }
    }

    files.sort();
    Ok(files)
}

fn is_excluded_dir(entry: &DirEntry, excluded: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| excluded.iter().any(|ex| ex == name))
            .unwrap_or(false)
}

/// Parse the discovered files into eligible documents. Files without
/// `publish: true` are silently skipped; unreadable or malformed files are
/// skipped with a warning and never fail the run.
pub fn load_documents(paths: &[PathBuf], cfg: &Config) -> Vec<Document> {
    let mut documents = Vec::new();
    for path in paths {
        match load_document(path, cfg) {
            Ok(Some(doc)) => documents.push(doc),
            Ok(None) => debug!(path = %path.display(), "not marked for publishing"),
            Err(err) => warn!(path = %path.display(), %err, "skipping document"),
        }
    }
    documents
}

fn load_document(path: &Path, cfg: &Config) -> Result<Option<Document>> {
    let content = fs::read_to_string(path)?;
    let Some((map, body)) = frontmatter::split(&content) else {
        anyhow::bail!("malformed front matter");
    };

    if !frontmatter::get_bool(&map, KEY_PUBLISH) {
        return Ok(None);
    }

    let language = detect_language(path, &map, cfg);
    let title = frontmatter::get_str(&map, KEY_TITLE)
        .unwrap_or_else(|| file_stem(path));
    let category = frontmatter::get_str(&map, &cfg.languages.category_key(language));

    Ok(Some(Document {
        path: path.to_path_buf(),
        title,
        language,
        remote_post_id: frontmatter::get_u64(&map, KEY_POST_ID),
        mirror_post_id: frontmatter::get_u64(&map, KEY_MIRROR_ID),
        group_id: frontmatter::get_str(&map, KEY_GROUP_ID),
        category,
        body: body.to_string(),
    }))
}

/// A document is secondary-language when it sits inside one of the configured
/// translation folders; otherwise its declared `language` key decides, and the
/// primary language is the default.
fn detect_language(path: &Path, map: &serde_yaml::Mapping, cfg: &Config) -> Language {
    if in_secondary_folder(path, &cfg.languages.secondary.folders) {
        return Language::Secondary;
    }
    match frontmatter::get_str(map, KEY_LANGUAGE) {
        Some(code) if code == cfg.languages.secondary.code => Language::Secondary,
        _ => Language::Primary,
    }
}

pub fn in_secondary_folder(path: &Path, folders: &[String]) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|name| folders.iter().any(|f| f == name))
            .unwrap_or(false)
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
