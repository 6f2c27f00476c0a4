//! Publish reconciler: drives the pair plan through the remote gateway.
//!
//! Processing is strictly sequential, one pair at a time, one step at a time.
//! Each step commits its effect (remote creation first, local persistence
//! immediately after) before the next step runs, so an interrupted run is
//! resumable: the next run finds the persisted ids and updates instead of
//! creating. No failure crosses a pair boundary.

use crate::config::Config;
use crate::frontmatter::{self, KEY_MIRROR_ID, KEY_POST_ID};
use crate::model::{Document, Language, Pair, RunSummary};
use crate::render;
use crate::wordpress::{PostDraft, RemoteGateway};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const COVER_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

pub async fn reconcile(pairs: &[Pair], gateway: &dyn RemoteGateway, cfg: &Config) -> RunSummary {
    let mut summary = RunSummary {
        pairs: pairs.len(),
        ..Default::default()
    };

    for pair in pairs {
        info!(title = %pair.primary.title, "processing pair");

        let Some(primary_id) =
            publish_side(&pair.primary, pair.primary_remote_id, gateway, cfg, &mut summary).await
        else {
            summary.failed += 1;
            continue;
        };

        let mut secondary_id = None;
        if let Some(secondary) = &pair.secondary {
            match publish_side(secondary, pair.secondary_remote_id, gateway, cfg, &mut summary)
                .await
            {
                Some(id) => secondary_id = Some(id),
                None => {
                    // The primary already stands on its own; no rollback.
                    summary.failed += 1;
                    continue;
                }
            }
        }

        if let Some(secondary_id) = secondary_id {
            link_pair(pair, primary_id, secondary_id, gateway, cfg, &mut summary).await;
        }
    }

    summary
}

/// Publish one side of a pair: create or update the remote post, persist the
/// returned id, then best-effort language tag and cover. Returns `None` when
/// the post itself could not be published; best-effort step failures only log.
async fn publish_side(
    doc: &Document,
    existing_id: Option<u64>,
    gateway: &dyn RemoteGateway,
    cfg: &Config,
    summary: &mut RunSummary,
) -> Option<u64> {
    let code = cfg.languages.code(doc.language);
    let html = render::to_html(&doc.body);

    // Category resolution is idempotent find-or-create and never blocks the
    // publish itself.
    let mut category = None;
    if let Some(name) = &doc.category {
        match gateway.find_or_create_category(name).await {
            Ok(id) => category = Some(id),
            Err(err) => warn!(category = %name, %err, "category resolution failed"),
        }
    }

    let source_path = doc.path.to_string_lossy();
    let draft = PostDraft {
        title: &doc.title,
        html: &html,
        language: code,
        category,
        source_path: &source_path,
    };

    let result = match existing_id {
        Some(id) => gateway.update_post(id, &draft).await,
        None => gateway.create_post(&draft).await,
    };
    let post_id = match result {
        Ok(id) => id,
        Err(err) => {
            warn!(path = %doc.path.display(), language = code, %err, "publish failed");
            return None;
        }
    };
    summary.record_publish(doc.language, existing_id.is_some());
    info!(path = %doc.path.display(), post_id, language = code, "post published");

    if let Err(err) = gateway
        .set_language(post_id, cfg.languages.locale(doc.language))
        .await
    {
        warn!(post_id, %err, "language tag not applied");
    }

    // Write-after-confirm: the remote post now exists, so the id must land in
    // the file before anything else happens to this pair. A failed write is a
    // loud partial success, never a retry.
    if !frontmatter::write_key(&doc.path, KEY_POST_ID, Value::from(post_id)) {
        error!(
            path = %doc.path.display(),
            post_id,
            "remote post created but local metadata write failed; states disagree"
        );
        summary.persist_failures += 1;
    }

    if let Some(cover) = find_cover(&doc.path) {
        match set_cover(gateway, post_id, &cover).await {
            Ok(media_id) => {
                summary.covers_set += 1;
                info!(post_id, media_id, cover = %cover.display(), "cover attached");
            }
            Err(err) => warn!(post_id, cover = %cover.display(), %err, "cover not attached"),
        }
    }

    Some(post_id)
}

async fn link_pair(
    pair: &Pair,
    primary_id: u64,
    secondary_id: u64,
    gateway: &dyn RemoteGateway,
    cfg: &Config,
    summary: &mut RunSummary,
) {
    let primary_code = cfg.languages.code(Language::Primary);
    let secondary_code = cfg.languages.code(Language::Secondary);
    match gateway
        .link_translations((primary_id, primary_code), (secondary_id, secondary_code))
        .await
    {
        Ok(()) => {
            summary.linked += 1;
            info!(primary_id, secondary_id, "translations linked");
            // Mirror ids feed next run's pairing; only written once the link
            // actually exists.
            if let Some(secondary) = &pair.secondary {
                for (path, mirror) in [
                    (&pair.primary.path, secondary_id),
                    (&secondary.path, primary_id),
                ] {
                    if !frontmatter::write_key(path, KEY_MIRROR_ID, Value::from(mirror)) {
                        error!(path = %path.display(), mirror, "mirror id write failed");
                        summary.persist_failures += 1;
                    }
                }
            }
        }
        Err(err) => {
            warn!(primary_id, secondary_id, %err, "translation link failed");
            summary.failed += 1;
        }
    }
}

/// Look for `cover.<ext>` next to the document, then one directory up:
/// translations in a language subfolder usually share the primary's cover.
pub fn find_cover(doc_path: &Path) -> Option<PathBuf> {
    let dir = doc_path.parent()?;
    for folder in [Some(dir), dir.parent()] {
        let folder = folder?;
        for ext in COVER_EXTENSIONS {
            let candidate = folder.join(format!("cover.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

async fn set_cover(gateway: &dyn RemoteGateway, post_id: u64, cover: &Path) -> Result<u64> {
    let bytes = tokio::fs::read(cover)
        .await
        .with_context(|| format!("cannot read {}", cover.display()))?;
    let filename = cover
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover".to_string());
    let media_id = gateway.upload_media(bytes, &filename).await?;
    gateway.set_featured_media(post_id, media_id).await?;
    Ok(media_id)
}
