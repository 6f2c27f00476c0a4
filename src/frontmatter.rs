//! Front-matter metadata store.
//!
//! Every persisted identity field (`wp-post-id`, `mirror_post_id`) flows
//! through [`write_key`]; no other module writes to documents. Writes go to a
//! temp file in the same directory and replace the original atomically only
//! after two plausibility checks, so a crash at any point leaves the original
//! byte-for-byte untouched.

use anyhow::{anyhow, bail, Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

pub const KEY_PUBLISH: &str = "publish";
pub const KEY_TITLE: &str = "title";
pub const KEY_LANGUAGE: &str = "language";
pub const KEY_POST_ID: &str = "wp-post-id";
pub const KEY_MIRROR_ID: &str = "mirror_post_id";
pub const KEY_GROUP_ID: &str = "group-id";

/// A rewrite may legitimately shrink a file a little (YAML reflow), but a
/// large shrink means the body got lost somewhere.
const MAX_SHRINK_CHARS: usize = 100;

/// Split a document into its front-matter mapping and Markdown body.
/// Returns `None` when the file carries no parseable front-matter block.
pub fn split(content: &str) -> Option<(Mapping, &str)> {
    let rest = content
        .strip_prefix("---\r\n")
        .or_else(|| content.strip_prefix("---\n"))?;

    let mut pos = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &rest[..pos];
            let body = &rest[pos + line.len()..];
            // serialize() emits one separating blank line; swallow it so the
            // parse→serialize→parse cycle is stable.
            let body = body
                .strip_prefix("\r\n")
                .or_else(|| body.strip_prefix('\n'))
                .unwrap_or(body);
            let map: Mapping = serde_yaml::from_str(yaml).ok()?;
            return Some((map, body));
        }
        pos += line.len();
    }
    None
}

/// Re-assemble a document from its front-matter mapping and body.
pub fn serialize(map: &Mapping, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(map).context("front matter serialization failed")?;
    Ok(format!("---\n{yaml}---\n\n{body}"))
}

/// Read a document's front-matter mapping, or `None` when the file is
/// missing or malformed.
pub fn read(path: &Path) -> Option<Mapping> {
    let content = fs::read_to_string(path).ok()?;
    split(&content).map(|(map, _)| map)
}

/// Merge `key: value` into a document's front matter, crash-safely.
/// Fails closed: any parse, check or I/O problem returns `false` and leaves
/// the original file unmodified.
pub fn write_key(path: &Path, key: &str, value: Value) -> bool {
    match try_write_key(path, key, value) {
        Ok(()) => true,
        Err(err) => {
            warn!(path = %path.display(), key, %err, "front matter write failed");
            false
        }
    }
}

fn try_write_key(path: &Path, key: &str, value: Value) -> Result<()> {
    let original = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let (mut map, body) =
        split(&original).ok_or_else(|| anyhow!("malformed front matter in {}", path.display()))?;

    map.insert(Value::String(key.to_string()), value);
    let updated = serialize(&map, body)?;
    ensure_plausible(&original, &updated)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).context("cannot create temp file")?;
    tmp.write_all(updated.as_bytes())?;
    tmp.flush()?;

    // Verify what actually landed on disk before the swap. The temp file is
    // removed on drop if anything below fails.
    let written = fs::read_to_string(tmp.path())?;
    ensure_plausible(&original, &written)?;

    tmp.persist(path)
        .with_context(|| format!("cannot replace {}", path.display()))?;
    Ok(())
}

fn ensure_plausible(original: &str, candidate: &str) -> Result<()> {
    let original_len = original.chars().count();
    let candidate_len = candidate.chars().count();
    if candidate.is_empty() || candidate_len + MAX_SHRINK_CHARS < original_len {
        bail!("rewrite suspiciously short ({candidate_len} chars, original {original_len})");
    }
    Ok(())
}

/// `true` only when the key is present and truthy.
pub fn get_bool(map: &Mapping, key: &str) -> bool {
    matches!(map.get(key), Some(Value::Bool(true)))
}

pub fn get_str(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric front-matter value, tolerating quoted numbers.
pub fn get_u64(map: &Mapping, key: &str) -> Option<u64> {
    match map.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
