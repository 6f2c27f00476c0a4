//! Pairing resolver: decides which primary-language document belongs with
//! which translation, producing the reconciliation plan.
//!
//! Matching strategies, in strict priority order per primary candidate:
//! 1. explicit `group-id` shared by a secondary-language document,
//! 2. stored `mirror_post_id` pointing at another document's `wp-post-id`,
//! 3. identical filename inside a secondary-language folder next to the
//!    primary document.
//! Within a strategy, the first unconsumed candidate in discovery order wins.

use crate::model::{Document, Language, Pair};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Immutable lookup tables built once per run from the discovered set.
/// Values are indices into the discovery-ordered document slice, so iteration
/// order inside a group stays the discovery order.
pub struct DocumentIndex {
    by_post_id: HashMap<u64, usize>,
    by_group: HashMap<String, Vec<usize>>,
}

pub fn build_index(documents: &[Document]) -> DocumentIndex {
    let mut by_post_id = HashMap::new();
    let mut by_group: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, doc) in documents.iter().enumerate() {
        if let Some(post_id) = doc.remote_post_id {
            by_post_id.insert(post_id, i);
        }
        if let Some(group) = &doc.group_id {
            by_group.entry(group.clone()).or_default().push(i);
        }
    }
    DocumentIndex {
        by_post_id,
        by_group,
    }
}

/// Resolve the eligible document set into pairs. Every input document lands
/// in exactly one pair; a pair without a secondary is a normal monolingual
/// publish. Secondary-language documents with no discoverable primary are
/// emitted as single-document pairs under their own language, with a warning.
pub fn resolve(
    documents: &[Document],
    index: &DocumentIndex,
    secondary_folders: &[String],
) -> Vec<Pair> {
    let by_path: HashMap<&Path, usize> = documents
        .iter()
        .enumerate()
        .map(|(i, d)| (d.path.as_path(), i))
        .collect();

    let mut consumed = vec![false; documents.len()];
    let mut pairs = Vec::new();

    for (i, doc) in documents.iter().enumerate() {
        if doc.language == Language::Secondary || consumed[i] {
            continue;
        }

        let secondary = match_group(i, doc, documents, index, &consumed)
            .or_else(|| match_mirror(i, doc, index, &consumed))
            .or_else(|| match_adjacent(doc, &by_path, &consumed, secondary_folders));

        consumed[i] = true;
        if let Some(j) = secondary {
            consumed[j] = true;
            debug!(
                primary = %doc.path.display(),
                secondary = %documents[j].path.display(),
                "paired"
            );
        }

        pairs.push(Pair::new(
            doc.clone(),
            secondary.map(|j| documents[j].clone()),
        ));
    }

    // Leftover translations: nothing claimed them, but they are part of the
    // eligible set and still get published standalone.
    for (i, doc) in documents.iter().enumerate() {
        if !consumed[i] {
            warn!(
                path = %doc.path.display(),
                "secondary-language document has no primary counterpart"
            );
            consumed[i] = true;
            pairs.push(Pair::new(doc.clone(), None));
        }
    }

    pairs
}

/// Strategy 1: shared explicit group key. Ignores filename and folder
/// nesting entirely; first unconsumed secondary-language member in discovery
/// order wins.
fn match_group(
    i: usize,
    doc: &Document,
    documents: &[Document],
    index: &DocumentIndex,
    consumed: &[bool],
) -> Option<usize> {
    let group = doc.group_id.as_ref()?;
    index
        .by_group
        .get(group)?
        .iter()
        .copied()
        .find(|&j| {
            j != i && !consumed[j] && documents[j].language == Language::Secondary
        })
}

/// Strategy 2: the primary's stored mirror id names the remote post another
/// document currently claims.
fn match_mirror(
    i: usize,
    doc: &Document,
    index: &DocumentIndex,
    consumed: &[bool],
) -> Option<usize> {
    let mirror = doc.mirror_post_id?;
    index
        .by_post_id
        .get(&mirror)
        .copied()
        .filter(|&j| j != i && !consumed[j])
}

/// Strategy 3: positional convention. A secondary-language subfolder next to
/// the primary document holding a file with the identical name.
fn match_adjacent(
    doc: &Document,
    by_path: &HashMap<&Path, usize>,
    consumed: &[bool],
    secondary_folders: &[String],
) -> Option<usize> {
    let dir = doc.path.parent()?;
    let name = doc.path.file_name()?;
    for folder in secondary_folders {
        let candidate: PathBuf = dir.join(folder).join(name);
        if let Some(&j) = by_path.get(candidate.as_path()) {
            if !consumed[j] {
                return Some(j);
            }
        }
    }
    None
}
