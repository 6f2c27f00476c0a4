use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use wp_mirror::config::Config;
use wp_mirror::frontmatter;
use wp_mirror::model::RunSummary;
use wp_mirror::wordpress::{PostDraft, RemoteGateway};
use wp_mirror::{discover, pairing, reconcile};

#[derive(Debug, Clone)]
struct PublishCall {
    title: String,
    language: String,
    existing: Option<u64>,
    category: Option<u64>,
}

#[derive(Clone, Default)]
struct RecordingGateway {
    responses: Arc<Mutex<VecDeque<Result<u64>>>>,
    creates: Arc<Mutex<Vec<PublishCall>>>,
    updates: Arc<Mutex<Vec<PublishCall>>>,
    links: Arc<Mutex<Vec<(u64, String, u64, String)>>>,
    languages: Arc<Mutex<Vec<(u64, String)>>>,
    uploads: Arc<Mutex<Vec<String>>>,
    featured: Arc<Mutex<Vec<(u64, u64)>>>,
    categories: Arc<Mutex<Vec<String>>>,
}

impl RecordingGateway {
    fn with_responses(responses: Vec<Result<u64>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    async fn push_responses(&self, responses: Vec<Result<u64>>) {
        self.responses.lock().await.extend(responses);
    }

    async fn pop_response(&self) -> Result<u64> {
        let mut guard = self.responses.lock().await;
        guard.pop_front().unwrap_or_else(|| Ok(1))
    }

    async fn creates(&self) -> Vec<PublishCall> {
        self.creates.lock().await.clone()
    }

    async fn updates(&self) -> Vec<PublishCall> {
        self.updates.lock().await.clone()
    }

    async fn links(&self) -> Vec<(u64, String, u64, String)> {
        self.links.lock().await.clone()
    }
}

#[async_trait]
impl RemoteGateway for RecordingGateway {
    async fn test_connectivity(&self) -> Result<()> {
        Ok(())
    }

    async fn test_translation_endpoint(&self) -> Result<()> {
        Ok(())
    }

    async fn create_post(&self, draft: &PostDraft<'_>) -> Result<u64> {
        self.creates.lock().await.push(PublishCall {
            title: draft.title.to_string(),
            language: draft.language.to_string(),
            existing: None,
            category: draft.category,
        });
        self.pop_response().await
    }

    async fn update_post(&self, post_id: u64, draft: &PostDraft<'_>) -> Result<u64> {
        self.updates.lock().await.push(PublishCall {
            title: draft.title.to_string(),
            language: draft.language.to_string(),
            existing: Some(post_id),
            category: draft.category,
        });
        self.pop_response().await
    }

    async fn set_language(&self, post_id: u64, locale: &str) -> Result<()> {
        self.languages.lock().await.push((post_id, locale.to_string()));
        Ok(())
    }

    async fn link_translations(
        &self,
        primary: (u64, &str),
        secondary: (u64, &str),
    ) -> Result<()> {
        self.links.lock().await.push((
            primary.0,
            primary.1.to_string(),
            secondary.0,
            secondary.1.to_string(),
        ));
        Ok(())
    }

    async fn find_or_create_category(&self, name: &str) -> Result<u64> {
        self.categories.lock().await.push(name.to_string());
        Ok(7)
    }

    async fn upload_media(&self, _bytes: Vec<u8>, filename: &str) -> Result<u64> {
        let mut uploads = self.uploads.lock().await;
        uploads.push(filename.to_string());
        Ok(900 + uploads.len() as u64)
    }

    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<()> {
        self.featured.lock().await.push((post_id, media_id));
        Ok(())
    }
}

fn test_config() -> Config {
    serde_yaml::from_str(wp_mirror::config::example()).unwrap()
}

fn write_doc(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

async fn run(root: &Path, gateway: &RecordingGateway) -> RunSummary {
    let cfg = test_config();
    let files = discover::scan(root, &cfg.app.excluded_folders).unwrap();
    let documents = discover::load_documents(&files, &cfg);
    let index = pairing::build_index(&documents);
    let pairs = pairing::resolve(&documents, &index, &cfg.languages.secondary.folders);
    reconcile::reconcile(&pairs, gateway, &cfg).await
}

fn post_id_of(root: &Path, rel: &str) -> Option<u64> {
    let map = frontmatter::read(&root.join(rel))?;
    frontmatter::get_u64(&map, frontmatter::KEY_POST_ID)
}

fn mirror_id_of(root: &Path, rel: &str) -> Option<u64> {
    let map = frontmatter::read(&root.join(rel))?;
    frontmatter::get_u64(&map, frontmatter::KEY_MIRROR_ID)
}

const KO_DOC: &str = "---\ntitle: 1장\npublish: true\ngroup-id: bookX-ch1\nko-category: Books\n---\n# 본문\n";
const EN_DOC: &str = "---\ntitle: Chapter 1\npublish: true\ngroup-id: bookX-ch1\n---\n# Body\n";

#[tokio::test]
async fn bilingual_pair_is_created_linked_and_persisted() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    write_doc(root, "book/ch1.md", KO_DOC);
    write_doc(root, "book/english/first-chapter.md", EN_DOC);
    fs::write(root.join("book/cover.jpg"), b"jpeg bytes").unwrap();

    let gateway = RecordingGateway::with_responses(vec![Ok(101), Ok(202)]);
    let summary = run(root, &gateway).await;

    assert_eq!(summary.pairs, 1);
    assert_eq!(summary.primary_created, 1);
    assert_eq!(summary.secondary_created, 1);
    assert_eq!(summary.linked, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.persist_failures, 0);
    // Both sides inherit the cover living next to the primary file.
    assert_eq!(summary.covers_set, 2);

    let creates = gateway.creates().await;
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[0].language, "ko");
    assert_eq!(creates[0].title, "1장");
    assert_eq!(creates[0].category, Some(7));
    assert_eq!(creates[1].language, "en");
    assert_eq!(creates[1].category, None);

    assert_eq!(
        gateway.links().await,
        vec![(101, "ko".to_string(), 202, "en".to_string())]
    );
    assert_eq!(
        *gateway.languages.lock().await,
        vec![(101, "ko_KR".to_string()), (202, "en_US".to_string())]
    );
    assert_eq!(*gateway.categories.lock().await, vec!["Books".to_string()]);
    assert_eq!(
        *gateway.uploads.lock().await,
        vec!["cover.jpg".to_string(), "cover.jpg".to_string()]
    );

    // Remote ids and mirror ids landed in the files.
    assert_eq!(post_id_of(root, "book/ch1.md"), Some(101));
    assert_eq!(post_id_of(root, "book/english/first-chapter.md"), Some(202));
    assert_eq!(mirror_id_of(root, "book/ch1.md"), Some(202));
    assert_eq!(mirror_id_of(root, "book/english/first-chapter.md"), Some(101));
}

#[tokio::test]
async fn second_run_updates_in_place_instead_of_creating() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    write_doc(root, "book/ch1.md", KO_DOC);
    write_doc(root, "book/english/first-chapter.md", EN_DOC);

    let gateway = RecordingGateway::with_responses(vec![Ok(101), Ok(202)]);
    let first = run(root, &gateway).await;
    assert_eq!(first.created(), 2);

    gateway.push_responses(vec![Ok(101), Ok(202)]).await;
    let second = run(root, &gateway).await;

    // Idempotence: nothing new is created on an unchanged set.
    assert_eq!(second.created(), 0);
    assert_eq!(second.primary_updated, 1);
    assert_eq!(second.secondary_updated, 1);
    assert_eq!(second.linked, 1);
    assert_eq!(second.failed, 0);

    let updates = gateway.updates().await;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].existing, Some(101));
    assert_eq!(updates[1].existing, Some(202));
    assert_eq!(gateway.creates().await.len(), 2); // only from the first run
}

#[tokio::test]
async fn failed_primary_is_contained_to_its_pair() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    write_doc(root, "a.md", "---\ntitle: A\npublish: true\n---\nbody\n");
    write_doc(root, "b.md", "---\ntitle: B\npublish: true\n---\nbody\n");

    let gateway =
        RecordingGateway::with_responses(vec![Err(anyhow!("wordpress error 500")), Ok(77)]);
    let summary = run(root, &gateway).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.primary_created, 1);
    // No metadata write for the failed side; the independent pair proceeded.
    assert_eq!(post_id_of(root, "a.md"), None);
    assert_eq!(post_id_of(root, "b.md"), Some(77));
}

#[tokio::test]
async fn failed_secondary_keeps_primary_and_skips_linking() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    write_doc(root, "book/ch1.md", KO_DOC);
    write_doc(root, "book/english/first-chapter.md", EN_DOC);

    let gateway =
        RecordingGateway::with_responses(vec![Ok(101), Err(anyhow!("wordpress error 500"))]);
    let summary = run(root, &gateway).await;

    assert_eq!(summary.primary_created, 1);
    assert_eq!(summary.secondary_created, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.linked, 0);
    assert!(gateway.links().await.is_empty());
    // The primary post stands on its own once created.
    assert_eq!(post_id_of(root, "book/ch1.md"), Some(101));
    assert_eq!(post_id_of(root, "book/english/first-chapter.md"), None);
}

#[tokio::test]
async fn unpublished_documents_never_reach_the_gateway() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    write_doc(root, "yes.md", "---\ntitle: Yes\npublish: true\n---\nbody\n");
    write_doc(root, "no.md", "---\ntitle: No\npublish: false\n---\nbody\n");

    let gateway = RecordingGateway::with_responses(vec![Ok(5)]);
    let summary = run(root, &gateway).await;

    assert_eq!(summary.pairs, 1);
    let creates = gateway.creates().await;
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].title, "Yes");
}

#[tokio::test]
async fn orphan_translation_publishes_under_its_own_language() {
    let td = tempfile::tempdir().unwrap();
    let root = td.path();
    write_doc(root, "english/lonely.md", "---\ntitle: Lonely\npublish: true\n---\nbody\n");

    let gateway = RecordingGateway::with_responses(vec![Ok(33)]);
    let summary = run(root, &gateway).await;

    assert_eq!(summary.secondary_created, 1);
    assert_eq!(summary.linked, 0);
    let creates = gateway.creates().await;
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].language, "en");
    assert_eq!(post_id_of(root, "english/lonely.md"), Some(33));
}
