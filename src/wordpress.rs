//! WordPress REST gateway (`wp-json/wp/v2/`) plus the Polylang connector
//! endpoints (`wp-json/pll/v1/`). All calls are synchronous request/response
//! with basic auth; a non-success status fails the operation, and nothing here
//! retries — create-vs-update decisions upstream key on persisted ids instead.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

use crate::config::Config;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the reconciler needs from the remote side. Implemented by
/// [`WpClient`] in production and by recording fakes in tests.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn test_connectivity(&self) -> Result<()>;
    async fn test_translation_endpoint(&self) -> Result<()>;
    async fn create_post(&self, draft: &PostDraft<'_>) -> Result<u64>;
    async fn update_post(&self, post_id: u64, draft: &PostDraft<'_>) -> Result<u64>;
    async fn set_language(&self, post_id: u64, locale: &str) -> Result<()>;
    async fn link_translations(
        &self,
        primary: (u64, &str),
        secondary: (u64, &str),
    ) -> Result<()>;
    async fn find_or_create_category(&self, name: &str) -> Result<u64>;
    async fn upload_media(&self, bytes: Vec<u8>, filename: &str) -> Result<u64>;
    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<()>;
}

/// Outgoing post payload. Borrowed; built fresh per publish step.
#[derive(Debug, Clone, Copy)]
pub struct PostDraft<'a> {
    pub title: &'a str,
    pub html: &'a str,
    pub language: &'a str,
    pub category: Option<u64>,
    pub source_path: &'a str,
}

#[derive(Clone)]
pub struct WpClient {
    http: Client,
    rest_url: Url,
    pll_url: Url,
    username: String,
    password: String,
}

impl fmt::Debug for WpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpClient")
            .field("rest_url", &self.rest_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct PostResponse {
    id: u64,
}

#[derive(Deserialize)]
struct TermResponse {
    id: u64,
}

#[derive(Deserialize)]
struct MediaResponse {
    id: u64,
}

#[derive(Deserialize)]
struct LinkResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

impl WpClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let root = cfg.wordpress.url.trim_end_matches('/');
        let rest_url =
            Url::parse(&format!("{root}/wp-json/wp/v2/")).context("invalid WordPress URL")?;
        let pll_url =
            Url::parse(&format!("{root}/wp-json/pll/v1/")).context("invalid WordPress URL")?;
        let http = Client::builder()
            .user_agent("wp-mirror/0.1")
            .timeout(METADATA_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            rest_url,
            pll_url,
            username: cfg.wordpress.username.clone(),
            password: cfg.wordpress.app_password.clone(),
        })
    }

    fn rest(&self, path: &str) -> Result<Url> {
        self.rest_url.join(path).context("invalid REST path")
    }

    fn pll(&self, path: &str) -> Result<Url> {
        self.pll_url.join(path).context("invalid Polylang path")
    }

    async fn execute_post_payload(&self, url: Url, body: &Value) -> Result<u64> {
        let res = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .context("failed to reach WordPress")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("wordpress error {status}: {body}");
        }

        let payload: PostResponse = res.json().await.context("invalid WordPress response JSON")?;
        Ok(payload.id)
    }
}

/// Build the JSON body for a post create/update. Kept as a free function so
/// the payload shape is testable without a server.
pub fn build_post_body(draft: &PostDraft<'_>) -> Value {
    let mut body = Map::new();
    body.insert("title".into(), json!(draft.title));
    body.insert("content".into(), json!(draft.html));
    body.insert("status".into(), json!("publish"));
    body.insert(
        "meta".into(),
        json!({
            "language": draft.language,
            "source_path": draft.source_path,
        }),
    );
    if let Some(category) = draft.category {
        body.insert("categories".into(), json!([category]));
    }
    Value::Object(body)
}

/// Build the Polylang link payload: `{"posts": {"ko": 1, "en": 2}}`.
pub fn build_link_body(primary: (u64, &str), secondary: (u64, &str)) -> Value {
    let mut posts = Map::new();
    posts.insert(primary.1.to_string(), json!(primary.0));
    posts.insert(secondary.1.to_string(), json!(secondary.0));
    json!({ "posts": Value::Object(posts) })
}

#[async_trait]
impl RemoteGateway for WpClient {
    async fn test_connectivity(&self) -> Result<()> {
        let mut url = self.rest("posts")?;
        url.query_pairs_mut().append_pair("per_page", "1");
        let res = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .context("failed to reach WordPress")?;
        if !res.status().is_success() {
            bail!("wordpress connectivity check failed: {}", res.status());
        }
        Ok(())
    }

    async fn test_translation_endpoint(&self) -> Result<()> {
        let res = self
            .http
            .get(self.pll("post/1")?)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .context("failed to reach Polylang connector")?;
        // 404 on post 1 still proves the route exists; an unknown route
        // returns the REST "rest_no_route" error instead.
        if res.status() == StatusCode::NOT_FOUND || res.status().is_success() {
            return Ok(());
        }
        bail!("polylang connector probe failed: {}", res.status());
    }

    async fn create_post(&self, draft: &PostDraft<'_>) -> Result<u64> {
        self.execute_post_payload(self.rest("posts")?, &build_post_body(draft))
            .await
    }

    async fn update_post(&self, post_id: u64, draft: &PostDraft<'_>) -> Result<u64> {
        self.execute_post_payload(self.rest(&format!("posts/{post_id}"))?, &build_post_body(draft))
            .await
    }

    async fn set_language(&self, post_id: u64, locale: &str) -> Result<()> {
        let res = self
            .http
            .post(self.pll("set-language")?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({ "post_id": post_id, "language": locale }))
            .send()
            .await
            .context("failed to reach Polylang connector")?;
        if !res.status().is_success() {
            bail!("set-language failed: {}", res.status());
        }
        Ok(())
    }

    async fn link_translations(
        &self,
        primary: (u64, &str),
        secondary: (u64, &str),
    ) -> Result<()> {
        let res = self
            .http
            .post(self.pll("link-translations")?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&build_link_body(primary, secondary))
            .send()
            .await
            .context("failed to reach Polylang connector")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("link-translations failed {status}: {body}");
        }
        let payload: LinkResponse =
            res.json().await.context("invalid link-translations response")?;
        if !payload.success {
            return Err(anyhow!(
                "link-translations rejected: {}",
                payload.message.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        Ok(())
    }

    async fn find_or_create_category(&self, name: &str) -> Result<u64> {
        let name = name.trim();
        if name.is_empty() {
            bail!("empty category name");
        }

        let mut url = self.rest("categories")?;
        url.query_pairs_mut()
            .append_pair("search", name)
            .append_pair("per_page", "1");
        let res = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .context("failed to reach WordPress")?;
        if res.status().is_success() {
            let found: Vec<TermResponse> =
                res.json().await.context("invalid categories response")?;
            if let Some(term) = found.first() {
                return Ok(term.id);
            }
        }

        let slug = name.to_lowercase().replace(' ', "-");
        let res = self
            .http
            .post(self.rest("categories")?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({ "name": name, "slug": slug }))
            .send()
            .await
            .context("failed to reach WordPress")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("category create failed {status}: {body}");
        }
        let created: TermResponse = res.json().await.context("invalid category response")?;
        Ok(created.id)
    }

    async fn upload_media(&self, bytes: Vec<u8>, filename: &str) -> Result<u64> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type_for(filename))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .http
            .post(self.rest("media")?)
            .basic_auth(&self.username, Some(&self.password))
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\""),
            )
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .context("failed to reach WordPress")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("media upload failed {status}: {body}");
        }
        let media: MediaResponse = res.json().await.context("invalid media response")?;
        Ok(media.id)
    }

    async fn set_featured_media(&self, post_id: u64, media_id: u64) -> Result<()> {
        let res = self
            .http
            .post(self.rest(&format!("posts/{post_id}"))?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({ "featured_media": media_id }))
            .send()
            .await
            .context("failed to reach WordPress")?;
        if !res.status().is_success() {
            bail!("featured media update failed: {}", res.status());
        }
        Ok(())
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
