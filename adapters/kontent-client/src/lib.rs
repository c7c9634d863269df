//! kontent-client — Kontent.ai Delivery API adapter implementing the domain ports.
//!
//! Purpose
//! - `ContentQuery`: list items of a content type in a workflow step. Uses the
//!   Preview Delivery API because only it can filter on `system.workflow_step`.
//! - `PublishedUrls`: every published item's URL slug element mapped to a
//!   site-relative path, via the public Delivery API.
//!
//! Configuration
//! - `KONTENT_ENVIRONMENT_ID` (required)
//! - `KONTENT_PREVIEW_API_KEY` (required)
//! - `KONTENT_DELIVERY_API_KEY` (optional, for secured delivery access)
//! - `KONTENT_SLUG_ELEMENT` (default `url_slug`)
//! - `KONTENT_PREVIEW_BASE_URL` / `KONTENT_DELIVERY_BASE_URL` (override hosts)
//!
//! Notes
//! - Listing endpoints are paginated with `skip`/`limit`; pages are fetched one
//!   after another until `pagination.next_page` comes back empty.
//! - No retries. A failed request fails the whole query.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use domain::{ContentItem, ContentQuery, CoreError, Element, NormalizedUrl, PublishedUrls};
use serde::Deserialize;
use tracing::{debug, trace};

const DEFAULT_PREVIEW_BASE_URL: &str = "https://preview-deliver.kontent.ai";
const DEFAULT_DELIVERY_BASE_URL: &str = "https://deliver.kontent.ai";
const DEFAULT_SLUG_ELEMENT: &str = "url_slug";
const DEFAULT_PAGE_SIZE: usize = 100;
// Hard cap so a misbehaving pagination cursor cannot loop forever.
const MAX_PAGES: usize = 1000;

/// Failures talking to Kontent.ai. Malformed JSON bodies surface as `Http`
/// (reqwest's decode error).
#[derive(Debug, thiserror::Error)]
pub enum KontentError {
    #[error("missing configuration: {0}")]
    Config(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("pagination did not terminate after {0} pages")]
    Pagination(usize),
}

impl From<KontentError> for CoreError {
    fn from(e: KontentError) -> Self {
        CoreError::Query(e.to_string())
    }
}

/// Connection settings for one Kontent.ai environment.
#[derive(Clone)]
pub struct KontentConfig {
    pub environment_id: String,
    pub preview_api_key: String,
    pub delivery_api_key: Option<String>,
    pub slug_element: String,
    pub preview_base_url: String,
    pub delivery_base_url: String,
    pub page_size: usize,
}

impl KontentConfig {
    /// Settings with default hosts, slug element and page size.
    pub fn new(environment_id: impl Into<String>, preview_api_key: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            preview_api_key: preview_api_key.into(),
            delivery_api_key: None,
            slug_element: DEFAULT_SLUG_ELEMENT.into(),
            preview_base_url: DEFAULT_PREVIEW_BASE_URL.into(),
            delivery_base_url: DEFAULT_DELIVERY_BASE_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Build from environment variables.
    pub fn from_env() -> Result<Self, KontentError> {
        let environment_id = non_empty_env("KONTENT_ENVIRONMENT_ID")
            .ok_or(KontentError::Config("KONTENT_ENVIRONMENT_ID"))?;
        let preview_api_key = non_empty_env("KONTENT_PREVIEW_API_KEY")
            .ok_or(KontentError::Config("KONTENT_PREVIEW_API_KEY"))?;

        let mut cfg = Self::new(environment_id, preview_api_key);
        cfg.delivery_api_key = non_empty_env("KONTENT_DELIVERY_API_KEY");
        if let Some(el) = non_empty_env("KONTENT_SLUG_ELEMENT") {
            cfg.slug_element = el;
        }
        if let Some(url) = non_empty_env("KONTENT_PREVIEW_BASE_URL") {
            cfg.preview_base_url = url;
        }
        if let Some(url) = non_empty_env("KONTENT_DELIVERY_BASE_URL") {
            cfg.delivery_base_url = url;
        }
        Ok(cfg)
    }
}

// Keys stay out of logs.
impl fmt::Debug for KontentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KontentConfig")
            .field("environment_id", &self.environment_id)
            .field("preview_api_key", &"<redacted>")
            .field(
                "delivery_api_key",
                &self.delivery_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("slug_element", &self.slug_element)
            .field("preview_base_url", &self.preview_base_url)
            .field("delivery_base_url", &self.delivery_base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---- Delivery API wire format ----

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<DeliveryItem>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_page: String,
}

#[derive(Debug, Deserialize)]
struct DeliveryItem {
    system: DeliverySystem,
    #[serde(default)]
    elements: BTreeMap<String, Element>,
}

#[derive(Debug, Deserialize)]
struct DeliverySystem {
    id: String,
    #[serde(rename = "type")]
    content_type: String,
}

impl From<DeliveryItem> for ContentItem {
    fn from(item: DeliveryItem) -> Self {
        let mut out = ContentItem::new(item.system.id, item.system.content_type);
        out.elements = item.elements;
        out
    }
}

/// Map a URL slug to the site-relative path it is served under.
fn slug_path(slug: &str) -> Option<NormalizedUrl> {
    let slug = slug.trim().trim_start_matches('/');
    if slug.is_empty() {
        return None;
    }
    NormalizedUrl::new(&format!("/{}", slug))
}

// ---- Client ----

/// Which Delivery API host a request goes to.
#[derive(Clone, Copy, Debug)]
enum Api {
    Preview,
    Delivery,
}

/// HTTP client for one environment. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone, Debug)]
pub struct KontentClient {
    http: reqwest::Client,
    config: KontentConfig,
}

impl KontentClient {
    pub fn new(config: KontentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, KontentError> {
        Ok(Self::new(KontentConfig::from_env()?))
    }

    fn items_url(&self, api: Api) -> String {
        let base = match api {
            Api::Preview => &self.config.preview_base_url,
            Api::Delivery => &self.config.delivery_base_url,
        };
        format!(
            "{}/{}/items",
            base.trim_end_matches('/'),
            self.config.environment_id
        )
    }

    fn api_key(&self, api: Api) -> Option<&str> {
        match api {
            Api::Preview => Some(self.config.preview_api_key.as_str()),
            Api::Delivery => self.config.delivery_api_key.as_deref(),
        }
    }

    /// Fetch every page of an items listing with the given filters.
    async fn fetch_all(
        &self,
        api: Api,
        filters: &[(String, String)],
    ) -> Result<Vec<DeliveryItem>, KontentError> {
        let url = self.items_url(api);
        let limit = self.config.page_size.max(1);
        let mut items = Vec::new();

        for page in 0..MAX_PAGES {
            let skip = page * limit;
            let mut req = self
                .http
                .get(&url)
                .query(filters)
                .query(&[("limit", limit), ("skip", skip)]);
            if let Some(key) = self.api_key(api) {
                req = req.bearer_auth(key);
            }
            trace!(?api, %url, skip, "kontent: fetching page");

            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(KontentError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(512).collect(),
                });
            }

            let page_data: ItemsPage = resp.json().await?;
            items.extend(page_data.items);
            if page_data.pagination.next_page.is_empty() {
                debug!(?api, pages = page + 1, items = items.len(), "kontent: listing complete");
                return Ok(items);
            }
        }
        Err(KontentError::Pagination(MAX_PAGES))
    }

    /// Items of `type_codename` currently in `workflow_step`.
    pub async fn items_in_step(
        &self,
        type_codename: &str,
        workflow_step: &str,
    ) -> Result<Vec<ContentItem>, KontentError> {
        let filters = vec![
            ("system.type".to_string(), type_codename.to_string()),
            ("system.workflow_step".to_string(), workflow_step.to_string()),
        ];
        let items = self.fetch_all(Api::Preview, &filters).await?;
        Ok(items.into_iter().map(ContentItem::from).collect())
    }

    /// Site-relative URLs of all published items carrying a slug. The site
    /// root is always included.
    pub async fn published_paths(&self) -> Result<BTreeSet<NormalizedUrl>, KontentError> {
        let el = &self.config.slug_element;
        let filters = vec![
            ("elements".to_string(), el.clone()),
            (format!("elements.{}[nempty]", el), String::new()),
        ];
        let items = self.fetch_all(Api::Delivery, &filters).await?;

        let mut urls: BTreeSet<NormalizedUrl> = items
            .iter()
            .filter_map(|item| item.elements.get(el))
            .filter_map(|slug| slug.value.as_str())
            .filter_map(slug_path)
            .collect();
        urls.extend(NormalizedUrl::new("/"));
        Ok(urls)
    }
}

impl ContentQuery for KontentClient {
    async fn list_items(
        &self,
        type_codename: &str,
        workflow_step: &str,
    ) -> Result<Vec<ContentItem>, CoreError> {
        Ok(self.items_in_step(type_codename, workflow_step).await?)
    }
}

impl PublishedUrls for KontentClient {
    async fn published_urls(&self) -> Result<BTreeSet<NormalizedUrl>, CoreError> {
        Ok(self.published_paths().await?)
    }
}
