use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{ContentItem, ContentQuery, CoreError, NormalizedUrl, PublishedUrls};

/// In-memory content store keyed by workflow step. Counts queries so tests
/// can assert when the validator did not reach out at all.
pub struct InMemoryContent {
    items: Mutex<Vec<(String, ContentItem)>>,
    queries: AtomicUsize,
}

impl InMemoryContent {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Store `item` as being in `workflow_step`.
    pub fn insert<S: Into<String>>(&self, workflow_step: S, item: ContentItem) -> Result<(), CoreError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| CoreError::Query("mutex poisoned".into()))?;
        items.push((workflow_step.into(), item));
        Ok(())
    }

    /// Number of `list_items` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryContent {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentQuery for InMemoryContent {
    async fn list_items(
        &self,
        type_codename: &str,
        workflow_step: &str,
    ) -> Result<Vec<ContentItem>, CoreError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let items = self
            .items
            .lock()
            .map_err(|_| CoreError::Query("mutex poisoned".into()))?;
        Ok(items
            .iter()
            .filter(|(step, item)| step == workflow_step && item.type_codename() == type_codename)
            .map(|(_, item)| item.clone())
            .collect())
    }
}

/// Fixed set of published URLs.
#[derive(Clone, Debug, Default)]
pub struct StaticPublishedUrls {
    urls: BTreeSet<NormalizedUrl>,
}

impl StaticPublishedUrls {
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(paths: I) -> Self {
        Self {
            urls: paths.into_iter().filter_map(NormalizedUrl::new).collect(),
        }
    }
}

impl PublishedUrls for StaticPublishedUrls {
    async fn published_urls(&self) -> Result<BTreeSet<NormalizedUrl>, CoreError> {
        Ok(self.urls.clone())
    }
}

/// Backend whose every query fails, for exercising the fail-open path.
#[derive(Clone, Debug, Default)]
pub struct FailingBackend;

impl ContentQuery for FailingBackend {
    async fn list_items(&self, _: &str, _: &str) -> Result<Vec<ContentItem>, CoreError> {
        Err(CoreError::Query("backend unavailable".into()))
    }
}

impl PublishedUrls for FailingBackend {
    async fn published_urls(&self) -> Result<BTreeSet<NormalizedUrl>, CoreError> {
        Err(CoreError::Query("backend unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_type_and_step() {
        let store = InMemoryContent::new();
        store
            .insert("published", ContentItem::new("a", "url_redirect"))
            .unwrap();
        store
            .insert("draft", ContentItem::new("b", "url_redirect"))
            .unwrap();
        store
            .insert("published", ContentItem::new("c", "article"))
            .unwrap();

        let got = store.list_items("url_redirect", "published").await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id(), "a");
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn static_urls_are_normalized() {
        let urls = StaticPublishedUrls::new(["/About/", "", "/"]);
        let set = urls.published_urls().await.unwrap();
        let got: Vec<&str> = set.iter().map(|u| u.as_str()).collect();
        assert_eq!(got, vec!["/", "/about"]);
    }

    #[tokio::test]
    async fn failing_backend_fails() {
        assert!(FailingBackend.list_items("x", "y").await.is_err());
        assert!(FailingBackend.published_urls().await.is_err());
    }
}
