use tracing::{debug, error, info};

use crate::validate::{relative_target, source_conflict, target_published};
use crate::{
    ContentItem, ContentQuery, CoreError, PublishedUrls, ValidationResult, WebhookEvent,
};

/// Knobs for the validator. Defaults match the stock redirect content model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Codename of the redirect content type.
    pub redirect_type: String,
    /// Codename of the workflow step whose items count as live.
    pub published_step: String,
    /// Also require the target to be a published site-relative URL.
    pub validate_target: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            redirect_type: "url_redirect".into(),
            published_step: "published".into(),
            validate_target: false,
        }
    }
}

/// Application service deciding whether a redirect item may be published.
///
/// Generic over the two read-only CMS queries so tests can swap in the
/// in-memory adapters. Holds no mutable state; one instance serves every
/// request.
pub struct RedirectValidator<Q: ContentQuery, U: PublishedUrls> {
    content: Q,
    urls: U,
    options: ValidatorOptions,
}

impl<Q: ContentQuery, U: PublishedUrls> RedirectValidator<Q, U> {
    pub fn new(content: Q, urls: U, options: ValidatorOptions) -> Self {
        Self {
            content,
            urls,
            options,
        }
    }

    /// Validate a raw webhook body. Never fails: infrastructure errors are
    /// logged and turned into a passing verdict so editors are not locked out.
    pub async fn handle(&self, body: &[u8]) -> ValidationResult {
        match self.try_handle(body).await {
            Ok(result) => result,
            Err(e) => {
                error!(err = %e, "redirect validation error; allowing publish");
                ValidationResult::valid()
            }
        }
    }

    /// Validate a raw webhook body, surfacing infrastructure errors.
    pub async fn try_handle(&self, body: &[u8]) -> Result<ValidationResult, CoreError> {
        let event = WebhookEvent::parse(body)?;
        match event.first_item()? {
            Some(item) => self.validate_item(&item).await,
            None => {
                debug!("event without items; nothing to validate");
                Ok(ValidationResult::valid())
            }
        }
    }

    /// Run the checks for one item. The first failing check wins.
    pub async fn validate_item(&self, item: &ContentItem) -> Result<ValidationResult, CoreError> {
        if item.type_codename() != self.options.redirect_type {
            debug!(item_id = %item.id(), content_type = %item.type_codename(), "not a redirect; skipping");
            return Ok(ValidationResult::valid());
        }

        if let Some(result) = self.check_sources(item).await? {
            return Ok(result);
        }
        if self.options.validate_target {
            if let Some(result) = self.check_target(item).await? {
                return Ok(result);
            }
        }

        debug!(item_id = %item.id(), "redirect ok");
        Ok(ValidationResult::valid())
    }

    async fn check_sources(&self, item: &ContentItem) -> Result<Option<ValidationResult>, CoreError> {
        let sources = item.source_urls()?;
        if sources.is_empty() {
            return Ok(None);
        }

        let published = self
            .content
            .list_items(&self.options.redirect_type, &self.options.published_step)
            .await?;
        debug!(item_id = %item.id(), published = published.len(), "loaded published redirects");

        Ok(source_conflict(item.id(), &sources, &published)?.map(|msg| {
            info!(item_id = %item.id(), reason = %msg.message, "duplicate source url");
            ValidationResult::rejected(msg)
        }))
    }

    async fn check_target(&self, item: &ContentItem) -> Result<Option<ValidationResult>, CoreError> {
        let target = match relative_target(item.target_url()?) {
            Ok(t) => t,
            Err(msg) => {
                info!(item_id = %item.id(), reason = %msg.message, "target url not relative");
                return Ok(Some(ValidationResult::rejected(msg)));
            }
        };

        let published = self.urls.published_urls().await?;
        Ok(target_published(&target, &published).map(|msg| {
            info!(item_id = %item.id(), target = %target, "target url not published");
            ValidationResult::rejected(msg)
        }))
    }
}
