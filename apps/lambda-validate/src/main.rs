//! lambda-validate — AWS Lambda entrypoint for the CMS redirect validation webhook.
//!
//! Purpose
//! - Handle API Gateway HTTP API (v2) events carrying the CMS webhook body.
//! - Run the `RedirectValidator` backed by the Kontent.ai adapter.
//! - Always answer `200` with the JSON verdict; failures inside the validator
//!   are logged and turned into `isValid: true`.
//!
//! Environment
//! - `KONTENT_*`: see the `kontent-client` crate.
//! - `REDIRECT_TYPE`, `PUBLISHED_STEP`: content model codenames.
//! - `VALIDATE_TARGET_URL`: truthy to also check target URLs.
//!
//! Notes
//! - Clients are built once per cold start and shared by all invocations.
//! - It initializes minimal `tracing` logging compatible with Lambda CloudWatch.

use std::sync::Arc;

use domain::service::{RedirectValidator, ValidatorOptions};
use domain::{ContentQuery, PublishedUrls};
use http_common::lambda::validation_resp;
use kontent_client::KontentClient;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    // Build client from env; if it fails, crash early to surface misconfiguration.
    let client = KontentClient::from_env().map_err(|e| format!("kontent init error: {e}"))?;
    let options = options_from_env();
    info!(
        redirect_type = %options.redirect_type,
        published_step = %options.published_step,
        validate_target = options.validate_target,
        "validator configured"
    );
    let validator = Arc::new(RedirectValidator::new(client.clone(), client, options));

    let handler = service_fn(move |req: Request| {
        let v = validator.clone();
        async move { handle_request(&v, req).await }
    });
    run(handler).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
        .init();
}

fn options_from_env() -> ValidatorOptions {
    let defaults = ValidatorOptions::default();
    let non_empty = |name: &str| std::env::var(name).ok().filter(|s| !s.trim().is_empty());
    ValidatorOptions {
        redirect_type: non_empty("REDIRECT_TYPE").unwrap_or(defaults.redirect_type),
        published_step: non_empty("PUBLISHED_STEP").unwrap_or(defaults.published_step),
        validate_target: http_common::env_flag("VALIDATE_TARGET_URL"),
    }
}

async fn handle_request<Q, U>(
    validator: &RedirectValidator<Q, U>,
    req: Request,
) -> Result<Response<Body>, Error>
where
    Q: ContentQuery,
    U: PublishedUrls,
{
    let payload: &[u8] = req.body();
    let result = validator.handle(payload).await;
    if result.is_valid {
        info!(method = %req.method(), "redirect accepted");
    } else {
        warn!(method = %req.method(), messages = result.messages.len(), "redirect rejected");
    }
    validation_resp(&result)
}
