//! HTTP front of the keyword research backend.
//!
//! Accepts keyword lists, validates them and runs them through the
//! [`estimator::VolumeEstimator`] one by one, answering with a
//! [`envelope::ResultEnvelope`].

pub mod batch;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod metrics_defs;
pub mod related;
pub mod request;
pub mod service;

pub use errors::KeywordApiError;

use estimator::VolumeEstimator;
use estimator::config::Credentials;
use service::KeywordApiService;
use shared::admin_service::AdminService;
use shared::http::{bind_listener, serve_http_service};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;

pub async fn run(config: config::Config, credentials: Credentials) -> Result<(), KeywordApiError> {
    config.validate()?;

    let estimator = Arc::new(VolumeEstimator::from_config(
        &config.estimator,
        &credentials,
    )?);
    let service = KeywordApiService::new(estimator, config.limits.clone(), config.related.clone());

    let api_listener = bind_listener(&config.listener.host, config.listener.port).await?;
    let admin_listener =
        bind_listener(&config.admin_listener.host, config.admin_listener.port).await?;

    tracing::info!(
        max_keywords = config.limits.max_keywords,
        inter_keyword_delay_ms = config.limits.inter_keyword_delay_ms,
        "Keyword API started"
    );
    serve(api_listener, admin_listener, service).await
}

/// Serves both bound listeners. Readiness flips once both are accepting.
async fn serve(
    api_listener: TcpListener,
    admin_listener: TcpListener,
    service: KeywordApiService,
) -> Result<(), KeywordApiError> {
    let ready = Arc::new(AtomicBool::new(false));
    let admin_ready = ready.clone();
    let admin_service = AdminService::new(move || admin_ready.load(Ordering::Relaxed));

    let api_task = serve_http_service::<_, _, KeywordApiError>(api_listener, service);
    let admin_task = serve_http_service::<_, _, KeywordApiError>(admin_listener, admin_service);

    ready.store(true, Ordering::Relaxed);
    tokio::try_join!(api_task, admin_task)?;
    Ok(())
}
