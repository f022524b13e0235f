use crate::batch::BatchRunner;
use crate::config::{Limits, RelatedConfig};
use crate::envelope::{ErrorBody, ResultEnvelope};
use crate::errors::RequestError;
use crate::metrics_defs::{REJECTED_REQUESTS, REQUEST_DURATION};
use crate::related;
use crate::request::{self, KeywordRequest};
use estimator::{DeviceHint, VolumeEstimator};
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::http::add_cors_headers;
use shared::{counter, histogram};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub const KEYWORDS_PATH: &str = "/api/keywords";
pub const RELATED_KEYWORDS_PATH: &str = "/api/related-keywords";

/// Serves the keyword endpoints. Cheap to clone.
#[derive(Clone)]
pub struct KeywordApiService {
    inner: Arc<Inner>,
}

struct Inner {
    runner: BatchRunner,
    limits: Limits,
    related: RelatedConfig,
}

impl KeywordApiService {
    pub fn new(estimator: Arc<VolumeEstimator>, limits: Limits, related: RelatedConfig) -> Self {
        let runner = BatchRunner::new(estimator, limits.inter_keyword_delay());
        KeywordApiService {
            inner: Arc::new(Inner {
                runner,
                limits,
                related,
            }),
        }
    }

    /// Routes a request whose body has already been read.
    pub async fn handle(&self, req: Request<Bytes>) -> Response<Bytes> {
        let start = Instant::now();
        let route = route_name(req.uri().path());

        let mut response = match self.dispatch(req).await {
            Ok(response) => response,
            Err(e) => {
                if e.status() == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(route, error = %e, "Request failed");
                } else {
                    tracing::info!(route, status = e.status().as_u16(), error = %e, "Request rejected");
                    counter!(REJECTED_REQUESTS, "status" => e.status().as_str().to_string())
                        .increment(1);
                }
                error_response(&e)
            }
        };
        add_cors_headers(response.headers_mut());

        histogram!(
            REQUEST_DURATION,
            "status" => response.status().as_str().to_string(),
            "route" => route
        )
        .record(start.elapsed().as_secs_f64());
        response
    }

    async fn dispatch(&self, req: Request<Bytes>) -> Result<Response<Bytes>, RequestError> {
        let limits = &self.inner.limits;

        match (req.method(), req.uri().path()) {
            (&Method::OPTIONS, _) => Ok(Response::new(Bytes::new())),
            (&Method::GET, KEYWORDS_PATH) => {
                let request = request::from_query(req.uri().query(), limits)?;
                self.run_batch(request).await
            }
            (&Method::POST, KEYWORDS_PATH) => {
                let request = request::from_json(req.body(), limits)?;
                self.run_batch(request).await
            }
            (&Method::POST, RELATED_KEYWORDS_PATH) => {
                let seed = request::related_seed(req.body())?;
                let related = &self.inner.related;
                let keywords = related::candidates(&seed, &related.suffixes, related.max_candidates);
                let results = self.inner.runner.run(&keywords, DeviceHint::All).await;
                json_response(
                    StatusCode::OK,
                    &ResultEnvelope::success(keywords, DeviceHint::All, results),
                )
            }
            (_, KEYWORDS_PATH | RELATED_KEYWORDS_PATH) => Err(RequestError::MethodNotAllowed),
            _ => Err(RequestError::NotFound),
        }
    }

    async fn run_batch(&self, request: KeywordRequest) -> Result<Response<Bytes>, RequestError> {
        tracing::info!(
            count = request.keywords().len(),
            device = request.device().as_str(),
            "Running keyword batch"
        );
        let results = self
            .inner
            .runner
            .run(request.keywords(), request.device())
            .await;

        let envelope = ResultEnvelope::success(request.keywords().to_vec(), request.device(), results);
        json_response(StatusCode::OK, &envelope)
    }
}

impl Service<Request<Incoming>> for KeywordApiService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let response = match read_body(body, service.inner.limits.max_body_bytes).await {
                Ok(bytes) => service.handle(Request::from_parts(parts, bytes)).await,
                Err(error) => {
                    match &error {
                        RequestError::BodyTooLarge { .. } => {
                            tracing::info!(error = %error, "Request body rejected");
                            counter!(REJECTED_REQUESTS, "status" => error.status().as_str().to_string())
                                .increment(1);
                        }
                        _ => tracing::error!(error = %error, "Could not read request body"),
                    }
                    let mut response = error_response(&error);
                    add_cors_headers(response.headers_mut());
                    response
                }
            };
            Ok(response.map(Full::new))
        })
    }
}

/// Reads the whole body, giving up once it grows past `limit` bytes.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, RequestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RequestError::BodyTooLarge { limit }),
        Err(e) => Err(RequestError::BodyRead(e.to_string())),
    }
}

fn route_name(path: &str) -> &'static str {
    match path {
        KEYWORDS_PATH => "keywords",
        RELATED_KEYWORDS_PATH => "related_keywords",
        _ => "other",
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Bytes>, RequestError> {
    let mut response = Response::new(Bytes::from(serde_json::to_vec(body)?));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    Ok(response)
}

fn error_response(error: &RequestError) -> Response<Bytes> {
    let body = ErrorBody::from(error);
    json_response(error.status(), &body).unwrap_or_else(|_| {
        shared::http::make_error_response(error.status())
    })
}
