//! axum request logging middleware, `RequestLogger` extractor and the
//! client log ingest handler

use super::request::{
    incoming_details, parse_traceparent, request_context, resolve_request_id, RequestCompletion,
    RequestLogger, RequestLoggingConfig, REQUEST_ID_HEADER, TRACEPARENT_HEADER,
};
use crate::core::{keys, Logger};
use crate::transports::RemoteBatch;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;

/// State of the request logging middleware
#[derive(Clone)]
pub struct RequestLoggingState {
    logger: Logger,
    config: Arc<RequestLoggingConfig>,
}

impl RequestLoggingState {
    pub fn new(logger: Logger, config: RequestLoggingConfig) -> Self {
        Self {
            logger,
            config: Arc::new(config),
        }
    }
}

/// Wrap every route of `router` with request logging
///
/// # Example
///
/// ```
/// use axum::{routing::get, Router};
/// use structured_logger::adapters::{axum::with_request_logging, RequestLogger, RequestLoggingConfig};
/// use structured_logger::Logger;
///
/// async fn handler(RequestLogger(log): RequestLogger) -> &'static str {
///     log.info("handling");
///     "ok"
/// }
///
/// let app: Router = with_request_logging(
///     Router::new().route("/", get(handler)),
///     Logger::new(),
///     RequestLoggingConfig::default().skip_path("/health"),
/// );
/// ```
pub fn with_request_logging<S>(
    router: Router<S>,
    logger: Logger,
    config: RequestLoggingConfig,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(
        RequestLoggingState::new(logger, config),
        request_logging,
    ))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, header::CONTENT_LENGTH.as_str()).and_then(|v| v.trim().parse().ok())
}

/// Middleware function, for use with `axum::middleware::from_fn_with_state`
pub async fn request_logging(
    State(state): State<RequestLoggingState>,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &state.config;
    let path = request.uri().path().to_string();
    if config.should_skip(&path) {
        return next.run(request).await;
    }

    let headers = request.headers();
    let request_id = resolve_request_id(header_str(headers, REQUEST_ID_HEADER));
    let trace = header_str(headers, TRACEPARENT_HEADER).and_then(parse_traceparent);
    let method = request.method().to_string();

    let logger = state
        .logger
        .with_context(request_context(&request_id, &method, &path, trace.as_ref()));
    let completion = RequestCompletion::start(logger.clone());

    let header_json = config.log_headers.then(|| {
        config.redact_headers(headers.iter().map(|(name, value)| (name.as_str(), value.as_bytes())))
    });
    let query = request.uri().query().map(str::to_string);

    let mut body_json = None;
    if config.should_buffer_body(content_length(request.headers())) {
        let (parts, body) = request.into_parts();
        match axum::body::to_bytes(body, config.max_body_size).await {
            Ok(bytes) => {
                body_json = config.body_for_log(&bytes);
                request = Request::from_parts(parts, Body::from(bytes));
            }
            Err(e) => {
                completion.fail(Some(StatusCode::BAD_REQUEST.as_u16()), &e.to_string());
                return (StatusCode::BAD_REQUEST, "invalid request body").into_response();
            }
        }
    }

    logger.info_with_context(
        "Incoming request",
        incoming_details(config, header_json, query.as_deref(), body_json),
    );

    request.extensions_mut().insert(RequestLogger(logger));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    completion.complete(response.status().as_u16());
    response
}

impl<S> FromRequestParts<S> for RequestLogger
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestLogger>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "request logging middleware is not installed",
        ))
    }
}

/// Accept a client-shipped batch and re-emit every entry server-side
///
/// Entries keep their level, message and timestamp, are tagged
/// `component: client` and carry the batch labels. Mount it with the
/// server logger as state:
///
/// ```
/// use axum::{routing::post, Router};
/// use structured_logger::adapters::axum::client_log_ingest;
/// use structured_logger::Logger;
///
/// let app: Router = Router::new()
///     .route("/logs", post(client_log_ingest))
///     .with_state(Logger::new());
/// ```
pub async fn client_log_ingest(
    State(logger): State<Logger>,
    Json(batch): Json<RemoteBatch>,
) -> impl IntoResponse {
    let received = batch.logs.len();

    for entry in &batch.logs {
        let mut labels = batch.labels.clone();
        if let Some(own) = entry.labels() {
            labels.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let relayed = entry
            .derive_with_field(keys::COMPONENT, "client")
            .with_labels(labels);
        logger.log_entry(&relayed);
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "received": received })),
    )
}
