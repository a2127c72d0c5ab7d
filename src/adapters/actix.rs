//! actix-web request logging middleware and `RequestLogger` extractor

use super::request::{
    incoming_details, parse_traceparent, request_context, resolve_request_id, RequestCompletion,
    RequestLogger, RequestLoggingConfig, REQUEST_ID_HEADER, TRACEPARENT_HEADER,
};
use crate::core::Logger;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderMap, HeaderName, HeaderValue},
    web::{Bytes, BytesMut},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::{future::LocalBoxFuture, StreamExt};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Request logging middleware for `App::wrap`
///
/// # Example
///
/// ```
/// use actix_web::{web, App, HttpResponse};
/// use structured_logger::adapters::{actix::RequestLogging, RequestLogger, RequestLoggingConfig};
/// use structured_logger::Logger;
///
/// async fn handler(log: RequestLogger) -> HttpResponse {
///     log.info("handling");
///     HttpResponse::Ok().finish()
/// }
///
/// let app = App::new()
///     .wrap(RequestLogging::new(Logger::new(), RequestLoggingConfig::default()))
///     .route("/", web::get().to(handler));
/// ```
#[derive(Clone)]
pub struct RequestLogging {
    logger: Logger,
    config: Arc<RequestLoggingConfig>,
}

impl RequestLogging {
    pub fn new(logger: Logger, config: RequestLoggingConfig) -> Self {
        Self {
            logger,
            config: Arc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggingMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware {
            service: Rc::new(service),
            logger: self.logger.clone(),
            config: Arc::clone(&self.config),
        }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: Rc<S>,
    logger: Logger,
    config: Arc<RequestLoggingConfig>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Read the whole payload and put an identical one back on the request
async fn buffer_payload(req: &mut ServiceRequest) -> Result<Bytes, Error> {
    let mut payload = req.take_payload();
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        body.extend_from_slice(&chunk?);
    }
    let body = body.freeze();

    let (_, mut replay) = actix_http::h1::Payload::create(true);
    replay.unread_data(body.clone());
    req.set_payload(replay.into());
    Ok(body)
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let config = Arc::clone(&self.config);
        let base_logger = self.logger.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            if config.should_skip(&path) {
                return service.call(req).await;
            }

            let headers = req.headers();
            let request_id = resolve_request_id(header_str(headers, REQUEST_ID_HEADER));
            let trace = header_str(headers, TRACEPARENT_HEADER).and_then(parse_traceparent);
            let method = req.method().to_string();
            let content_length = header_str(headers, header::CONTENT_LENGTH.as_str())
                .and_then(|v| v.trim().parse::<u64>().ok());

            let logger = base_logger
                .with_context(request_context(&request_id, &method, &path, trace.as_ref()));
            let completion = RequestCompletion::start(logger.clone());

            let header_json = config.log_headers.then(|| {
                config.redact_headers(
                    req.headers()
                        .iter()
                        .map(|(name, value)| (name.as_str(), value.as_bytes())),
                )
            });
            let query = req.query_string().to_string();

            let mut body_json = None;
            if config.should_buffer_body(content_length) {
                match buffer_payload(&mut req).await {
                    Ok(bytes) => body_json = config.body_for_log(&bytes),
                    Err(e) => {
                        completion.fail(Some(400), &e.to_string());
                        return Err(e);
                    }
                }
            }

            logger.info_with_context(
                "Incoming request",
                incoming_details(&config, header_json, Some(query.as_str()), body_json),
            );
            req.extensions_mut().insert(RequestLogger(logger));

            match service.call(req).await {
                Ok(mut res) => {
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        res.headers_mut()
                            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }
                    let status = res.status().as_u16();
                    match res.response().error() {
                        Some(err) => completion.fail(Some(status), &err.to_string()),
                        None => completion.complete(status),
                    }
                    Ok(res)
                }
                Err(err) => {
                    let status = err.as_response_error().status_code().as_u16();
                    completion.fail(Some(status), &err.to_string());
                    Err(err)
                }
            }
        })
    }
}

impl FromRequest for RequestLogger {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestLogger>()
                .cloned()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError(
                        "request logging middleware is not installed",
                    )
                }),
        )
    }
}
