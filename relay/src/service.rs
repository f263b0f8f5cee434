//! The tablet facing HTTP endpoint.
//!
//! Every path behaves the same:
//!
//! - `OPTIONS` answers the CORS preflight with 204 and no body.
//! - `GET` reports that the relay is up and whether the upstream is configured.
//! - `POST {"test": true}` relays a single probe line.
//! - `POST` with a telemetry record encodes and relays it.
//!
//! All other responses are JSON, `{"success": true, ...}` or
//! `{"success": false, "error": "..."}`, and every response carries the CORS
//! headers so the browser on the tablet can read it.

use crate::config::{Config, ProbeConfig};
use crate::errors::{RelayError, RelayOutcome, ServerError};
use crate::metrics_defs::{
    LINES_ENCODED, RELAY_DURATION, REQUEST_DURATION, REQUESTS, REQUESTS_INFLIGHT,
};
use crate::upstream::LineSink;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ALLOW, CONTENT_TYPE, HeaderMap, HeaderValue,
};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::{counter, gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{LineEncoder, TelemetryRecord, encode_probe, to_payload};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

#[derive(Serialize)]
struct StatusBody {
    success: bool,
    message: &'static str,
    version: &'static str,
    upstream_configured: bool,
}

#[derive(Serialize)]
struct SuccessBody {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines: Option<usize>,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// What a successfully handled request answers with.
enum Reply {
    Preflight,
    Status,
    Connected,
    Accepted { lines: usize },
}

struct Inner {
    sink: Arc<dyn LineSink>,
    encoder: LineEncoder,
    probe: ProbeConfig,
    max_body_bytes: usize,
}

#[derive(Clone)]
pub struct RelayService {
    inner: Arc<Inner>,
}

impl RelayService {
    pub fn new(config: &Config, sink: Arc<dyn LineSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                encoder: LineEncoder::new(config.encoder.clone()),
                probe: config.probe.clone(),
                max_body_bytes: config.max_body_bytes,
            }),
        }
    }

    /// Handles one request. Never fails: errors become JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let inflight = InflightRequest::start(&method);
        let result = match method {
            Method::OPTIONS => Ok(Reply::Preflight),
            Method::GET => Ok(Reply::Status),
            Method::POST => self.submit(req.into_body()).await,
            ref other => Err(RelayError::MethodNotAllowed(other.to_string())),
        };
        inflight.finish(match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        });

        match result {
            Ok(reply) => self.reply(reply),
            Err(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    tracing::error!(%method, %path, error = %e, "request failed");
                } else {
                    tracing::warn!(%method, %path, error = %e, "request rejected");
                }
                error_response(&e)
            }
        }
    }

    async fn submit<B>(&self, body: B) -> Result<Reply, RelayError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let bytes = read_body(body, self.inner.max_body_bytes).await?;
        let record = TelemetryRecord::from_slice(&bytes)?;

        if record.is_test() {
            let probe = encode_probe(&self.inner.probe.measurement, &self.inner.probe.source);
            self.relay(probe.to_string()).await?;
            tracing::info!("connectivity probe relayed");
            return Ok(Reply::Connected);
        }

        let lines = self.inner.encoder.encode(&record)?;
        for line in &lines {
            counter!(LINES_ENCODED, "measurement" => line.measurement().to_owned()).increment(1);
        }

        self.relay(to_payload(&lines)).await?;
        tracing::info!(lines = lines.len(), "telemetry relayed");
        Ok(Reply::Accepted { lines: lines.len() })
    }

    async fn relay(&self, payload: String) -> RelayOutcome {
        let started = Instant::now();
        let result = self.inner.sink.send(payload).await;

        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) => e.kind(),
        };
        histogram!(RELAY_DURATION, "outcome" => outcome).record(started.elapsed().as_secs_f64());

        result
    }

    fn reply(&self, reply: Reply) -> Response<Full<Bytes>> {
        match reply {
            Reply::Preflight => {
                let mut response = Response::new(Full::new(Bytes::new()));
                *response.status_mut() = StatusCode::NO_CONTENT;
                add_cors_headers(response.headers_mut());
                response
            }
            Reply::Status => json_response(
                StatusCode::OK,
                &StatusBody {
                    success: true,
                    message: "MPU relay running",
                    version: env!("CARGO_PKG_VERSION"),
                    upstream_configured: self.inner.sink.is_configured(),
                },
            ),
            Reply::Connected => json_response(
                StatusCode::OK,
                &SuccessBody {
                    success: true,
                    message: "Connected!",
                    lines: None,
                },
            ),
            Reply::Accepted { lines } => json_response(
                StatusCode::OK,
                &SuccessBody {
                    success: true,
                    message: "Data sent",
                    lines: Some(lines),
                },
            ),
        }
    }
}

/// Keeps `requests.inflight` balanced. A request whose future is dropped
/// before [`InflightRequest::finish`] (client gone, connection closed) is
/// counted with the `cancelled` outcome.
struct InflightRequest {
    method: String,
    started: Instant,
    outcome: &'static str,
}

impl InflightRequest {
    fn start(method: &Method) -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        Self {
            method: method.to_string(),
            started: Instant::now(),
            outcome: "cancelled",
        }
    }

    fn finish(mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl Drop for InflightRequest {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
        counter!(REQUESTS, "method" => self.method.clone(), "outcome" => self.outcome)
            .increment(1);
        histogram!(REQUEST_DURATION, "outcome" => self.outcome)
            .record(self.started.elapsed().as_secs_f64());
    }
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, RelayError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RelayError::BodyTooLarge(limit)),
        Err(e) => Err(RelayError::RequestBody(e.to_string())),
    }
}

fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"success":false,"error":"internal error"}"#),
            )
        }
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    add_cors_headers(headers);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(error: &RelayError) -> Response<Full<Bytes>> {
    let mut response = json_response(
        error.status_code(),
        &ErrorBody {
            success: false,
            error: error.to_string(),
        },
    );
    if matches!(error, RelayError::MethodNotAllowed(_)) {
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    }
    response
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<BoxBody<Bytes, ServerError>>;
    type Error = ServerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            let response = service.handle(req).await;
            Ok(response.map(|body| body.map_err(|e| match e {}).boxed()))
        })
    }
}
