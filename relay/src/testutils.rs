use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Local stand-in for the ingestion endpoint. Answers every request with a
/// fixed status and body, and records what it received.
pub struct TestUpstream {
    pub url: Url,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl TestUpstream {
    pub async fn spawn(status: StatusCode, body: &'static str) -> Self {
        Self::spawn_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn spawn_with_delay(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = requests.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let captured = captured.clone();

                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let captured = captured.clone();
                        async move {
                            let header = |name: HeaderName| {
                                req.headers()
                                    .get(name)
                                    .and_then(|v| v.to_str().ok())
                                    .map(str::to_owned)
                            };
                            let authorization = header(AUTHORIZATION);
                            let content_type = header(CONTENT_TYPE);

                            let bytes = req
                                .into_body()
                                .collect()
                                .await
                                .map(|collected| collected.to_bytes())
                                .unwrap_or_default();

                            captured.lock().unwrap().push(CapturedRequest {
                                authorization,
                                content_type,
                                body: String::from_utf8_lossy(&bytes).into_owned(),
                            });

                            tokio::time::sleep(delay).await;

                            let mut response = Response::new(Full::new(Bytes::from_static(
                                body.as_bytes(),
                            )));
                            *response.status_mut() = status;
                            Ok::<_, Infallible>(response)
                        }
                    });

                    let _ = Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        let url = Url::parse(&format!("http://127.0.0.1:{port}/api/v1/push/influx/write"))
            .expect("Failed to parse URL");

        TestUpstream { url, requests }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// A local port that was free when this returned.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// A URL on a local port nothing listens on.
pub async fn unused_local_url() -> Url {
    let port = free_port().await;
    Url::parse(&format!("http://127.0.0.1:{port}/write")).unwrap()
}
