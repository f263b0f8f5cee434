pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod testutils;

use errors::ServerError;
use service::RelayService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use upstream::{LineSink, UpstreamClient};

/// Runs the relay until a listener fails or the process receives Ctrl-C.
pub async fn run(config: config::Config) -> Result<(), ServerError> {
    let missing = config.upstream.missing();
    if !missing.is_empty() {
        tracing::warn!(
            ?missing,
            "upstream is not fully configured, submissions will be rejected"
        );
    }

    let sink: Arc<dyn LineSink> = Arc::new(UpstreamClient::new(config.upstream.clone())?);
    let upstream_configured = sink.is_configured();
    let relay_service = RelayService::new(&config, sink);

    let relay_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        relay_service,
    );
    let admin_task = async {
        match &config.admin_listener {
            Some(listener) => {
                let admin_service =
                    AdminService::<_, ServerError>::new(move || upstream_configured);
                run_http_service(&listener.host, listener.port, admin_service).await
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = async { tokio::try_join!(relay_task, admin_task) } => result.map(|_| ()),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl-C, shutting down");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Listener, UpstreamConfig};
    use crate::testutils::{free_port, unused_local_url};
    use serde_json::Value;
    use std::time::Duration;

    fn local(port: u16) -> Listener {
        Listener {
            host: "127.0.0.1".into(),
            port,
        }
    }

    async fn get_when_listening(client: &reqwest::Client, url: &str) -> reqwest::Response {
        for _ in 0..100 {
            if let Ok(response) = client.get(url).send().await {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("nothing listening at {url}");
    }

    /// Runs the relay with both listeners and returns the admin `/ready`
    /// status together with `upstream_configured` from the relay's GET.
    async fn readiness(mut config: Config) -> (u16, bool) {
        let relay_port = free_port().await;
        let admin_port = free_port().await;
        config.listener = local(relay_port);
        config.admin_listener = Some(local(admin_port));

        let check = async {
            let client = reqwest::Client::new();
            let ready =
                get_when_listening(&client, &format!("http://127.0.0.1:{admin_port}/ready")).await;
            let status: Value =
                get_when_listening(&client, &format!("http://127.0.0.1:{relay_port}/"))
                    .await
                    .json()
                    .await
                    .unwrap();
            (
                ready.status().as_u16(),
                status["upstream_configured"].as_bool().unwrap(),
            )
        };

        tokio::select! {
            result = run(config) => panic!("relay stopped: {result:?}"),
            outcome = check => outcome,
        }
    }

    #[tokio::test]
    async fn test_ready_without_credentials() {
        assert_eq!(readiness(Config::default()).await, (503, false));
    }

    #[tokio::test]
    async fn test_ready_with_credentials() {
        let config = Config {
            upstream: UpstreamConfig {
                url: Some(unused_local_url().await),
                user: Some("user".into()),
                api_key: Some("key".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(readiness(config).await, (200, true));
    }
}
