use std::time::Duration;
use thiserror::Error;

/// Port probed when the `healthcheck` subcommand is given none.
const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Error, Debug)]
pub enum HealthcheckError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Health endpoint returned status: {0}")]
    Unhealthy(reqwest::StatusCode),
}

/// Probes `/healthz` over loopback. Used by the `healthcheck` subcommand so
/// container liveness checks work without a shell or curl in the image.
pub async fn healthcheck() -> Result<(), HealthcheckError> {
    healthcheck_with_port(DEFAULT_HTTP_PORT).await
}

pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(HealthcheckError::Client)?;

    let resp = client
        .get(format!("http://127.0.0.1:{port}/healthz"))
        .send()
        .await
        .map_err(HealthcheckError::Request)?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(HealthcheckError::Unhealthy(resp.status()))
    }
}
