mod retry;

pub use retry::RetryPolicy;

use crate::batch::{Batch, BatchSink};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Response statuses the collector may answer with that count as delivery.
const ACCEPTED_STATUSES: [StatusCode; 2] = [StatusCode::OK, StatusCode::ACCEPTED];

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Collector rejected batch: HTTP {status}")]
    Rejected { status: u16 },
    #[error("Batch delivery failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
    #[error("Batch is empty")]
    EmptyBatch,
}

/// Terminal outcome of a successful delivery, used for logging only.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub batch_id: String,
    pub batch_size: usize,
    pub attempts: u32,
    pub status: u16,
    pub elapsed: Duration,
}

/// Delivers one immutable batch to the downstream collector.
///
/// The batch is serialized once as a JSON array (record order matches
/// accumulation order) and posted up to the policy's attempt budget, with
/// the policy's flat delay between failed attempts. Every attempt is bounded
/// by the configured request timeout.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        endpoint: &str,
        policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| DispatchError::InvalidEndpoint(format!("'{endpoint}': {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            policy,
        })
    }

    /// Attempts delivery until it succeeds or the attempt budget runs out.
    ///
    /// `Exhausted` is not a per-batch error: the caller is expected to treat
    /// it as fatal for the whole process (see [`HttpDispatcher`]).
    pub async fn dispatch(&self, batch: Batch) -> Result<DispatchReport, DispatchError> {
        if batch.is_empty() {
            return Err(DispatchError::EmptyBatch);
        }

        let batch_id = batch.id().to_string();
        let batch_size = batch.len();
        let created_at = batch.created_at();
        let payload = serde_json::to_vec(batch.records())?;

        let start = Instant::now();
        let mut last_failure = String::new();

        for attempt in 1..=self.policy.max_attempts {
            info!(batch_id = %batch_id, batch_size, attempt, "sending batch");

            match self.try_send(&payload).await {
                Ok(status) => {
                    let report = DispatchReport {
                        batch_id,
                        batch_size,
                        attempts: attempt,
                        status,
                        elapsed: start.elapsed(),
                    };
                    info!(
                        batch_id = %report.batch_id,
                        batch_size,
                        status,
                        attempts = attempt,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        queued_ms = created_at.elapsed().as_millis() as u64,
                        "batch sent"
                    );
                    return Ok(report);
                }
                Err(err) => {
                    last_failure = err.to_string();
                    if !self.policy.is_final(attempt) {
                        warn!(
                            batch_id = %batch_id,
                            batch_size,
                            attempt,
                            error = %last_failure,
                            "batch send failed, retrying"
                        );
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(DispatchError::Exhausted {
            attempts: self.policy.max_attempts,
            last: last_failure,
        })
    }

    async fn try_send(&self, payload: &[u8]) -> Result<u16, DispatchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if ACCEPTED_STATUSES.contains(&status) {
            Ok(status.as_u16())
        } else {
            Err(DispatchError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

/// [`BatchSink`] that spawns one delivery task per flushed batch.
///
/// There is no cap on in-flight deliveries; concurrency is bounded only by
/// production rate and the retry delay. The tracker exists so shutdown can
/// wait for outstanding sends, never to limit them.
#[derive(Clone)]
pub struct HttpDispatcher {
    dispatcher: Dispatcher,
    tracker: TaskTracker,
}

impl HttpDispatcher {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            tracker: TaskTracker::new(),
        }
    }

    /// Closes the tracker and waits for every in-flight delivery to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl BatchSink for HttpDispatcher {
    fn dispatch(&self, batch: Batch) {
        let dispatcher = self.dispatcher.clone();
        self.tracker.spawn(async move {
            if let Err(err) = dispatcher.dispatch(batch).await {
                // Exhausting the retry budget is a service-level fault, not
                // a per-batch one: the whole process goes down with it.
                error!(error = %err, "batch delivery failed permanently, exiting");
                std::process::exit(1);
            }
        });
    }
}
