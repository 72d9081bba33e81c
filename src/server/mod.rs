use crate::domain::EventRecord;
use crate::intake::RecordSender;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::{error, info};

/// Shared state for the intake routes: the producer half of the queue.
#[derive(Clone)]
pub struct AppState {
    pub intake: RecordSender,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/log", post(log_handler))
        .with_state(state)
}

async fn healthz_handler() -> &'static str {
    "OK"
}

/// Decodes one record and enqueues it.
///
/// The 202 acknowledges enqueue only; producers get no visibility into
/// delivery outcome. When the queue is full this handler suspends on
/// `enqueue` until capacity frees, which is the only backpressure a
/// producer observes.
async fn log_handler(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let record: EventRecord = match serde_json::from_str(&body) {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to decode record: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let user_id = record.user_id;
    let total = record.total;
    let title = record.title.clone();

    if state.intake.enqueue(record).await.is_err() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "intake queue closed".to_string(),
        );
    }

    info!(user_id, total, title = %title, "record received");
    (StatusCode::ACCEPTED, String::new())
}
