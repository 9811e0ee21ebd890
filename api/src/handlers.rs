use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use pilot999_shared::ContactReply;

use crate::{
    error::{ApiError, ApiResult},
    metrics,
    state::AppState,
    validation::{ContactSubmission, ValidatedJson},
};

pub async fn health_check(State(state): State<AppState>) -> Json<ContactReply> {
    tracing::debug!(
        uptime_secs = state.started_at.elapsed().as_secs(),
        "health check"
    );
    Json(ContactReply::ok())
}

/// Relay one validated submission to the configured inbox.
///
/// The transport is resolved only after validation has passed, and the
/// send is attempted once.
pub async fn submit_contact(
    State(state): State<AppState>,
    ValidatedJson(submission): ValidatedJson<ContactSubmission>,
) -> ApiResult<Json<ContactReply>> {
    let mailer = state.mailer.prepare()?;

    mailer
        .send(&submission.email, submission.subject(), submission.body())
        .await?;

    metrics::record_contact_outcome(metrics::OUTCOME_SENT);
    tracing::info!(
        reply_to = %submission.email,
        message_chars = submission.message.chars().count(),
        "contact message relayed"
    );

    Ok(Json(ContactReply::ok()))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let body = metrics::gather_metrics(&state.registry);
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
