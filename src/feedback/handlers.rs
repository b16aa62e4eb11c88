use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{auth::extractors::AuthUser, error::AppError, feedback::repo::Feedback, state::AppState};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub content: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/feedback", post(create_feedback))
}

#[instrument(skip(state, body))]
pub async fn create_feedback(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("feedback must not be empty".into()));
    }
    let feedback = state.feedback.create(content).await?;
    info!(feedback_id = %feedback.id, "feedback received");
    Ok((StatusCode::CREATED, Json(feedback)))
}
