//! Recommendation endpoints.

use super::session::Session;
use super::state::{GuardedRecommendService, ServerState};
use crate::llm::LlmError;
use crate::recommend::RecommendError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Deserialize, Debug)]
struct PromptBody {
    pub prompt: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct RateLimitedBody {
    error: String,
    retry_after: u32,
}

fn error_body(message: impl Into<String>) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: message.into(),
    })
}

pub(super) fn make_recommend_routes(state: ServerState) -> Router {
    Router::new()
        .route("/smart", post(smart_recommend))
        .route("/prompt", post(prompt_recommend))
        .route("/history", get(recommendation_history))
        .route("/history/{id}", get(recommendation_detail))
        .with_state(state)
}

/// POST /v1/recommendations/smart
/// Generates recommendations from the taste profile alone.
async fn smart_recommend(
    session: Session,
    State(recommend): State<GuardedRecommendService>,
) -> Response {
    run_recommendation(recommend, session, None).await
}

/// POST /v1/recommendations/prompt
/// Generates recommendations for a free-text request.
async fn prompt_recommend(
    session: Session,
    State(recommend): State<GuardedRecommendService>,
    body: Result<Json<PromptBody>, JsonRejection>,
) -> Response {
    let prompt = match body {
        Ok(Json(PromptBody { prompt })) if !prompt.is_empty() => prompt,
        _ => {
            return (StatusCode::BAD_REQUEST, error_body("prompt is required")).into_response();
        }
    };
    run_recommendation(recommend, session, Some(prompt)).await
}

async fn run_recommendation(
    recommend: GuardedRecommendService,
    session: Session,
    prompt: Option<String>,
) -> Response {
    match recommend
        .recommend(session.user_id, &session.access_token, prompt)
        .await
    {
        Ok(set) => Json(set).into_response(),
        Err(err) => recommend_error_response(session.user_id, err),
    }
}

fn recommend_error_response(user_id: i64, err: RecommendError) -> Response {
    match err {
        RecommendError::NotConfigured => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_body("recommendations are not configured"),
        )
            .into_response(),
        RecommendError::RateLimited { retry_after } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitedBody {
                error: format!(
                    "please wait {} seconds between recommendations",
                    retry_after
                ),
                retry_after,
            }),
        )
            .into_response(),
        RecommendError::Generation(LlmError::RateLimited { .. }) => {
            warn!(user_id, "Model provider rate limited twice");
            (
                StatusCode::TOO_MANY_REQUESTS,
                error_body("the model is temporarily busy, please try again in a minute"),
            )
                .into_response()
        }
        err => {
            error!(user_id, error = %err, "Recommendation run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("failed to generate recommendations"),
            )
                .into_response()
        }
    }
}

/// GET /v1/recommendations/history
async fn recommendation_history(
    session: Session,
    State(recommend): State<GuardedRecommendService>,
) -> Response {
    match recommend.history(session.user_id) {
        Ok(items) => Json(items).into_response(),
        Err(err) => {
            error!(user_id = session.user_id, error = %err, "Failed to load history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("failed to load recommendation history"),
            )
                .into_response()
        }
    }
}

/// GET /v1/recommendations/history/{id}
async fn recommendation_detail(
    session: Session,
    State(recommend): State<GuardedRecommendService>,
    Path(id): Path<i64>,
) -> Response {
    match recommend.history_item(session.user_id, id) {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_body("recommendation not found"),
        )
            .into_response(),
        Err(err) => {
            error!(user_id = session.user_id, session_id = id, error = %err, "Failed to load session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("failed to load recommendation"),
            )
                .into_response()
        }
    }
}
