//! End-to-end tests for the recommendation endpoints.
//!
//! The real router runs over scratch databases with a stubbed streaming
//! catalog and a scripted model provider; only the network edges are fake.

mod common;

use axum::http::StatusCode;
use common::{expect_json, good_reply, TestApp};
use std::time::Duration;
use tastelog_server::llm::LlmError;

#[tokio::test]
async fn smart_recommendation_returns_resolved_items_in_order() {
    let app = TestApp::spawn(Some(vec![Ok(good_reply())]));

    let response = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    let body = expect_json(response, StatusCode::OK).await;

    assert_eq!(body["mode"], "smart");
    assert_eq!(body["taste_summary"], "Deep in spiritual jazz.");

    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 3);

    // Output order mirrors the model's order, resolved or not.
    assert_eq!(
        recommendations[0]["title"],
        "The Creator Has a Master Plan"
    );
    assert_eq!(recommendations[0]["resolved"], true);
    assert_eq!(recommendations[0]["year"], "1969");
    assert!(recommendations[0]["catalog_id"]
        .as_str()
        .unwrap()
        .starts_with("id:track:"));

    assert_eq!(recommendations[1]["title"], "Karma");
    assert_eq!(recommendations[1]["resolved"], true);

    // The catalog miss is kept with its generated fields intact.
    assert_eq!(recommendations[2]["title"], "Unfindable Artist");
    assert_eq!(recommendations[2]["resolved"], false);
    assert_eq!(recommendations[2]["catalog_id"], "");
    assert_eq!(recommendations[2]["why"], "Adjacent scene.");
    assert_eq!(recommendations[2]["mood_tags"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn second_request_inside_window_is_rate_limited() {
    let app = TestApp::spawn(Some(vec![Ok(good_reply()), Ok(good_reply())]));

    let first = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    let body = expect_json(second, StatusCode::TOO_MANY_REQUESTS).await;
    let retry_after = body["retry_after"].as_u64().unwrap();
    assert!((1..=60).contains(&retry_after));
}

#[tokio::test]
async fn rate_limit_is_per_listener() {
    let app = TestApp::spawn(Some(vec![Ok(good_reply()), Ok(good_reply())]));

    let first = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let other_listener = app
        .request("POST", "/v1/recommendations/smart", 2, None)
        .await;
    assert_eq!(other_listener.status(), StatusCode::OK);
}

#[tokio::test]
async fn prompt_mode_requires_a_prompt_and_echoes_it() {
    let app = TestApp::spawn(Some(vec![Ok(good_reply())]));

    let missing = app
        .request("POST", "/v1/recommendations/prompt", 1, None)
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let empty = app
        .request(
            "POST",
            "/v1/recommendations/prompt",
            1,
            Some(serde_json::json!({"prompt": ""})),
        )
        .await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "POST",
            "/v1/recommendations/prompt",
            1,
            Some(serde_json::json!({"prompt": "rainy day songs"})),
        )
        .await;
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["mode"], "prompt");
    assert_eq!(body["user_prompt"], "rainy day songs");
}

#[tokio::test]
async fn history_lists_saved_sessions_scoped_to_the_listener() {
    let app = TestApp::spawn(Some(vec![Ok(good_reply())]));

    let generated = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    assert_eq!(generated.status(), StatusCode::OK);

    let history = app
        .request("GET", "/v1/recommendations/history", 1, None)
        .await;
    let body = expect_json(history, StatusCode::OK).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    let session_id = items[0]["id"].as_i64().unwrap();
    assert_eq!(items[0]["mode"], "smart");
    assert_eq!(
        items[0]["recommendations"].as_array().unwrap().len(),
        3
    );

    // Another listener sees an empty list, not null.
    let other = app
        .request("GET", "/v1/recommendations/history", 2, None)
        .await;
    let other_body = expect_json(other, StatusCode::OK).await;
    assert_eq!(other_body.as_array().unwrap().len(), 0);

    // Detail is scoped: the owner gets it, anyone else gets not-found.
    let detail = app
        .request(
            "GET",
            &format!("/v1/recommendations/history/{}", session_id),
            1,
            None,
        )
        .await;
    let detail_body = expect_json(detail, StatusCode::OK).await;
    assert_eq!(detail_body["id"].as_i64().unwrap(), session_id);

    let foreign = app
        .request(
            "GET",
            &format!("/v1/recommendations/history/{}", session_id),
            2,
            None,
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let unknown = app
        .request("GET", "/v1/recommendations/history/999999", 1, None)
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unconfigured_backend_returns_service_unavailable() {
    let app = TestApp::spawn(None);
    let response = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // History still works without a backend.
    let history = app
        .request("GET", "/v1/recommendations/history", 1, None)
        .await;
    assert_eq!(history.status(), StatusCode::OK);
}

#[tokio::test]
async fn twice_rate_limited_model_maps_to_retry_shortly() {
    let limited = || LlmError::RateLimited {
        retry_after: Some(Duration::ZERO),
    };
    let app = TestApp::spawn(Some(vec![Err(limited()), Err(limited())]));

    let response = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    let body = expect_json(response, StatusCode::TOO_MANY_REQUESTS).await;
    // Distinguishable from the per-listener window: no retry_after field.
    assert!(body.get("retry_after").is_none());
}

#[tokio::test]
async fn malformed_model_reply_is_retried_then_fails() {
    let app = TestApp::spawn(Some(vec![
        Ok("not json".to_string()),
        Ok("still not json".to_string()),
    ]));

    let response = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The failed run burned no window; a corrected model succeeds right away.
    let app = TestApp::spawn(Some(vec![Ok("oops".to_string()), Ok(good_reply())]));
    let response = app
        .request("POST", "/v1/recommendations/smart", 1, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
