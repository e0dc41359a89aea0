// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST/GET/PUT/DELETE /api, /api/{id}
// - GET /api/news  (headers + first event frame + cleanup on drop)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use sightings_feed::feed::{FeedBroadcaster, FeedConfig};
use sightings_feed::sightings::InMemorySightings;
use sightings_feed::{api, AppState, Story};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_state() -> AppState {
    let stories: Vec<Story> = vec!["Orbs over the lake".into(), "Chapel bells at 3am".into()];
    AppState::new(
        Arc::new(InMemorySightings::new()),
        FeedBroadcaster::new(
            stories,
            FeedConfig {
                interval: Duration::from_millis(500),
                channel_capacity: 4,
            },
        ),
    )
}

fn test_router(state: AppState) -> Router {
    api::router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Json>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("build request"))
        .await
        .expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn sighting_json(title: &str) -> Json {
    json!({
        "location": "Pendle Hill",
        "timeStamp": "2025-12-21T13:00:00.000Z",
        "title": title,
        "text": "A figure in grey crossed the stile."
    })
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(test_state());
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK, "health should be 200");
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
}

#[tokio::test]
async fn api_create_list_get_update_delete() {
    let app = test_router(test_state());

    let (status, body) = send(&app, "POST", "/api", Some(sighting_json("Grey lady"))).await;
    assert_eq!(status, StatusCode::OK);
    let created: Json = serde_json::from_slice(&body).expect("create json");
    let id = created["uuid"].as_str().expect("uuid in response").to_string();

    let (status, body) = send(&app, "GET", "/api", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: Json = serde_json::from_slice(&body).unwrap();
    let rows = list.as_array().expect("list is an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["uuid"], id.as_str());
    assert_eq!(rows[0]["timeStamp"], "2025-12-21T13:00:00.000Z");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/{id}"),
        Some(sighting_json("Grey lady, again")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/api/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let one: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(one["title"], "Grey lady, again");

    let (status, body) = send(&app, "DELETE", &format!("/api/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["success"], true);

    let (status, body) = send(&app, "GET", &format!("/api/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"], "Sighting not found");
}

#[tokio::test]
async fn api_update_and_delete_of_unknown_id_still_succeed() {
    let app = test_router(test_state());
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send(&app, "PUT", &format!("/api/{missing}"), Some(sighting_json("x"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/api/{missing}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Json>(&body).unwrap(), json!([]));
}

#[tokio::test]
async fn api_malformed_id_is_rejected() {
    let app = test_router(test_state());
    for method in ["GET", "PUT", "DELETE"] {
        let body = (method == "PUT").then(|| sighting_json("x"));
        let (status, bytes) = send(&app, method, "/api/not-a-uuid", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
        let v: Json = serde_json::from_slice(&bytes).expect("error body is json");
        assert_eq!(v, json!({ "error": "Invalid sighting id" }), "{method}");
    }
}

#[tokio::test(start_paused = true)]
async fn api_news_streams_event_frames_and_cleans_up() {
    let state = test_state();
    let feed = state.feed.clone();
    let app = test_router(state);

    let req = Request::builder()
        .method("GET")
        .uri("/api/news")
        .body(Body::empty())
        .expect("build GET /api/news");
    let resp = app.oneshot(req).await.expect("oneshot /api/news");
    assert_eq!(resp.status(), StatusCode::OK);

    let header = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    assert_eq!(header("content-type"), "text/event-stream");
    assert_eq!(header("cache-control"), "no-cache");
    assert_eq!(header("connection"), "keep-alive");
    assert_eq!(header("x-accel-buffering"), "no");
    assert_eq!(feed.active_count(), 1);

    let mut frames = resp.into_body().into_data_stream();
    let first = frames
        .next()
        .await
        .expect("stream yields a frame")
        .expect("frame is data");
    let text = String::from_utf8(first.to_vec()).expect("utf8");

    assert!(text.starts_with("data: "), "frame was {text:?}");
    assert!(text.ends_with("\n\n"), "frame was {text:?}");
    let payload: Json = serde_json::from_str(text["data: ".len()..].trim_end()).expect("json");
    assert_eq!(payload["event"], "news-update");
    let story = payload["story"].as_str().expect("story is a string");
    assert!(feed.pool().iter().any(|s| s == story));

    // Client goes away: the body is dropped and the subscription with it.
    drop(frames);
    assert_eq!(feed.active_count(), 0);
}
