//! Wire-level tests for the phone recording source
//!
//! Each test stands up an in-process HTTP upstream on an ephemeral port and
//! drives the real client against it: token endpoint included, so the walk
//! is exercised exactly as in production.

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rechub::auth::TokenProvider;
use rechub::models::SourceKind;
use rechub::sources::{FetchRange, PhoneSource, RecordingSource, SourceError};

/// Bind the router on an ephemeral port and return its base URL
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Token endpoint answering every grant with the same bearer token
fn token_route(hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/oauth/token",
        post(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "access_token": "tok-1",
                    "token_type": "bearer",
                    "expires_in": 3600
                }))
            }
        }),
    )
}

fn provider(base: &str) -> Arc<TokenProvider> {
    Arc::new(TokenProvider::new(base, "acct", "cid", "secret").unwrap())
}

fn range() -> FetchRange {
    FetchRange::new(
        NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap(),
    )
}

#[tokio::test]
async fn endless_cursors_stop_after_twenty_pages() {
    let page_hits = Arc::new(AtomicUsize::new(0));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = {
        let page_hits = page_hits.clone();
        Router::new().route(
            "/phone/recordings",
            get(move || {
                let page_hits = page_hits.clone();
                async move {
                    page_hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "from": "2025-11-01",
                        "to": "2025-11-07",
                        "next_page_token": "again",
                        "recordings": [{"id": "r", "date_time": "2025-11-03T10:00:00Z"}]
                    }))
                }
            }),
        )
    };
    let base = serve(pages.merge(token_route(token_hits.clone()))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    let batch = source.fetch(range(), 300).await.unwrap();

    assert_eq!(page_hits.load(Ordering::SeqCst), 20);
    assert_eq!(batch.recordings.len(), 20);
    // The whole walk runs on one cached token
    assert_eq!(token_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pages_accumulate_in_order_and_echo_the_first_range() {
    let hits = Arc::new(AtomicUsize::new(0));
    let cursors: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = {
        let hits = hits.clone();
        let cursors = cursors.clone();
        Router::new().route(
            "/phone/recordings",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                let cursors = cursors.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    cursors
                        .lock()
                        .unwrap()
                        .push(params.get("next_page_token").cloned());
                    match n {
                        1 => Json(json!({
                            "from": "2025-11-01",
                            "to": "2025-11-07",
                            "next_page_token": "p2",
                            "recordings": [{"id": "a"}, {"id": "b"}]
                        })),
                        2 => Json(json!({
                            "next_page_token": "p3",
                            "recordings": [{"id": "c"}]
                        })),
                        _ => Json(json!({
                            "recordings": [{"id": "d"}, {"id": "e"}]
                        })),
                    }
                }
            }),
        )
    };
    let base = serve(pages.merge(token_route(token_hits))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    assert_eq!(source.kind(), SourceKind::Phone);
    let batch = source.fetch(range(), 30).await.unwrap();

    let ids: Vec<&str> = batch.recordings.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    assert!(batch
        .recordings
        .iter()
        .all(|r| r.source == SourceKind::Phone));

    // Echoed bounds come from the first page even though later pages omit them
    assert_eq!(batch.from, "2025-11-01");
    assert_eq!(batch.to, "2025-11-07");

    // First request has no cursor; the rest thread the previous page's token
    assert_eq!(
        *cursors.lock().unwrap(),
        vec![None, Some("p2".to_string()), Some("p3".to_string())]
    );
}

#[tokio::test]
async fn failing_page_aborts_the_whole_walk() {
    let hits = Arc::new(AtomicUsize::new(0));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = {
        let hits = hits.clone();
        Router::new().route(
            "/phone/recordings",
            get(move || {
                let hits = hits.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        Json(json!({
                            "next_page_token": "p2",
                            "recordings": [{"id": "a"}]
                        }))
                        .into_response()
                    } else {
                        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
                    }
                }
            }),
        )
    };
    let base = serve(pages.merge(token_route(token_hits))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    let err = source.fetch(range(), 30).await.unwrap_err();

    match err {
        SourceError::Api(500, body) => assert!(body.contains("boom")),
        other => panic!("expected Api(500, _), got {:?}", other),
    }
    // Page 1's records were fetched but the failure discarded them; the walk
    // stopped at the failing page.
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn page_size_is_clamped_and_the_query_is_complete() {
    let seen: Arc<Mutex<Option<HashMap<String, String>>>> = Arc::new(Mutex::new(None));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = {
        let seen = seen.clone();
        Router::new().route(
            "/phone/recordings",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() = Some(params);
                    Json(json!({"recordings": []}))
                }
            }),
        )
    };
    let base = serve(pages.merge(token_route(token_hits))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    source.fetch(range(), 9999).await.unwrap();

    let params = seen.lock().unwrap().clone().unwrap();
    assert_eq!(params.get("page_size").map(String::as_str), Some("300"));
    assert_eq!(
        params.get("query_date_type").map(String::as_str),
        Some("start_time")
    );
    assert_eq!(params.get("from").map(String::as_str), Some("2025-11-01"));
    assert_eq!(params.get("to").map(String::as_str), Some("2025-11-07"));
    assert!(!params.contains_key("next_page_token"));
}

#[tokio::test]
async fn empty_cursor_ends_the_walk() {
    let hits = Arc::new(AtomicUsize::new(0));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = {
        let hits = hits.clone();
        Router::new().route(
            "/phone/recordings",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "next_page_token": "",
                        "recordings": [{"id": "only"}]
                    }))
                }
            }),
        )
    };
    let base = serve(pages.merge(token_route(token_hits))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    let batch = source.fetch(range(), 30).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(batch.recordings.len(), 1);
    // Upstream omitted from/to, so the request values are echoed
    assert_eq!(batch.from, "2025-11-01");
    assert_eq!(batch.to, "2025-11-07");
}

#[tokio::test]
async fn bearer_token_is_attached_to_every_page_request() {
    let auth_headers: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let hits = Arc::new(AtomicUsize::new(0));
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = {
        let auth_headers = auth_headers.clone();
        let hits = hits.clone();
        Router::new().route(
            "/phone/recordings",
            get(move |headers: HeaderMap| {
                let auth_headers = auth_headers.clone();
                let hits = hits.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    auth_headers.lock().unwrap().push(
                        headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string(),
                    );
                    if n == 1 {
                        Json(json!({"next_page_token": "p2", "recordings": []}))
                    } else {
                        Json(json!({"recordings": []}))
                    }
                }
            }),
        )
    };
    let base = serve(pages.merge(token_route(token_hits))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    source.fetch(range(), 30).await.unwrap();

    let headers = auth_headers.lock().unwrap();
    assert_eq!(headers.len(), 2);
    assert!(headers.iter().all(|h| h == "Bearer tok-1"));
}

#[tokio::test]
async fn upstream_rejection_carries_status_and_body() {
    let token_hits = Arc::new(AtomicUsize::new(0));

    let pages = Router::new().route(
        "/phone/recordings",
        get(|| async { (StatusCode::UNAUTHORIZED, "bad credentials").into_response() }),
    );
    let base = serve(pages.merge(token_route(token_hits))).await;

    let source = PhoneSource::new(base.clone(), provider(&base)).unwrap();
    let err = source.fetch(range(), 30).await.unwrap_err();

    match err {
        SourceError::Api(401, body) => assert!(body.contains("bad credentials")),
        other => panic!("expected Api(401, _), got {:?}", other),
    }
}
