use crate::*;
use serde_json::json;
use ticket_services::WorkQueue;

/// Submit, then poll immediately: the acceptance response and the first
/// pending poll both point at the same status location.
#[tokio::test]
async fn test_submit_then_immediate_poll_is_pending() {
    let server = TestServer::start().await.unwrap();
    let http = client();

    // Slow processing so the first poll lands while the worker is busy.
    let resp = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&json!({ "id": "x", "sleep_ms": 500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);

    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Location header")
        .to_string();
    let retry_after: u64 = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("numeric Retry-After");
    assert!(retry_after > 0);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status_location"], location);
    assert!(location.contains("/status/"));

    let poll = http
        .get(&location)
        .query(&[("onPending", "Accepted")])
        .send()
        .await
        .unwrap();
    assert_eq!(poll.status(), reqwest::StatusCode::ACCEPTED);
    assert_eq!(
        poll.headers().get("location").and_then(|v| v.to_str().ok()),
        Some(location.as_str())
    );
    assert!(poll.headers().get("retry-after").is_some());
}

#[tokio::test]
async fn test_non_object_payload_is_rejected_without_side_effects() {
    let server = TestServer::start().await.unwrap();
    let http = client();

    let resp = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&json!([1, 2, 3]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let stats = server.queue.stats().await;
    assert_eq!(stats.ready, 0);
    assert_eq!(stats.leased, 0);
}

#[tokio::test]
async fn test_unknown_queue_is_not_found() {
    let server = TestServer::start().await.unwrap();
    let resp = client()
        .post(server.url("/other-queue/widgets"))
        .json(&json!({ "id": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_caller_estimate_drives_retry_after() {
    let server = TestServer::start().await.unwrap();
    let resp = client()
        .post(server.url(&format!("/{QUEUE_NAME}/widgets?estimated_secs=120")))
        .json(&json!({ "id": "x", "sleep_ms": 200 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    assert_eq!(
        resp.headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok()),
        Some("120")
    );
}

#[tokio::test]
async fn test_closed_queue_yields_service_unavailable() {
    let server = TestServer::start().await.unwrap();
    server.queue.close();

    let resp = client()
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&json!({ "id": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
}
