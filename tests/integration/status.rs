use crate::*;
use serde_json::json;

/// Complete an operation, then fetch it both ways: 302 to a scoped
/// reference, and 200 with the artifact inline.
#[tokio::test]
async fn test_completed_operation_redirects_then_streams() {
    let server = TestServer::start().await.unwrap();
    let http = client();
    let payload = json!({ "id": "x", "value": 42 });

    let resp = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&payload)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let status_url = body["status_location"].as_str().unwrap().to_string();

    let terminal = poll_until_terminal(&http, &status_url, "Redirect").await.unwrap();
    assert_eq!(terminal.status(), reqwest::StatusCode::FOUND);
    let artifact_url = terminal
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Location header")
        .to_string();
    assert!(artifact_url.contains("/artifacts/"));

    // The scoped reference dereferences to the artifact bytes.
    let fetched = http.get(&artifact_url).send().await.unwrap();
    assert_eq!(fetched.status(), reqwest::StatusCode::OK);
    let expected = serde_json::to_vec(&payload).unwrap();
    assert_eq!(fetched.bytes().await.unwrap(), expected);

    // Stream mode returns the same bytes inline.
    let streamed = http
        .get(&status_url)
        .query(&[("onComplete", "Stream")])
        .send()
        .await
        .unwrap();
    assert_eq!(streamed.status(), reqwest::StatusCode::OK);
    assert_eq!(streamed.bytes().await.unwrap(), expected);
}

/// Unrecognized parameter values are a 400 no matter the operation state.
#[tokio::test]
async fn test_bogus_parameters_are_rejected_in_any_state() {
    let server = TestServer::start().await.unwrap();
    let http = client();

    // Unknown operation.
    let resp = http
        .get(server.url(&format!("/status/{}", unknown_operation_id())))
        .query(&[("onComplete", "bogus")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    // Completed operation.
    let submit = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&json!({ "id": "x" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = submit.json().await.unwrap();
    let status_url = body["status_location"].as_str().unwrap().to_string();
    poll_until_terminal(&http, &status_url, "Stream").await.unwrap();

    let resp = http
        .get(&status_url)
        .query(&[("onComplete", "bogus")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = http
        .get(&status_url)
        .query(&[("onPending", "maybe")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_operation_id_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let resp = client()
        .get(server.url("/status/not-a-valid-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

/// A well-formed id that was never submitted polls as pending, pointing
/// back at itself.
#[tokio::test]
async fn test_unknown_operation_polls_as_pending() {
    let server = TestServer::start().await.unwrap();
    let id = unknown_operation_id();

    let resp = client()
        .get(server.url(&format!("/status/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    let location = resp.headers().get("location").and_then(|v| v.to_str().ok());
    assert_eq!(location, Some(server.url(&format!("/status/{id}")).as_str()));
}

/// A synchronous poll holds open across the worker's processing delay and
/// returns the artifact in one round trip.
#[tokio::test]
async fn test_synchronous_poll_returns_the_result() {
    let server = TestServer::start().await.unwrap();
    let http = client();
    let payload = json!({ "id": "x", "sleep_ms": 60 });

    let submit = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&payload)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = submit.json().await.unwrap();
    let status_url = body["status_location"].as_str().unwrap().to_string();

    let resp = http
        .get(&status_url)
        .query(&[("onComplete", "Stream"), ("onPending", "Synchronous")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.bytes().await.unwrap(),
        serde_json::to_vec(&payload).unwrap()
    );
}
