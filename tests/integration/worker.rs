use crate::*;
use serde_json::json;

/// A business failure surfaces as 422 with the persisted detail — the
/// client learns why, not just that, the operation failed.
#[tokio::test]
async fn test_failed_processing_surfaces_detail() {
    let server = TestServer::start().await.unwrap();
    let http = client();

    let submit = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&json!({ "id": "x", "fail": "quota exceeded" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = submit.json().await.unwrap();
    let status_url = body["status_location"].as_str().unwrap().to_string();

    let terminal = poll_until_terminal(&http, &status_url, "Redirect").await.unwrap();
    assert_eq!(terminal.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let detail: serde_json::Value = terminal.json().await.unwrap();
    assert_eq!(detail["error"]["code"], "rejected");
    assert!(
        detail["error"]["message"]
            .as_str()
            .unwrap()
            .contains("quota exceeded")
    );

    // Stream mode reports the same failure, never the artifact path.
    let streamed = http
        .get(&status_url)
        .query(&[("onComplete", "Stream")])
        .send()
        .await
        .unwrap();
    assert_eq!(streamed.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}

/// The artifact is byte-for-byte the worker's output for the payload the
/// client submitted, including non-ASCII content.
#[tokio::test]
async fn test_artifact_bytes_match_submitted_payload() {
    let server = TestServer::start().await.unwrap();
    let http = client();
    let payload = json!({
        "id": "ü-42",
        "note": "多言語テキスト",
        "nested": { "values": [1, 2.5, null, true] },
    });

    let submit = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&payload)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = submit.json().await.unwrap();
    let status_url = body["status_location"].as_str().unwrap().to_string();

    let terminal = poll_until_terminal(&http, &status_url, "Stream").await.unwrap();
    assert_eq!(terminal.status(), reqwest::StatusCode::OK);
    assert_eq!(
        terminal.bytes().await.unwrap(),
        serde_json::to_vec(&payload).unwrap()
    );
}

#[tokio::test]
async fn test_admin_status_reports_processed_artifacts() {
    let server = TestServer::start().await.unwrap();
    let http = client();

    let submit = http
        .post(server.url(&format!("/{QUEUE_NAME}/widgets")))
        .json(&json!({ "id": "x" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = submit.json().await.unwrap();
    let status_url = body["status_location"].as_str().unwrap().to_string();
    poll_until_terminal(&http, &status_url, "Stream").await.unwrap();

    let admin: serde_json::Value = http
        .get(server.url("/admin/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(admin["artifacts"], 1);
    assert_eq!(admin["queue"]["ready"], 0);
    assert_eq!(admin["queue"]["leased"], 0);
}
