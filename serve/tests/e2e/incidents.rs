use crate::common;
use serde_json::json;

#[tokio::test]
async fn health_reports_ok() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn incident_list_is_ordered_newest_first() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/incidents").await;
    assert_eq!(status, 200);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["INC002", "INC001", "INC007", "INC011"]);
}

#[tokio::test]
async fn unknown_incident_is_404_with_detail() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/incidents/INC999").await;
    assert_eq!(status, 404);
    assert!(body["detail"].as_str().unwrap().contains("INC999"));
}

#[tokio::test]
async fn status_update_validates_the_enum() {
    let server = common::spawn().await;
    let response = server
        .client
        .put(server.url("/incidents/INC001/status"))
        .json(&json!({ "status": "escalated" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("escalated"));

    let response = server
        .client
        .put(server.url("/incidents/INC001/status"))
        .json(&json!({ "status": "investigating" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "investigating");
    assert!(body["updated_at"].is_string());
}

/// Two concurrent writers: both succeed, the final state is exactly one of
/// the two written values, and no reader sees anything else.
#[tokio::test]
async fn concurrent_status_updates_serialize() {
    let server = common::spawn().await;
    let put = |status: &'static str| {
        let client = server.client.clone();
        let url = server.url("/incidents/INC001/status");
        async move {
            let response = client
                .put(url)
                .json(&json!({ "status": status }))
                .send()
                .await
                .unwrap();
            let code = response.status();
            let body: serde_json::Value = response.json().await.unwrap();
            (code, body)
        }
    };

    let ((status_a, body_a), (status_b, body_b)) =
        tokio::join!(put("investigating"), put("resolved"));
    assert_eq!(status_a, 200);
    assert_eq!(status_b, 200);
    assert_eq!(body_a["status"], "investigating");
    assert_eq!(body_b["status"], "resolved");

    let (_, current) = common::get_json(&server, "/incidents/INC001").await;
    let final_status = current["status"].as_str().unwrap();
    assert!(
        final_status == "investigating" || final_status == "resolved",
        "unexpected final status {final_status}"
    );
}

#[tokio::test]
async fn trace_id_is_echoed_and_minted() {
    let server = common::spawn().await;
    let response = server
        .client
        .get(server.url("/health"))
        .header("X-Trace-ID", "trace-e2e-123")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "trace-e2e-123"
    );

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    let minted = response.headers().get("x-trace-id").unwrap().to_str().unwrap();
    assert!(!minted.is_empty());
}

#[tokio::test]
async fn details_without_retrieval_has_null_results() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/incidents/INC002/details").await;
    assert_eq!(status, 200);
    assert_eq!(body["incident"]["id"], "INC002");
    assert!(body["agent_results"].is_null());
}
