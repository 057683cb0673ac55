use crate::common;
use serde_json::json;

#[tokio::test]
async fn llm_config_round_trip_masks_the_key() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/admin/llm-config").await;
    assert_eq!(status, 200);
    assert_eq!(body["provider"], "mock");

    let response = server
        .client
        .put(server.url("/admin/llm-config"))
        .json(&json!({
            "provider": "openai",
            "api_key": "sk-verysecretkey1234",
            "model": "gpt-4o-mini"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["provider"], "openai");
    let masked = body["api_key"].as_str().unwrap();
    assert!(!masked.contains("verysecret"), "key leaked: {masked}");
    assert!(masked.starts_with("***"));
}

#[tokio::test]
async fn switching_to_keyed_provider_without_key_is_400() {
    let server = common::spawn().await;
    let response = server
        .client
        .put(server.url("/admin/llm-config"))
        .json(&json!({ "provider": "gemini" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("api key"));
}

#[tokio::test]
async fn prompt_edit_and_reset_flow() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/admin/agent-prompts").await;
    assert_eq!(status, 200);
    let prompts = body.as_array().unwrap();
    assert_eq!(prompts.len(), 7);
    assert!(prompts.iter().all(|p| p["is_custom"] == false));

    let response = server
        .client
        .put(server.url("/admin/agent-prompts/synthesis"))
        .json(&json!({ "prompt": "Answer in exactly three bullet points." }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["is_custom"], true);

    // Reset twice; the second reset changes nothing.
    for _ in 0..2 {
        let (status, _) = common::post_json(
            &server,
            "/admin/agent-prompts/reset?agent_name=synthesis",
            json!({}),
        )
        .await;
        assert_eq!(status, 200);
        let (_, view) = common::get_json(&server, "/admin/agent-prompts/synthesis").await;
        assert_eq!(view["is_custom"], false);
        assert_eq!(view["current"], view["default"]);
    }
}

#[tokio::test]
async fn unknown_prompt_agent_is_404() {
    let server = common::spawn().await;
    let (status, _) = common::get_json(&server, "/admin/agent-prompts/nonexistent").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_llm_probe_reports_latency() {
    let server = common::spawn().await;
    let (status, body) = common::post_json(&server, "/admin/test-llm", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "mock");
    assert!(body["latency_ms"].is_u64());
}

#[tokio::test]
async fn accuracy_metrics_track_exclusions() {
    let server = common::spawn().await;
    common::post_json(&server, "/incidents/INC001/retrieve-context", json!({})).await;
    common::post_json(
        &server,
        "/incidents/INC001/exclude-item",
        json!({ "item_id": "CHG005", "kind": "change", "source": "mock" }),
    )
    .await;

    let (status, body) = common::get_json(&server, "/admin/accuracy-metrics").await;
    assert_eq!(status, 200);
    let changes = &body["categories"]["changes"];
    assert_eq!(changes["returned"], 2);
    assert_eq!(changes["excluded"], 1);
    let accuracy = changes["accuracy"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&accuracy));
    let overall = body["overall_accuracy"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&overall));
}

#[tokio::test]
async fn prompt_logs_record_synthesis_and_chat_calls() {
    let server = common::spawn().await;
    common::post_json(
        &server,
        "/resolve",
        json!({ "incident_id": "INC001", "user_query": "What happened?" }),
    )
    .await;

    let (status, body) = common::get_json(&server, "/admin/prompt-logs").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    let entry = &body["entries"][0];
    assert_eq!(entry["incident_id"], "INC001");
    assert_eq!(entry["prompt_type"], "synthesis");
    assert!(entry["context_summary"].as_str().unwrap().chars().count() <= 200);

    let response = server
        .client
        .delete(server.url("/admin/prompt-logs"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let (_, body) = common::get_json(&server, "/admin/prompt-logs").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn logging_config_is_read_only_without_a_handle() {
    let server = common::spawn().await;
    let (status, body) = common::get_json(&server, "/admin/logging-config").await;
    assert_eq!(status, 200);
    assert_eq!(body["level"], "info");

    let response = server
        .client
        .put(server.url("/admin/logging-config"))
        .json(&json!({ "level": "debug" }))
        .send()
        .await
        .unwrap();
    // Tests run without a live tracing handle; the server owns none.
    assert_eq!(response.status(), 400);
}
