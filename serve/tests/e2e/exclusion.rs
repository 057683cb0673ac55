use crate::common;
use serde_json::json;

/// Scenario: exclude the top-suspect change, and every subsequent context
/// and result set must drop it, promoting the next-highest change.
#[tokio::test]
async fn excluding_top_suspect_promotes_next_change() {
    let server = common::spawn().await;
    let (status, body) =
        common::post_json(&server, "/incidents/INC001/retrieve-context", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["change_results"]["top_suspect"]["change_id"], "CHG005");

    let (status, _) = common::post_json(
        &server,
        "/incidents/INC001/exclude-item",
        json!({ "item_id": "CHG005", "kind": "change", "source": "mock" }),
    )
    .await;
    assert_eq!(status, 200);

    let (_, details) = common::get_json(&server, "/incidents/INC001/details").await;
    let changes = &details["agent_results"]["change_results"];
    assert_eq!(changes["top_suspect"]["change_id"], "CHG009");
    let all = changes["all_correlations"].as_array().unwrap();
    assert!(all.iter().all(|c| c["change_id"] != "CHG005"));
}

#[tokio::test]
async fn excluded_items_can_be_listed_and_removed() {
    let server = common::spawn().await;
    common::post_json(
        &server,
        "/incidents/INC001/exclude-item",
        json!({ "item_id": "DOC1", "kind": "document", "source": "mock" }),
    )
    .await;

    let (status, body) = common::get_json(&server, "/incidents/INC001/excluded-items").await;
    assert_eq!(status, 200);
    let items = body["excluded_items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item_id"], "DOC1");

    let response = server
        .client
        .delete(server.url("/incidents/INC001/excluded-items/DOC1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .delete(server.url("/incidents/INC001/excluded-items/DOC1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let (_, body) = common::get_json(&server, "/incidents/INC001/excluded-items").await;
    assert!(body["excluded_items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn excluded_document_disappears_from_resolve_knowledge() {
    let server = common::spawn().await;
    common::post_json(
        &server,
        "/incidents/INC001/exclude-item",
        json!({ "item_id": "DOC1", "kind": "document", "source": "mock" }),
    )
    .await;

    let (status, body) = common::post_json(
        &server,
        "/resolve",
        json!({ "incident_id": "INC001", "user_query": "What happened?" }),
    )
    .await;
    assert_eq!(status, 200);
    let knowledge = body["related_knowledge"].as_array().unwrap();
    assert!(
        knowledge.iter().all(|t| t != "Checkout gateway runbook"),
        "excluded document leaked: {knowledge:?}"
    );
}

#[tokio::test]
async fn excluding_for_unknown_incident_is_404() {
    let server = common::spawn().await;
    let (status, _) = common::post_json(
        &server,
        "/incidents/INC999/exclude-item",
        json!({ "item_id": "CHG005", "kind": "change", "source": "mock" }),
    )
    .await;
    assert_eq!(status, 404);
}
