//! Confluence knowledge-base connector (content search REST API).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::connector::http::{self, str_field};
use crate::connector::{KbQuery, KnowledgeBaseConnector};
use crate::error::EngineError;
use crate::model::KnowledgeDocument;

const SOURCE: &str = "confluence";

pub struct ConfluenceConnector {
    client: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
    space_key: Option<String>,
}

impl ConfluenceConnector {
    pub fn new(
        base_url: &str,
        username: &str,
        api_token: &str,
        space_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            api_token: api_token.to_string(),
            space_key,
        })
    }

    fn cql_for(&self, terms: &[String]) -> String {
        let text = terms.join(" ").replace('"', "");
        let mut cql = format!("type = page AND text ~ \"{text}\"");
        if let Some(space) = &self.space_key {
            cql.push_str(&format!(" AND space = {space}"));
        }
        cql
    }
}

fn document_from_content(content: &Value) -> KnowledgeDocument {
    let body = content
        .pointer("/body/storage/value")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let labels = content
        .pointer("/metadata/labels/results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|l| l.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    KnowledgeDocument {
        doc_id: str_field(content, "id").to_string(),
        title: str_field(content, "title").to_string(),
        content: body.to_string(),
        tags: labels,
        incident_id: None,
    }
}

#[async_trait]
impl KnowledgeBaseConnector for ConfluenceConnector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn search(
        &self,
        query: &KbQuery,
        limit: usize,
    ) -> Result<Vec<KnowledgeDocument>, EngineError> {
        if query.terms.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/rest/api/content/search", self.base_url);
        let body = http::request_json(
            "confluence search",
            self.client
                .get(url)
                .basic_auth(&self.username, Some(&self.api_token))
                .query(&[
                    ("cql", self.cql_for(&query.terms)),
                    ("expand", "body.storage,metadata.labels".to_string()),
                    ("limit", limit.to_string()),
                ]),
        )
        .await?;
        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().map(document_from_content).collect())
            .unwrap_or_default())
    }

    async fn get(&self, doc_id: &str) -> Result<KnowledgeDocument, EngineError> {
        let url = format!("{}/rest/api/content/{}", self.base_url, doc_id);
        let content = http::request_json(
            "confluence get content",
            self.client
                .get(url)
                .basic_auth(&self.username, Some(&self.api_token))
                .query(&[("expand", "body.storage,metadata.labels")]),
        )
        .await
        .map_err(|e| match e {
            EngineError::Upstream(message) if message.contains("status 404") => {
                EngineError::NotFound(format!("document {doc_id}"))
            }
            other => other,
        })?;
        Ok(document_from_content(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_maps_to_document() {
        let content = json!({
            "id": "98321",
            "title": "Gateway pool exhaustion",
            "body": { "storage": { "value": "<p>Check the pool metrics first</p>" } },
            "metadata": { "labels": { "results": [{ "name": "runbook" }] } }
        });
        let doc = document_from_content(&content);
        assert_eq!(doc.doc_id, "98321");
        assert_eq!(doc.title, "Gateway pool exhaustion");
        assert!(doc.content.contains("pool metrics"));
        assert_eq!(doc.tags, vec!["runbook"]);
    }

    #[test]
    fn cql_includes_space_filter_when_configured() {
        let connector = ConfluenceConnector::new(
            "https://wiki.local",
            "svc",
            "token",
            Some("OPS".to_string()),
            Duration::from_secs(10),
        )
        .unwrap();
        let cql = connector.cql_for(&["gateway".to_string(), "pool".to_string()]);
        assert!(cql.contains("text ~ \"gateway pool\""));
        assert!(cql.ends_with("AND space = OPS"));
    }
}
