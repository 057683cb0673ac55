//! Knowledge-base agent: documents ranked by keyword overlap with the
//! incident text, content truncated at a word boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentResult, AgentSettings, EvidenceAgent};
use crate::connector::{KbQuery, KnowledgeBaseConnector};
use crate::error::EngineError;
use crate::model::{ConfluenceResults, Incident, RankedDocument};
use crate::prompts::defaults::KNOWLEDGE_BASE_PROMPT;
use crate::similarity;

/// Maximum characters of document content carried into results.
const CONTENT_MAX_CHARS: usize = 2000;

pub struct KnowledgeBaseAgent {
    connector: Arc<dyn KnowledgeBaseConnector>,
    settings: AgentSettings,
}

impl KnowledgeBaseAgent {
    pub fn new(connector: Arc<dyn KnowledgeBaseConnector>, settings: AgentSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }
}

/// Truncates to at most `max` characters, backing up to the last word
/// boundary so no word is cut in half.
fn truncate_at_word(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    match cut.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    }
}

#[async_trait]
impl EvidenceAgent for KnowledgeBaseAgent {
    fn name(&self) -> &'static str {
        "knowledge_base"
    }

    fn default_prompt(&self) -> &'static str {
        KNOWLEDGE_BASE_PROMPT
    }

    async fn query(&self, incident: &Incident) -> Result<AgentResult, EngineError> {
        let mut query_tokens = similarity::incident_tokens(incident);
        for service in &incident.affected_services {
            query_tokens.extend(similarity::tokenize(service));
        }
        let query = KbQuery {
            terms: query_tokens.iter().cloned().collect(),
            incident_id: Some(incident.id.clone()),
        };

        let candidates = self
            .connector
            .search(&query, self.settings.max_knowledge_docs)
            .await?;

        let mut documents: Vec<RankedDocument> = candidates
            .into_iter()
            .map(|doc| {
                let text = format!("{} {}", doc.title, doc.content);
                RankedDocument {
                    relevance_score: similarity::keyword_overlap(&query_tokens, &text),
                    doc_id: doc.doc_id,
                    title: doc.title,
                    content: truncate_at_word(&doc.content, CONTENT_MAX_CHARS),
                    tags: doc.tags,
                }
            })
            .collect();
        documents.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        documents.truncate(self.settings.max_knowledge_docs);

        let knowledge_base_articles = documents.iter().map(|d| d.title.clone()).collect();
        Ok(AgentResult::Knowledge(ConfluenceResults {
            source: self.connector.source().to_string(),
            incident_id: incident.id.clone(),
            documents,
            knowledge_base_articles,
        }))
    }
}
