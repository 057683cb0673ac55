//! Mock knowledge base: CSV document fixtures plus a folder of runbooks.
//!
//! Runbooks are markdown/text files with optional front-matter delimited by
//! `---` lines; the front-matter carries at minimum a `title:` (falling
//! back to the file stem). Search returns documents associated with the
//! incident plus keyword matches; the agent does the final ranking.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::connector::{KbQuery, KnowledgeBaseConnector};
use crate::csvdata;
use crate::error::EngineError;
use crate::model::KnowledgeDocument;
use crate::similarity;

const SOURCE: &str = "mock";

const RUNBOOK_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub struct MockKnowledgeBase {
    documents: Vec<KnowledgeDocument>,
}

impl MockKnowledgeBase {
    /// Loads documents from the CSV fixture and/or the runbook folder;
    /// either source may be absent.
    pub fn from_sources(
        csv_path: Option<&Path>,
        docs_folder: Option<&Path>,
    ) -> Result<Self, EngineError> {
        let mut documents = Vec::new();
        if let Some(path) = csv_path {
            if path.exists() {
                documents.extend(csvdata::load_documents(path)?);
            } else {
                debug!(path = %path.display(), "no knowledge csv fixture");
            }
        }
        if let Some(folder) = docs_folder {
            if folder.is_dir() {
                documents.extend(load_runbooks(folder)?);
            } else {
                debug!(path = %folder.display(), "no runbook folder");
            }
        }
        documents.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        Ok(Self { documents })
    }

    pub fn from_documents(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents }
    }
}

/// Splits optional `---` front-matter off a runbook body. Returns the parsed
/// front-matter (default on parse failure, with a warning) and the content.
fn split_front_matter(raw: &str, path: &Path) -> (FrontMatter, String) {
    let Some(rest) = raw.strip_prefix("---") else {
        return (FrontMatter::default(), raw.to_string());
    };
    let Some(end) = rest.find("\n---") else {
        return (FrontMatter::default(), raw.to_string());
    };
    let header = &rest[..end];
    let content = rest[end + 4..].trim_start_matches('\n').to_string();
    match serde_yaml::from_str::<FrontMatter>(header) {
        Ok(front) => (front, content),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "bad runbook front-matter; using file name");
            (FrontMatter::default(), content)
        }
    }
}

fn load_runbooks(folder: &Path) -> Result<Vec<KnowledgeDocument>, EngineError> {
    let mut documents = Vec::new();
    let entries = std::fs::read_dir(folder)
        .map_err(|e| EngineError::Config(format!("read runbook folder {}: {e}", folder.display())))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| EngineError::Config(format!("read runbook folder entry: {e}")))?;
        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        if !path.is_file() || !RUNBOOK_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Config(format!("read runbook {}: {e}", path.display())))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("runbook")
            .to_string();
        let (front, content) = split_front_matter(&raw, &path);
        documents.push(KnowledgeDocument {
            doc_id: stem.clone(),
            title: front.title.unwrap_or_else(|| stem.replace(['-', '_'], " ")),
            content,
            tags: front.tags,
            incident_id: None,
        });
    }
    Ok(documents)
}

#[async_trait]
impl KnowledgeBaseConnector for MockKnowledgeBase {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn search(
        &self,
        query: &KbQuery,
        limit: usize,
    ) -> Result<Vec<KnowledgeDocument>, EngineError> {
        let terms: std::collections::BTreeSet<String> =
            query.terms.iter().map(|t| t.to_lowercase()).collect();
        let mut hits: Vec<&KnowledgeDocument> = self
            .documents
            .iter()
            .filter(|doc| {
                let associated = query.incident_id.is_some()
                    && doc.incident_id.as_deref() == query.incident_id.as_deref();
                let text = format!("{} {}", doc.title, doc.content);
                associated || similarity::keyword_overlap(&terms, &text) > 0.0
            })
            .collect();
        // Candidate cap only; the agent re-ranks by keyword overlap.
        hits.truncate(limit.saturating_mul(2).max(limit));
        Ok(hits.into_iter().cloned().collect())
    }

    async fn get(&self, doc_id: &str) -> Result<KnowledgeDocument, EngineError> {
        self.documents
            .iter()
            .find(|d| d.doc_id == doc_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("document {doc_id}")))
    }
}
