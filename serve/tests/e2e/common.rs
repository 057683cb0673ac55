//! Shared helpers for e2e tests: fixture authoring, server spawning, and
//! request plumbing. Responses are logged with `[e2e] received: ...`; run
//! with `--nocapture` to see them.

use std::sync::Arc;
use std::time::Duration;

use config::{
    AppConfig, IncidentConnectorConfig, KnowledgeBaseConfig, LlmProvider, MockConnectorConfig,
    MockKnowledgeBaseConfig,
};
use serve::AppState;
use smartrecover::{
    AgentSettings, ExclusionStore, LlmHandle, Orchestrator, PromptLogStore, PromptStore, TtlCache,
};
use tokio::net::TcpListener;

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    _fixtures: tempfile::TempDir,
    _server: tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

/// Writes the CSV fixtures and runbook folder into a temp dir. INC001 is
/// the hot incident: two resolved similar incidents, a strong suspect
/// change, three knowledge documents, four error logs (two services times
/// two error shapes).
pub fn write_fixtures() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("fixture dir");
    let base = dir.path();

    std::fs::write(
        base.join("incidents.csv"),
        "id,title,description,severity,status,created_at,affected_services,assignee\n\
         INC001,Checkout latency spike,p99 latency above two seconds on checkout after gateway deploy,high,open,2024-03-01T10:00:00Z,checkout|payments,alice\n\
         INC002,Login failures,auth token service returning 500s,critical,open,2024-03-02T08:00:00Z,auth,\n\
         INC007,Checkout latency spike,p99 latency above two seconds on checkout after gateway deploy,high,resolved,2024-02-10T09:00:00Z,checkout|payments,\n\
         INC011,Checkout latency creep,slow growth of checkout latency over one week,medium,resolved,2024-01-15T12:00:00Z,checkout,bob\n",
    )
    .expect("incidents.csv");

    std::fs::write(
        base.join("servicenow_tickets.csv"),
        "incident_id,ticket_id,type,resolution,description,source\n\
         INC007,TKT100,similar_incident,Scaled out the checkout worker pool and rolled back the gateway config,,servicenow\n\
         INC011,TKT101,similar_incident,Increased connection pool limits for checkout,,servicenow\n",
    )
    .expect("servicenow_tickets.csv");

    std::fs::write(
        base.join("change_correlations.csv"),
        "incident_id,change_id,description,deployed_at,correlation_score\n\
         INC001,CHG005,Deployed payment gateway v2.3 to checkout,2024-03-01T09:30:00Z,0.88\n\
         INC001,CHG009,Increased checkout cache ttl,2024-02-29T18:00:00Z,0.74\n\
         INC001,CHG777,Rotated tls certificates months earlier,2024-01-10T00:00:00Z,0.95\n",
    )
    .expect("change_correlations.csv");

    std::fs::write(
        base.join("confluence_docs.csv"),
        "incident_id,doc_id,title,content\n\
         INC001,DOC1,Checkout gateway runbook,Steps for diagnosing checkout payment gateway latency: check pool metrics then scale\n\
         INC001,DOC2,Connection pool tuning,How to size connection pools for checkout and payments services\n\
         ,DOC3,Unrelated planning notes,quarterly roadmap items for the platform group\n",
    )
    .expect("confluence_docs.csv");

    let runbooks = base.join("runbooks");
    std::fs::create_dir_all(&runbooks).expect("runbooks dir");
    std::fs::write(
        runbooks.join("gateway-rollback.md"),
        "---\ntitle: Gateway rollback procedure\n---\nRoll back the checkout gateway deploy and verify latency recovers.\n",
    )
    .expect("runbook");

    dir
}

pub fn test_config(fixtures: &tempfile::TempDir) -> AppConfig {
    let base = fixtures.path();
    let mut config = AppConfig::default();
    config.llm.provider = LlmProvider::Mock;
    config.incident_connector = IncidentConnectorConfig::Mock(MockConnectorConfig {
        data_dir: base.to_path_buf(),
    });
    config.knowledge_base = KnowledgeBaseConfig::Mock(MockKnowledgeBaseConfig {
        csv_path: Some(base.join("confluence_docs.csv")),
        docs_folder: Some(base.join("runbooks")),
    });
    config.prompts_path = Some(base.join("prompts.json"));
    config
}

async fn spawn_state(state: AppState, fixtures: tempfile::TempDir) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(serve::run_serve_on_listener(listener, state));
    TestServer {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        _fixtures: fixtures,
        _server: server,
    }
}

/// Spawns a server over fresh fixtures with the scripted mock LLM.
pub async fn spawn() -> TestServer {
    let fixtures = write_fixtures();
    let config = test_config(&fixtures);
    let state = AppState::from_config(&config, None).expect("app state");
    spawn_state(state, fixtures).await
}

/// Spawns a server whose LLM handle wraps the given client (for
/// cancellation and failure scenarios).
pub async fn spawn_with_llm(client: Arc<dyn smartrecover::LlmClient>) -> TestServer {
    let fixtures = write_fixtures();
    let config = test_config(&fixtures);

    let connector_timeout = Duration::from_secs(config.agents.connector_timeout_secs);
    let incidents =
        smartrecover::build_incident_connector(&config.incident_connector, connector_timeout)
            .expect("incident connector");
    let knowledge_base =
        smartrecover::build_knowledge_base(&config.knowledge_base, connector_timeout)
            .expect("knowledge base");
    let cache = Arc::new(TtlCache::new(Duration::from_secs(config.cache.ttl_seconds)));
    let exclusions = Arc::new(ExclusionStore::new());
    let prompts = Arc::new(PromptStore::new(None).expect("prompt store"));
    let prompt_log = Arc::new(PromptLogStore::new(config.prompt_logs.max_entries));
    let llm = Arc::new(LlmHandle::with_client(
        client,
        config.llm.clone(),
        prompt_log.clone(),
    ));
    let orchestrator = Arc::new(
        Orchestrator::new(
            incidents.clone(),
            knowledge_base,
            cache.clone(),
            exclusions.clone(),
            prompts.clone(),
            llm.clone(),
            AgentSettings::from(&config.agents),
        )
        .expect("orchestrator"),
    );
    let state = AppState {
        orchestrator,
        incidents,
        cache,
        exclusions,
        prompts,
        prompt_log,
        llm,
        log_handle: None,
    };
    spawn_state(state, fixtures).await
}

pub async fn get_json(server: &TestServer, path: &str) -> (reqwest::StatusCode, serde_json::Value) {
    let response = server
        .client
        .get(server.url(path))
        .send()
        .await
        .expect("request");
    let status = response.status();
    let body: serde_json::Value = response.json().await.expect("json body");
    eprintln!("[e2e] received: {} {}", status, body);
    (status, body)
}

pub async fn post_json(
    server: &TestServer,
    path: &str,
    body: serde_json::Value,
) -> (reqwest::StatusCode, serde_json::Value) {
    let response = server
        .client
        .post(server.url(path))
        .json(&body)
        .send()
        .await
        .expect("request");
    let status = response.status();
    let body: serde_json::Value = response.json().await.expect("json body");
    eprintln!("[e2e] received: {} {}", status, body);
    (status, body)
}
