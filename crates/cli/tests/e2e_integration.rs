//! End-to-end integration tests for the Nugget answering pipeline.
//!
//! These tests wire the real crates together (file-backed index, retrying
//! provider, router, orchestrator, session file) and script only the model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nugget_agent::{
    AnswerComposer, DEGRADED_PREFIX, ModelSettings, QueryReformulator, RagPipeline, RagTool, Session,
    SessionStore, ToolRouter, TurnOrchestrator,
};
use nugget_config::AppConfig;
use nugget_core::error::ProviderError;
use nugget_core::event::{DomainEvent, EventBus};
use nugget_core::message::{Message, Role, TurnMode};
use nugget_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use nugget_core::tool::RouterTool;
use nugget_providers::{RetryPolicy, RetryingProvider};
use nugget_store::FileStore;
use nugget_store::ingest::ingest_file;
use nugget_telemetry::TelemetryEngine;

// ── Scripted Provider ────────────────────────────────────────────────────

/// A provider that replays scripted results in order and records requests.
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(text_response(t))).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted at call #{call}"))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn act(tool: &str, input: &str) -> String {
    format!("Thought: I should use {tool}\nAction: {tool}\nAction Input: {input}")
}

fn finish(answer: &str) -> String {
    format!("Thought: I now know the final answer\nFinal Answer: {answer}")
}

fn throttled() -> Result<ProviderResponse, ProviderError> {
    Err(ProviderError::RateLimited { retry_after_secs: 5 })
}

// ── Fixture ──────────────────────────────────────────────────────────────

const RESTAURANTS: &str = r#"[
    {
        "name": "KFC (Shahjahan Road, Lucknow)",
        "locations": ["Shahjahan Road, Lucknow"],
        "menu": [
            {"name": "Zinger Burger", "description": "Crispy chicken fillet burger", "price": "₹ 199"},
            {"name": "Hot Wings", "description": null, "price": "₹ 149"}
        ],
        "hours": "11:00 AM - 11:00 PM",
        "contact": {"phone": "+91 522 400 1234"},
        "special": ["Dine-in and takeaway"]
    },
    {
        "name": "Tunday Kababi",
        "locations": ["Aminabad, Lucknow"],
        "menu": [
            {"name": "Galouti Kebab", "description": "Melt-in-the-mouth minced mutton kebab", "price": "₹ 180"}
        ],
        "hours": "12:00 PM - 11:30 PM"
    },
    {
        "name": "Domino's Pizza (Hazratganj)",
        "locations": ["Hazratganj, Lucknow"],
        "menu": [
            {"name": "Margherita", "description": "Classic cheese pizza", "price": "₹ 239"},
            {"name": "Farmhouse", "description": "Capsicum, onion, tomato and mushroom", "price": "₹ 459"}
        ],
        "hours": "10:00 AM - 11:00 PM"
    }
]"#;

struct Harness {
    orchestrator: TurnOrchestrator,
    session_store: SessionStore,
    telemetry: Arc<TelemetryEngine>,
    events: Arc<EventBus>,
    _dir: tempfile::TempDir,
}

/// Ingest the fixture into a temp index and wire the pipeline the way
/// `nugget chat` does, with the lookup tool left out.
async fn harness(provider: Arc<dyn Provider>, config: &AppConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("restaurants.json");
    std::fs::write(&records, RESTAURANTS).unwrap();

    let store = FileStore::open(dir.path().join("documents.jsonl"), config.retrieval.min_score).await;
    assert_eq!(ingest_file(&records, &store).await.unwrap(), 3);

    let telemetry = Arc::new(TelemetryEngine::new());
    let events = Arc::new(EventBus::default());
    let settings = ModelSettings::from_config(config);

    let rag = RagPipeline::new(
        QueryReformulator::new(provider.clone(), settings.clone()),
        Arc::new(store),
        AnswerComposer::new(provider.clone(), settings.clone()),
    )
    .with_top_k(config.retrieval.top_k);
    let tools: Vec<Arc<dyn RouterTool>> = vec![Arc::new(RagTool::new(rag))];

    let router = ToolRouter::new(provider, settings, tools)
        .with_max_steps(config.agent.max_steps as usize)
        .with_max_parse_retries(config.agent.max_parse_retries as usize)
        .with_events(events.clone())
        .with_telemetry(telemetry.clone());

    let session_store = SessionStore::new(dir.path().join("chat_history.json"));
    let orchestrator = TurnOrchestrator::new(router)
        .with_persistence(session_store.clone())
        .with_events(events.clone())
        .with_telemetry(telemetry.clone());

    Harness {
        orchestrator,
        session_store,
        telemetry,
        events,
        _dir: dir,
    }
}

fn retrying(inner: Arc<ScriptedProvider>, telemetry_counter: nugget_telemetry::RateLimitCounter) -> Arc<dyn Provider> {
    Arc::new(RetryingProvider::new(inner, RetryPolicy::default(), telemetry_counter))
}

// ── E2E: Grounded conversation ───────────────────────────────────────────

#[tokio::test]
async fn e2e_kfc_follow_up_is_reformulated_and_grounded() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        // turn 1: router → RAG (no history, so no reformulation) → router
        act("restaurant_rag", "Where is KFC located?").as_str(),
        "Hi Asha! KFC is located on Shahjahan Road, Lucknow.",
        finish("Hi Asha! KFC is located on Shahjahan Road, Lucknow.").as_str(),
        // turn 2: router → reformulate → compose → router
        act("restaurant_rag", "What's on their menu?").as_str(),
        "What is on the menu at KFC?",
        "KFC's menu includes the Zinger Burger (₹ 199) and Hot Wings (₹ 149).",
        finish("KFC's menu includes the Zinger Burger (₹ 199) and Hot Wings (₹ 149).").as_str(),
    ]));
    let h = harness(provider.clone(), &AppConfig::default()).await;
    let mut session = Session::new();

    let first = h
        .orchestrator
        .handle_turn(&mut session, "Hi, I'm Asha. Where is KFC located?")
        .await;
    assert_eq!(first.mode, TurnMode::Normal);
    assert!(first.reply.contains("Shahjahan Road"));

    let first_compose = provider.request(1);
    assert!(first_compose.messages[0].content.contains("Name: KFC (Shahjahan Road, Lucknow)"));

    let second = h.orchestrator.handle_turn(&mut session, "What's on their menu?").await;
    assert_eq!(second.mode, TurnMode::Normal);
    assert!(second.reply.contains("Zinger Burger"));
    assert_eq!(provider.calls(), 7);

    // The reformulator saw both earlier turns and the follow-up.
    let reformulate = provider.request(4);
    assert_eq!(reformulate.temperature, 0.0);
    let roles: Vec<Role> = reformulate.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
    assert_eq!(reformulate.messages[3].content, "What's on their menu?");

    // The composer was grounded on the KFC menu for the standalone question.
    let compose = provider.request(5);
    assert!(compose.messages[0].content.contains("Zinger Burger: Crispy chicken fillet burger (₹ 199)"));
    assert_eq!(compose.messages.last().unwrap().content, "What is on the menu at KFC?");

    // Both exchanges survive a restart.
    let restored = h.session_store.load();
    assert_eq!(restored, session);
    assert_eq!(restored.len(), 4);

    let snapshot = h.telemetry.snapshot();
    assert_eq!(snapshot.completed_turns, 2);
    assert_eq!(snapshot.tool_invocations, 2);
}

/// Every `₹` amount in `text`, e.g. `["199", "149"]`.
fn rupee_figures(text: &str) -> Vec<String> {
    text.split('₹')
        .skip(1)
        .map(|rest| {
            rest.trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == ',')
                .collect::<String>()
        })
        .filter(|figure| !figure.is_empty())
        .collect()
}

#[tokio::test]
async fn e2e_kfc_dessert_prices_come_only_from_context() {
    let question = "What's the price range for KFC's dessert menu?";
    let answer = "I don't have any dessert items listed for KFC. Their menu shows the Zinger Burger \
                  (₹ 199) and Hot Wings (₹ 149).";
    let provider = Arc::new(ScriptedProvider::texts(&[
        act("restaurant_rag", question).as_str(),
        answer,
        finish(answer).as_str(),
    ]));
    let h = harness(provider.clone(), &AppConfig::default()).await;
    let mut session = Session::new();

    let outcome = h.orchestrator.handle_turn(&mut session, question).await;
    assert_eq!(outcome.mode, TurnMode::Normal);
    assert_eq!(outcome.reply, answer);

    // Empty history: no reformulation call, the second request is the composer.
    assert_eq!(provider.calls(), 3);
    let compose = provider.request(1);
    let system = &compose.messages[0].content;
    assert!(!system.contains(nugget_agent::prompts::CONTEXTUALIZE_PROMPT));
    assert!(system.contains("Name: KFC (Shahjahan Road, Lucknow)"));
    assert_eq!(compose.messages.last().unwrap().content, question);

    let figures = rupee_figures(&outcome.reply);
    assert_eq!(figures, ["199", "149"]);
    for figure in figures {
        assert!(system.contains(&format!("₹ {figure}")), "₹ {figure} is not in the context");
    }
}

#[tokio::test]
async fn e2e_unrelated_question_admits_missing_information() {
    let admission = "I don't have information about that in my restaurant data.";
    let provider = Arc::new(ScriptedProvider::texts(&[
        act("restaurant_rag", "How tall is the Eiffel Tower?").as_str(),
        admission,
        finish(admission).as_str(),
    ]));
    let h = harness(provider.clone(), &AppConfig::default()).await;
    let mut session = Session::new();

    let outcome = h
        .orchestrator
        .handle_turn(&mut session, "How tall is the Eiffel Tower?")
        .await;
    assert_eq!(outcome.mode, TurnMode::Normal);

    let system = &provider.request(1).messages[0].content;
    assert!(system.contains("No relevant restaurant information was retrieved"));
    assert!(!system.contains("Name:"));

    let reply = outcome.reply.to_lowercase();
    for name in ["kfc", "tunday", "domino", "₹"] {
        assert!(!reply.contains(name), "reply mentions {name}");
    }
}

// ── E2E: Throttling ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_rate_limit_exhaustion_degrades_to_fallback() {
    let telemetry_counter = nugget_telemetry::RateLimitCounter::new();
    let inner = Arc::new(ScriptedProvider::new((0..5).map(|_| throttled()).collect()));
    let provider = retrying(inner.clone(), telemetry_counter.clone());
    let h = harness(provider, &AppConfig::default()).await;
    let mut rx = h.events.subscribe();
    let mut session = Session::new();

    let start = tokio::time::Instant::now();
    let outcome = h.orchestrator.handle_turn(&mut session, "Any good pizza nearby?").await;

    assert_eq!(outcome.mode, TurnMode::Degraded);
    assert!(outcome.reply.starts_with(DEGRADED_PREFIX));
    assert!(outcome.reply.contains("Italian cuisine"));
    assert_eq!(inner.calls(), 5);
    assert_eq!(telemetry_counter.get(), 5);
    // 2 + 4 + 8 + 16 seconds of backoff
    assert_eq!(start.elapsed().as_secs(), 30);

    let saved = h.session_store.load();
    assert_eq!(saved.turns[1].mode, TurnMode::Degraded);

    let mut completed = false;
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::TurnCompleted { mode, .. } = event.as_ref() {
            assert_eq!(*mode, TurnMode::Degraded);
            completed = true;
        }
    }
    assert!(completed);
}

#[tokio::test(start_paused = true)]
async fn e2e_transient_throttling_recovers() {
    let counter = nugget_telemetry::RateLimitCounter::new();
    let inner = Arc::new(ScriptedProvider::new(vec![
        throttled(),
        throttled(),
        Ok(text_response(finish("Hello! Ask me anything about local restaurants.").as_str())),
    ]));
    let h = harness(retrying(inner.clone(), counter.clone()), &AppConfig::default()).await;
    let mut session = Session::new();

    let outcome = h.orchestrator.handle_turn(&mut session, "Hello").await;
    assert_eq!(outcome.mode, TurnMode::Normal);
    assert_eq!(outcome.reply, "Hello! Ask me anything about local restaurants.");
    assert_eq!(inner.calls(), 3);
    assert_eq!(counter.get(), 2);
}

#[tokio::test]
async fn e2e_fatal_error_is_not_retried_or_saved() {
    let counter = nugget_telemetry::RateLimitCounter::new();
    let inner = Arc::new(ScriptedProvider::new(vec![Err(
        ProviderError::AuthenticationFailed("invalid api key".into()),
    )]));
    let h = harness(retrying(inner.clone(), counter.clone()), &AppConfig::default()).await;
    let mut session = Session::new();

    let outcome = h.orchestrator.handle_turn(&mut session, "Where is KFC?").await;
    assert_eq!(outcome.mode, TurnMode::Error);
    assert!(outcome.reply.contains("invalid api key"));
    assert_eq!(inner.calls(), 1);
    assert_eq!(counter.get(), 0);
    assert!(h.session_store.load().is_empty());
}

// ── E2E: Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_step_budget_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[agent]\nmax_steps = 2\n\n[retrieval]\ntop_k = 1\n").unwrap();
    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.agent.max_steps, 2);

    // The model never finishes; each step asks the RAG tool again.
    let provider = Arc::new(ScriptedProvider::texts(&[
        act("restaurant_rag", "pizza in Hazratganj").as_str(),
        "Domino's Pizza in Hazratganj serves a Margherita for ₹ 239.",
        act("restaurant_rag", "pizza in Hazratganj").as_str(),
        "Domino's Pizza in Hazratganj serves a Margherita for ₹ 239.",
    ]));
    let h = harness(provider.clone(), &config).await;
    let mut session = Session::new();

    let outcome = h
        .orchestrator
        .handle_turn(&mut session, "Any pizza places in Hazratganj?")
        .await;
    assert_eq!(outcome.mode, TurnMode::Normal);
    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.reply, "Domino's Pizza in Hazratganj serves a Margherita for ₹ 239.");
    assert_eq!(provider.calls(), 4);

    // top_k = 1: a single passage reached the composer.
    let system = &provider.request(1).messages[0].content;
    assert_eq!(system.matches("Name: ").count(), 1);
    assert!(system.contains("Domino's Pizza (Hazratganj)"));
}
