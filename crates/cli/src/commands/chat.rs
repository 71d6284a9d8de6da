//! `nugget chat`: Interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use nugget_agent::{
    AnswerComposer, ModelSettings, QueryReformulator, RagPipeline, RagTool, Session, SessionStore,
    ToolRouter, TurnOrchestrator,
};
use nugget_config::AppConfig;
use nugget_core::document::DocumentStore;
use nugget_core::event::EventBus;
use nugget_core::message::{Role, TurnMode};
use nugget_core::provider::Provider;
use nugget_core::tool::RouterTool;
use nugget_store::FileStore;
use nugget_telemetry::{SpanKind, TelemetryEngine, Trace};
use nugget_tools::WikipediaLookup;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Wire the answering pipeline: RAG tool and optional lookup behind the
/// router, the router behind the orchestrator.
pub fn build_orchestrator(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    store: Arc<dyn DocumentStore>,
    telemetry: Arc<TelemetryEngine>,
    events: Arc<EventBus>,
) -> TurnOrchestrator {
    let settings = ModelSettings::from_config(config);
    let rag = RagPipeline::new(
        QueryReformulator::new(provider.clone(), settings.clone()),
        store,
        AnswerComposer::new(provider.clone(), settings.clone()),
    )
    .with_top_k(config.retrieval.top_k);

    let mut tools: Vec<Arc<dyn RouterTool>> = vec![Arc::new(RagTool::new(rag))];
    if config.lookup.enabled {
        tools.push(Arc::new(WikipediaLookup::from_config(&config.lookup)));
    }

    let router = ToolRouter::new(provider, settings, tools)
        .with_max_steps(config.agent.max_steps as usize)
        .with_max_parse_retries(config.agent.max_parse_retries as usize)
        .with_events(events.clone())
        .with_telemetry(telemetry.clone());

    let orchestrator = TurnOrchestrator::new(router)
        .with_events(events)
        .with_telemetry(telemetry);
    if config.session.persist {
        orchestrator.with_persistence(SessionStore::new(config.session.history_path()))
    } else {
        orchestrator
    }
}

fn welcome(name: Option<&str>) -> String {
    let name = name.map(|n| format!(", {n}")).unwrap_or_default();
    format!("Hello{name}! I'm your Nugget AI Assistant. How may I help you with your dining questions today?")
}

fn trace_summary(trace: &Trace) -> String {
    let kinds = [SpanKind::LlmCall, SpanKind::ToolExecution]
        .map(|kind| format!("{kind}={}", trace.count(kind)))
        .join(" ");
    format!("{kinds} total_ms={}", trace.total_duration_ms())
}

fn print_reply(reply: &str) {
    println!();
    for line in reply.lines() {
        println!("  Nugget > {line}");
    }
    println!();
}

pub async fn run(
    config: &AppConfig,
    message: Option<String>,
    name: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = Arc::new(EventBus::default());
    let mut event_rx = events.subscribe();
    let telemetry = Arc::new(TelemetryEngine::new());

    let provider = match nugget_providers::build_from_config(
        config,
        telemetry.rate_limit_counter(),
        Some(events.clone()),
    ) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    NUGGET_API_KEY=...   (generic)");
            eprintln!("    GROQ_API_KEY=gsk_... (Groq, the default provider)");
            eprintln!();
            eprintln!("  Or add api_key to your config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            return Err(e.into());
        }
    };

    let store = FileStore::open(config.retrieval.documents_path(), config.retrieval.min_score).await;
    let indexed = store.count().await?;
    if indexed == 0 {
        warn!(
            path = %store.path().display(),
            "No restaurant documents indexed yet; run `nugget ingest <FILE>` first"
        );
    }

    let orchestrator = build_orchestrator(config, provider, Arc::new(store), telemetry.clone(), events);
    let session_store = SessionStore::new(config.session.history_path());
    let mut session = if config.session.persist {
        session_store.load()
    } else {
        Session::new()
    };

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let outcome = orchestrator.handle_turn(&mut session, &msg).await;
        eprint!("\r              \r");
        println!("{}", outcome.reply);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Nugget — Your Restro Buddy            ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Indexed:   {indexed} restaurants");
    println!(
        "  Tools:     {}",
        orchestrator
            .router()
            .tools()
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("  Type your question and press Enter.");
    println!("  Commands: /clear, /usage, exit");

    for turn in &session.turns {
        let who = match turn.role {
            Role::User => "You   ",
            _ => "Nugget",
        };
        println!("  {who} > {}", turn.content);
    }
    if session.is_empty() {
        print_reply(&welcome(name.as_deref()));
    } else {
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        match text {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                session.clear();
                if let Err(e) = session_store.clear() {
                    warn!(error = %e, "Failed to delete saved session");
                }
                println!("  Chat history cleared!");
                println!();
                continue;
            }
            "/usage" => {
                println!("{}", telemetry.snapshot_json()?);
                if let Some(last) = telemetry.recent_traces(1).first() {
                    println!("  Last turn: {}", trace_summary(last));
                }
                continue;
            }
            _ => {}
        }

        eprint!("  ...");
        let outcome = orchestrator.handle_turn(&mut session, text).await;
        eprint!("\r     \r");
        if outcome.mode == TurnMode::Error {
            eprintln!("  [Error turn, not saved]");
        }
        print_reply(&outcome.reply);

        while let Ok(event) = event_rx.try_recv() {
            debug!(?event, "Domain event");
        }
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
