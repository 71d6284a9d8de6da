//! `nugget history`: Inspect or delete the saved conversation.

use nugget_agent::SessionStore;
use nugget_config::AppConfig;
use nugget_core::message::{Role, TurnMode};

pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SessionStore::new(config.session.history_path());
    let session = store.load();

    if session.is_empty() {
        println!("No saved conversation at {}", store.path().display());
        return Ok(());
    }

    println!("💬 {} turns ({})", session.len(), store.path().display());
    println!("─────────────────────────────────────");
    for turn in &session.turns {
        let who = match turn.role {
            Role::User => "You",
            Role::Assistant => "Nugget",
            Role::System => "System",
        };
        let tag = match turn.mode {
            TurnMode::Normal => "",
            TurnMode::Degraded => " [degraded]",
            TurnMode::Error => " [error]",
        };
        println!("{who}{tag}: {}", turn.content);
    }
    Ok(())
}

pub fn clear(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SessionStore::new(config.session.history_path());
    store.clear()?;
    println!("Chat history cleared!");
    Ok(())
}
