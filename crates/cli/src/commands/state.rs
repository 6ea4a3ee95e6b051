//! `stepwise state` — inspect and manage stored plan state.

use std::sync::Arc;
use stepwise_agent::TaskPlanner;
use stepwise_config::AppConfig;
use stepwise_core::{ConversationId, EventBus};

pub async fn show(conversation: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = super::open_store(&config).await?;
    let id = ConversationId::from(conversation);

    match store.load(&id).await? {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("No state stored for conversation {id}"),
    }
    Ok(())
}

pub async fn reset(conversation: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let planner = TaskPlanner::new(
        super::open_store(&config).await?,
        Arc::new(EventBus::default()),
    );
    let id = ConversationId::from(conversation);

    match planner.reset(&id).await? {
        Some(state) => println!("Reset conversation {id} (version {})", state.version),
        None => println!("No state stored for conversation {id}"),
    }
    Ok(())
}

pub async fn delete(conversation: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let planner = TaskPlanner::new(
        super::open_store(&config).await?,
        Arc::new(EventBus::default()),
    );
    let id = ConversationId::from(conversation);

    planner.forget(&id).await?;
    println!("Deleted state for conversation {id}");
    Ok(())
}
