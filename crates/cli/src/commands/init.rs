//! `stepwise init` — write the default configuration.

use stepwise_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set api_key in the config, or export STEPWISE_API_KEY");
    println!("  2. Optionally set tools.search_api_key (or STEPWISE_SEARCH_API_KEY) for web_search");
    println!("  3. stepwise run -m \"Research the latest async runtimes and summarize the trade-offs\"");
    Ok(())
}
