//! `signalscope config`: Configuration management commands.

use signalscope_config::AppConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    if config.context.summarization_enabled()
        && config.context.summarize_after < config.context.max_turns
    {
        println!("# ⚠️  summarize_after < max_turns: summaries start before turns leave the window");
    }
    Ok(())
}

pub async fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote default config: {}", config_path.display());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = signalscope_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".signalscope"));
    }

    #[test]
    fn default_toml_parses_back() {
        let parsed: signalscope_config::AppConfig =
            toml::from_str(&signalscope_config::AppConfig::default_toml()).unwrap();
        assert_eq!(parsed.context.max_turns, 10);
    }
}
