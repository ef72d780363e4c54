//! `signalscope feed`: Build a merged signal feed from a fixture file.

use chrono::{NaiveDate, Utc};
use clap::Args;
use signalscope_config::AppConfig;
use signalscope_core::trigger::{DateWindow, TriggerType};
use signalscope_signals::{EnrichedFeed, FeedQuery, SignalFeedService, normalize_date};
use signalscope_store::{Fixture, InMemoryLikes};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Clone)]
pub struct FeedArgs {
    /// Fixture JSON with events, profiles, and likes
    pub fixture: PathBuf,

    /// First day of the window (defaults to the configured trailing window)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Last day of the window (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Maximum feed entries
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only query these trigger types (repeatable)
    #[arg(long = "trigger", value_name = "TYPE")]
    pub triggers: Vec<TriggerType>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    normalize_date(raw).ok_or_else(|| format!("unrecognized date: {raw}"))
}

/// Resolve the requested window against the configured default.
pub fn resolve_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    default_days: u32,
    today: NaiveDate,
) -> Result<DateWindow, String> {
    let to = to.unwrap_or(today);
    let window = match from {
        Some(from) => DateWindow::new(from, to),
        None => DateWindow::trailing_days(to, default_days),
    };
    if window.from > window.to {
        return Err(format!("--from {} is after --to {}", window.from, window.to));
    }
    Ok(window)
}

/// Load the fixture and assemble its feed. Also hands back the likes store.
pub async fn build_feed(
    config: &AppConfig,
    args: &FeedArgs,
) -> Result<(EnrichedFeed, InMemoryLikes), Box<dyn std::error::Error>> {
    let window = resolve_window(
        args.from,
        args.to,
        config.signals.default_window_days,
        Utc::now().date_naive(),
    )?;
    let stores = Fixture::load(&args.fixture)?.into_stores();

    let mut service = SignalFeedService::new(&config.signals)
        .with_profiles(Arc::new(stores.profiles));
    for provider in stores.triggers.providers() {
        service = service.with_provider(provider);
    }

    let mut query = FeedQuery::new(window);
    query.limit = args.limit;
    if !args.triggers.is_empty() {
        query = query.with_trigger_types(args.triggers.iter().copied());
    }

    tracing::debug!(
        from = %window.from,
        to = %window.to,
        registered = ?service.registered_triggers(),
        "Querying feed"
    );
    Ok((service.feed(&query).await, stores.likes))
}

pub async fn run(args: FeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let (feed, _) = build_feed(&config, &args).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&feed)?);
        return Ok(());
    }

    println!("📡 Signal Feed");
    println!("==============");
    println!(
        "  Matched {} people, showing {}",
        feed.total_matched,
        feed.entries.len()
    );
    for failed in &feed.failed_triggers {
        println!("  ⚠️  {failed} source unavailable");
    }
    println!();
    for entry in &feed.entries {
        let date = entry
            .entry
            .most_recent_date
            .map_or_else(|| "undated".to_string(), |d| d.to_string());
        let name = entry
            .profile
            .as_ref()
            .map_or(entry.entry.person_id.as_str(), |p| p.name.as_str());
        let labels: Vec<&str> = entry
            .entry
            .trigger_types_matched
            .iter()
            .map(TriggerType::label)
            .collect();
        println!("  {date:<10}  {name:<24} {}", labels.join(", "));
    }

    Ok(())
}
