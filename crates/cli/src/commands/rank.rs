//! `signalscope rank`: Rank a fixture's feed for one user.

use clap::Args;
use signalscope_config::AppConfig;
use signalscope_signals::{Candidate, RankOptions, RelevanceRanker};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::feed::{FeedArgs, build_feed};

#[derive(Args)]
pub struct RankArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// User whose liked set and network the ranking is for
    #[arg(long)]
    pub user: String,

    /// Maximum ranked results (overrides config)
    #[arg(long)]
    pub top: Option<usize>,

    /// Ignore the user's liked set
    #[arg(long)]
    pub no_liked_bonus: bool,
}

pub async fn run(args: RankArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let (feed, likes) = build_feed(&config, &args.feed).await?;

    let mut options = RankOptions::from(&config.ranking);
    if args.top.is_some() {
        options.limit = args.top;
    }
    if args.no_liked_bonus {
        options.include_liked_bonus = false;
    }

    let names: BTreeMap<_, _> = feed
        .entries
        .iter()
        .filter_map(|e| e.profile.as_ref().map(|p| (p.person_id.clone(), p.name.clone())))
        .collect();
    let candidates: Vec<Candidate> = feed.entries.iter().map(Candidate::from_enriched).collect();

    let ranker = RelevanceRanker::new(Arc::new(likes));
    let ranked = ranker.rank(candidates, &args.user, &options).await;

    if args.feed.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    println!("🏆 Ranked for {}", args.user);
    println!("==============={}", "=".repeat(args.user.chars().count()));
    for (i, r) in ranked.iter().enumerate() {
        let id = &r.candidate.person_id;
        let name = names.get(id).map_or(id.as_str(), String::as_str);
        let liked = if r.liked { " ♥" } else { "" };
        println!("  {:>3}. {:<24} {:>3}{liked}", i + 1, name, r.score);
    }

    Ok(())
}
