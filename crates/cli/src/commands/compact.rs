//! `signalscope compact`: Compact a conversation history file.

use clap::Args;
use serde::Serialize;
use signalscope_config::AppConfig;
use signalscope_context::{CompactionMetrics, ContextSession, ExtractiveSummarizer, sizer};
use signalscope_core::message::Message;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct CompactArgs {
    /// JSON file holding an array of messages
    pub history: PathBuf,

    /// Override the number of recent turns kept verbatim
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Override the summarization threshold (0 disables summaries)
    #[arg(long)]
    pub summarize_after: Option<usize>,

    /// Leave tool results untouched
    #[arg(long)]
    pub no_trim: bool,

    /// Print the compacted messages as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CompactOutput<'a> {
    metrics: CompactionMetrics,
    messages: &'a [Message],
}

pub async fn run(args: CompactArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(n) = args.max_turns {
        config.context.max_turns = n;
    }
    if let Some(n) = args.summarize_after {
        config.context.summarize_after = n;
    }
    if args.no_trim {
        config.context.tool_trim_enabled = false;
    }

    let content = std::fs::read_to_string(&args.history)
        .map_err(|e| format!("Failed to read {}: {e}", args.history.display()))?;
    let history: Vec<Message> = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {e}", args.history.display()))?;
    let tokens_before = sizer::estimate_messages_tokens(&history);

    let mut session = ContextSession::new(config.context.clone())
        .with_summarizer(Arc::new(ExtractiveSummarizer::new()));
    session.add_messages(history);
    let messages = session.optimized_messages().await.to_vec();
    let metrics = session.metrics();

    if args.json {
        let output = CompactOutput {
            metrics,
            messages: &messages,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let tokens_after = sizer::estimate_messages_tokens(&messages);
    println!("📦 Context Compaction");
    println!("=====================");
    println!("  Turns:       {}", metrics.turn_count);
    println!(
        "  Messages:    {} → {}",
        metrics.raw_message_count, metrics.optimized_message_count
    );
    println!("  Est. tokens: {tokens_before} → {tokens_after}");
    println!("  Tool trims:  {}", metrics.tool_trim_count);
    println!(
        "  Summary:     {}",
        if metrics.summary_added { "added" } else { "none" }
    );
    println!();
    for msg in &messages {
        let text = msg.text();
        let preview = sizer::truncate_chars(text.trim(), 80);
        let tools = if msg.tool_events.is_empty() {
            String::new()
        } else {
            format!(" [{} tool events]", msg.tool_events.len())
        };
        println!("  {:<10} {preview}{tools}", msg.role.as_str());
    }

    Ok(())
}
