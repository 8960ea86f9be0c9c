use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use feedbrief::ai::{GeminiClient, GeminiConfig, Processor};
use feedbrief::config::Config;
use feedbrief::feed::{EntryRecord, FeedFetcher, UserAgentPool};
use feedbrief::output::{MarkdownWriter, ProcessedArticle};

#[derive(Parser, Debug)]
#[command(
    name = "feedbrief",
    about = "Fetch a feed, summarize and translate its entries, write markdown digests"
)]
struct Args {
    /// Path to the TOML config file
    #[arg(long, value_name = "FILE", default_value = "feedbrief.toml")]
    config: PathBuf,

    /// Feed URL (overrides config and RSS_FEED_URL)
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Output directory for digests (overrides config and OUTPUT_DIR)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config).context("Failed to load configuration")?;
    config.apply_env();
    if let Some(url) = args.feed_url {
        config.feed_url = url;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir.display().to_string();
    }

    let source = Url::parse(&config.feed_url)
        .with_context(|| format!("Invalid feed URL '{}'", config.feed_url))?;

    let api_key = config
        .api_key
        .clone()
        .context("GOOGLE_API_KEY is not set (env var or api_key in the config file)")?;

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let fetcher = FeedFetcher::new(
        client.clone(),
        source,
        UserAgentPool::new(config.user_agents.clone()),
        Duration::from_secs(config.request_timeout_secs),
    );

    let mut gemini_cfg = GeminiConfig::new(SecretString::from(api_key));
    gemini_cfg.model = config.model.clone();
    gemini_cfg.max_summary_chars = config.max_summary_chars;
    let processor = GeminiClient::new(client, gemini_cfg);

    let writer =
        MarkdownWriter::new(&config.output_dir).context("Failed to prepare output directory")?;

    tracing::info!(url = %config.feed_url, "Starting feed processing");

    let entries = fetcher
        .entries()
        .await
        .context("Failed to fetch and normalize feed")?;
    tracing::info!(count = entries.len(), "Found entries");

    let today = Utc::now().date_naive();
    let mut written = 0usize;
    let mut skipped = 0usize;

    for entry in &entries {
        match process_entry(&processor, entry).await {
            Ok(article) => {
                let path = writer
                    .write(&article, today)
                    .with_context(|| format!("Failed to write digest for '{}'", entry.title))?;
                tracing::info!(path = %path.display(), "Wrote digest");
                written += 1;
            }
            Err(e) => {
                // One bad entry never aborts the batch
                tracing::error!(title = %entry.title, error = %e, "Skipping entry");
                skipped += 1;
            }
        }
    }

    tracing::info!(written = written, skipped = skipped, "Finished processing");
    println!(
        "Processed {} entries ({} written, {} skipped) into {}",
        entries.len(),
        written,
        skipped,
        writer.output_dir().display()
    );
    Ok(())
}

/// Runs the AI stage for one entry: summarize the content, then translate
/// title and summary.
async fn process_entry(
    processor: &dyn Processor,
    entry: &EntryRecord,
) -> Result<ProcessedArticle> {
    let summary = processor
        .summarize(&entry.content)
        .await
        .context("Summarization failed")?;
    let title_translated = processor
        .translate(&entry.title)
        .await
        .context("Title translation failed")?;
    let summary_translated = processor
        .translate(&summary)
        .await
        .context("Summary translation failed")?;

    Ok(ProcessedArticle {
        entry: entry.clone(),
        title_translated,
        summary,
        summary_translated,
    })
}
