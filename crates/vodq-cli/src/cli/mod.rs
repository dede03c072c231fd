//! CLI for the VODQ orchestrator.

use crate::adapters::build_capabilities;
use anyhow::Result;
use clap::{Parser, Subcommand};
use vodq_core::config;
use vodq_core::store::{ListOrder, Stage, Store};
use vodq_core::worker::Worker;

/// The CLI is a single-operator tool: every item and subscription is owned
/// by this fixed local user id rather than a multi-tenant account system.
const LOCAL_USER_ID: i64 = 1;

const ALL_STAGES: [Stage; 8] = [
    Stage::Pending,
    Stage::Downloading,
    Stage::Converting,
    Stage::Transcribing,
    Stage::Summarizing,
    Stage::Completed,
    Stage::Failed,
    Stage::Unavailable,
];

/// Top-level CLI for the VODQ video ingestion queue worker.
#[derive(Debug, Parser)]
#[command(name = "vodq")]
#[command(about = "VODQ: download, transcribe, and summarize videos through a queue worker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the Pool Scheduler, Stuck-Task Supervisor, and Subscription
    /// Loops until interrupted.
    Run,

    /// Enqueue a URL as a new pending item.
    Add {
        /// Source video URL.
        url: String,
    },

    /// List items across every stage, newest first.
    List,

    /// Show the full record for one item.
    Status {
        /// Item id.
        id: i64,
    },

    /// Subscribe to a channel; its videos are discovered by the poller loop.
    Subscribe {
        /// Channel URL.
        channel_url: String,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!(?cfg, "loaded config");
        let store = Store::open_default().await?;

        match cli.command {
            CliCommand::Run => run_worker(store, cfg).await?,
            CliCommand::Add { url } => run_add(&store, &url).await?,
            CliCommand::List => run_list(&store).await?,
            CliCommand::Status { id } => run_status(&store, id).await?,
            CliCommand::Subscribe { channel_url } => run_subscribe(&store, &channel_url).await?,
        }

        Ok(())
    }
}

async fn run_worker(store: Store, cfg: config::VodqConfig) -> Result<()> {
    let cfg = std::sync::Arc::new(cfg);
    let caps = build_capabilities(&cfg);
    let worker = Worker::spawn(store, cfg, caps);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, stopping worker loops");
    worker.shutdown();
    worker.join().await;
    Ok(())
}

async fn run_add(store: &Store, url: &str) -> Result<()> {
    let id = store.create_item(LOCAL_USER_ID, url, None).await?;
    println!("created item {id}");
    Ok(())
}

async fn run_list(store: &Store) -> Result<()> {
    let items = store.list_by_stage(&ALL_STAGES, 10_000, ListOrder::NewestCreated).await?;
    if items.is_empty() {
        println!("no items");
        return Ok(());
    }
    for item in items {
        let title = item.title.as_deref().unwrap_or("(untitled)");
        println!("{:>6}  {:<12}  {:>3}%  {}", item.id, item.stage.as_str(), item.progress, title);
    }
    Ok(())
}

async fn run_status(store: &Store, id: i64) -> Result<()> {
    let Some(item) = store.fetch_by_id(id).await? else {
        println!("no item with id {id}");
        return Ok(());
    };
    println!("id:               {}", item.id);
    println!("url:              {}", item.url);
    println!("stage:            {}", item.stage.as_str());
    println!("progress:         {}%", item.progress);
    println!("title:            {}", item.title.as_deref().unwrap_or("-"));
    println!("channel:          {}", item.channel_title.as_deref().unwrap_or("-"));
    println!(
        "duration_seconds: {}",
        item.duration_seconds.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("language:         {}", item.language.as_deref().unwrap_or("-"));
    println!("media_file_path:  {}", item.media_file_path.as_deref().unwrap_or("-"));
    println!("audio_file_path:  {}", item.audio_file_path.as_deref().unwrap_or("-"));
    println!("summary:          {}", item.summary.as_deref().unwrap_or("-"));
    println!("keywords:         {}", item.keywords.as_deref().unwrap_or("-"));
    println!("error_message:    {}", item.error_message.as_deref().unwrap_or("-"));
    println!("created_at:       {}", item.created_at);
    println!("updated_at:       {}", item.updated_at);
    Ok(())
}

async fn run_subscribe(store: &Store, channel_url: &str) -> Result<()> {
    let id = store.create_subscription(LOCAL_USER_ID, channel_url).await?;
    println!("created subscription {id} (pending resolution)");
    Ok(())
}
