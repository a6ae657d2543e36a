use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use quota_desk::chat::{normalize_prompt, ChatClient};
use quota_desk::config::Config;
use quota_desk::gate::QuotaGate;
use quota_desk::public_apis::PublicApis;
use quota_desk::store::FileStore;
use quota_desk::time::SystemClock;
use quota_desk::usage::UsageTracker;

#[derive(Parser)]
#[command(name = "quota-desk")]
#[command(about = "Chat completions under a daily usage quota, plus jokes and cats")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show today's chat usage against the daily limit
    Status,
    /// Ask the chat model (counts against the daily limit)
    Chat {
        /// The prompt (all arguments are joined)
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// Overwrite today's usage count
    Set { count: u64 },
    /// Print a random joke
    Joke,
    /// Print a random cat image URL
    Cat,
}

fn build_gate(cfg: &Config) -> Result<QuotaGate<FileStore, SystemClock>> {
    let clock = match cfg.tz.as_deref() {
        Some(tz) => SystemClock::with_tz(tz)?,
        None => SystemClock::local(),
    };
    let tracker = UsageTracker::with_key(FileStore::new(&cfg.usage_store_path), clock, cfg.usage_key.clone());
    Ok(QuotaGate::new(tracker, cfg.daily_limit))
}

fn print_status(gate: &QuotaGate<FileStore, SystemClock>, limit: u64) -> Result<()> {
    let status = gate.status()?;
    let left = gate.tracker().remaining(limit)?;
    println!("Chat uses today: {status} ({left} left)");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;
    quota_desk::monitoring::init_tracing(cfg.log_json);
    info!(?cfg, "boot");

    let gate = build_gate(&cfg)?;

    match cli.command {
        Command::Status => {
            print_status(&gate, cfg.daily_limit)?;
        }
        Command::Chat { prompt } => {
            let joined = prompt.join(" ");
            let prompt = normalize_prompt(&joined)?;
            let client = ChatClient::new(
                cfg.groq_base_url.clone(),
                cfg.require_api_key()?.to_string(),
                cfg.groq_model.clone(),
                cfg.groq_max_tokens,
            );
            let answer = client.ask(&gate, prompt).await;
            print_status(&gate, cfg.daily_limit)?;
            println!("{}", answer?);
        }
        Command::Set { count } => {
            gate.tracker()
                .set_usage(count)
                .with_context(|| format!("writing usage to {}", cfg.usage_store_path))?;
            print_status(&gate, cfg.daily_limit)?;
        }
        Command::Joke => {
            let apis = PublicApis::new(cfg.joke_url.clone(), cfg.cat_url.clone());
            println!("{}", apis.joke().await?);
        }
        Command::Cat => {
            let apis = PublicApis::new(cfg.joke_url.clone(), cfg.cat_url.clone());
            println!("{}", apis.cat_url().await?);
        }
    }

    Ok(())
}
