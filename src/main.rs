//! PersonaLens backend.
//!
//! Usage:
//!   personalens init                          Write default config and create storage
//!   personalens serve                         Start the HTTP API
//!   personalens chat --account 1 "hi"         Run one chat turn from the terminal
//!   personalens status --account 1            Show library totals for an account
//!   personalens account create --email a@b.c  Register an account

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use personalens::chat::ChatService;
use personalens::config::{self, PersonaLensConfig};
use personalens::groq::GroqClient;
use personalens::messaging::RelayClient;
use personalens::server::{self, AppState};
use personalens::state::Database;
use personalens::tools::ToolContext;
use personalens::types::*;

const CONFIG_FILE: &str = "personalens.toml";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "personalens")]
#[command(version = "0.1.0")]
#[command(about = "Conversational assistant for your photo library")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to personalens home directory [default: ~/.personalens].
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config and create the database and uploads directory.
    Init,

    /// Start the HTTP API.
    Serve,

    /// Run a single chat turn.
    Chat {
        /// Account the turn runs as.
        #[arg(long)]
        account: i64,

        /// Message to send.
        message: String,
    },

    /// Show library totals for an account.
    Status {
        #[arg(long)]
        account: i64,
    },

    /// Manage accounts.
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommands {
    /// Register a new account.
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = match &cli.home {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let config_path = home_dir.join(CONFIG_FILE);
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => cmd_init(&home_dir, cfg),
        Commands::Serve => cmd_serve(cfg).await,
        Commands::Chat { account, message } => cmd_chat(cfg, account, &message).await,
        Commands::Status { account } => cmd_status(cfg, account).await,
        Commands::Account {
            command: AccountCommands::Create { email, name },
        } => cmd_account_create(cfg, &email, name.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(home_dir: &Path, cfg: PersonaLensConfig) -> Result<()> {
    let config_path = home_dir.join(CONFIG_FILE);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        // Env-provided secrets stay out of the file.
        config::save_config(&PersonaLensConfig::default(), &config_path)?;
        println!("{} Wrote {}", ">>>".green().bold(), config_path.display());
    }

    let db = open_database(&cfg)?;
    let uploads = PathBuf::from(cfg.resolved_uploads_dir());
    std::fs::create_dir_all(&uploads)
        .with_context(|| format!("Failed to create uploads directory: {}", uploads.display()))?;

    println!(
        "{} Database ready (schema v{}) at {}",
        ">>>".green().bold(),
        db.schema_version(),
        cfg.resolved_db_path()
    );
    if cfg.groq_api_key.is_empty() {
        println!(
            "{} No Groq API key set. Add groq_api_key to the config or export GROQ_API_KEY.",
            "Note:".yellow().bold()
        );
    }
    Ok(())
}

async fn cmd_serve(cfg: PersonaLensConfig) -> Result<()> {
    let addr: SocketAddr = cfg
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind_addr: {}", cfg.bind_addr))?;
    let db = Arc::new(Mutex::new(open_database(&cfg)?));
    let chat = build_chat_service(&cfg, db.clone());

    if cfg.groq_api_key.is_empty() {
        warn!("No Groq API key configured; /chat will answer 503");
    }

    println!(
        "{} Starting '{}' on {} (model: {})",
        ">>>".green().bold(),
        cfg.name,
        addr,
        cfg.chat_model,
    );

    let uploads_dir = PathBuf::from(cfg.resolved_uploads_dir());
    let router = server::build_router(AppState::new(db, chat, uploads_dir), &cfg.allowed_origins);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{} Shutting down gracefully...", "<<<".red().bold());
        }
        signal_cancel.cancel();
    });

    server::serve(router, addr, cancel).await?;
    info!("Server shutdown complete");
    Ok(())
}

async fn cmd_chat(cfg: PersonaLensConfig, account_id: i64, message: &str) -> Result<()> {
    let db = Arc::new(Mutex::new(open_database(&cfg)?));
    require_account(&db, account_id).await?;
    let chat = build_chat_service(&cfg, db);

    let reply = chat.run_turn(account_id, message, &[]).await?;
    println!("{}", reply.response);
    if let Some(result) = reply.tool_result {
        let label = if result.is_success() {
            "tool_result".green().bold()
        } else {
            "tool_result".red().bold()
        };
        println!("{}: {}", label, serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

async fn cmd_status(cfg: PersonaLensConfig, account_id: i64) -> Result<()> {
    let db = Arc::new(Mutex::new(open_database(&cfg)?));
    let account = require_account(&db, account_id).await?;

    let db_lock = db.lock().await;
    let stats = db_lock.dashboard_stats(account_id)?;
    let smtp = if db_lock.smtp_credentials(account_id)?.is_some() {
        "configured".green().to_string()
    } else if cfg.default_sender().is_some() {
        "default sender".yellow().to_string()
    } else {
        "not configured".red().to_string()
    };

    println!();
    println!("{}", "=== PersonaLens Status ===".bold());
    println!();
    println!("  {}:  {} (#{})", "Account".bold(), account.email, account.id);
    if let Some(name) = &account.full_name {
        println!("    Name:     {}", name);
    }
    println!("    Since:    {}", account.created_at.format("%Y-%m-%d"));
    println!();
    println!("  {}:", "Library".bold());
    println!("    Photos:   {}", stats.total_photos);
    println!("    People:   {}", stats.total_people);
    println!("    Receipts: {}", stats.total_receipts);
    println!("    Vault:    {}", stats.total_vault);
    println!(
        "    Storage:  {} GB / {} GB",
        colorize_usage(stats.storage_used_gb, stats.storage_limit_gb),
        stats.storage_limit_gb
    );
    println!();
    println!("  {}:", "Assistant".bold());
    println!("    Model:    {}", cfg.chat_model);
    println!("    Email:    {}", smtp);
    println!();

    Ok(())
}

fn cmd_account_create(cfg: PersonaLensConfig, email: &str, name: Option<&str>) -> Result<()> {
    let db = open_database(&cfg)?;
    let id = db
        .create_account(email, name)
        .with_context(|| format!("Failed to create account for {email}"))?;
    println!("{} Created account #{} ({})", ">>>".green().bold(), id, email);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open (and migrate) the configured database.
fn open_database(cfg: &PersonaLensConfig) -> Result<Database> {
    let db_path = cfg.resolved_db_path();
    let db_path = Path::new(&db_path);
    Database::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

/// Wire the completion client, relay and tools into a chat service.
fn build_chat_service(cfg: &PersonaLensConfig, db: Arc<Mutex<Database>>) -> ChatService {
    let tools = ToolContext {
        db: db.clone(),
        messenger: Arc::new(RelayClient::new(&cfg.relay_url)),
        uploads_dir: PathBuf::from(cfg.resolved_uploads_dir()),
        default_sender: cfg.default_sender(),
    };
    ChatService::new(db, Arc::new(GroqClient::from_config(cfg)), tools, cfg.name.clone())
}

async fn require_account(db: &Arc<Mutex<Database>>, account_id: i64) -> Result<Account> {
    db.lock()
        .await
        .get_account(account_id)?
        .with_context(|| format!("Account #{account_id} does not exist. Create it with `personalens account create`."))
}

fn colorize_usage(used_gb: f64, limit_gb: u32) -> String {
    let used = format!("{used_gb:.2}");
    let ratio = used_gb / f64::from(limit_gb.max(1));
    if ratio >= 0.9 {
        used.red().bold().to_string()
    } else if ratio >= 0.7 {
        used.yellow().to_string()
    } else {
        used.green().to_string()
    }
}
