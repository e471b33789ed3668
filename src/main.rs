use clap::{Parser, Subcommand, ValueEnum};
use reccall::{
    RecCallServer,
    config::Config,
    http_router::{AppState, build_router},
    repo::{self, RepoClient, RepoConfig},
    service::{
        CallOutcome, PurgeOutcome, RecordOutcome, ReloadOutcome, ShortcutService, UpdateOutcome,
    },
};
use rmcp::serve_server;
use std::{path::PathBuf, process::ExitCode};
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, ValueEnum)]
enum TransportKind { Stdio, Http }

#[derive(Parser, Debug)]
#[command(name = "reccall", version, about = "RecCall: Record and call context shortcuts across AI IDEs and environments")]
struct Cli {
    /// Override the shortcut store file
    #[arg(long, global = true)]
    store_file: Option<String>,
    /// Persist overrides to settings file
    #[arg(long, global = true, default_value_t = false)]
    persist_config: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server
    Serve {
        /// Transport: stdio or http
        #[arg(long, value_enum, default_value = "stdio")]
        transport: TransportKind,
        /// HTTP bind address when transport=http
        #[arg(long, default_value = "127.0.0.1:8765")]
        bind: String,
    },
    /// Record a new context shortcut
    Rec {
        /// The shortcut name/alias
        shortcut: String,
        /// The context or instruction to store
        context: String,
    },
    /// List all stored shortcuts
    #[command(alias = "ls")]
    List,
    /// Call (retrieve) a stored shortcut
    Call { shortcut: String },
    /// Update an existing shortcut
    Update { shortcut: String, context: String },
    /// Delete a shortcut
    #[command(alias = "rm")]
    Delete { shortcut: String },
    /// Delete all shortcuts (requires confirmation)
    Purge {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Reload starter pack recipes (overwrites existing shortcuts)
    ReloadStarterPack {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search shortcuts by name or content
    Search { query: String },
    /// Export shortcuts to a file
    Export {
        #[arg(default_value = "reccall-shortcuts.json")]
        file: PathBuf,
    },
    /// Import shortcuts from a file
    Import {
        file: PathBuf,
        /// Merge with existing shortcuts (default: overwrite)
        #[arg(short, long)]
        merge: bool,
    },
    /// Show RecCall information and statistics
    Info,
    /// List recipes in a repository
    RepoList {
        #[arg(long)]
        repo: Option<String>,
    },
    /// Search recipes in a repository
    RepoSearch {
        query: String,
        #[arg(long)]
        repo: Option<String>,
    },
    /// Install a recipe from a repository
    RepoInstall {
        shortcut: String,
        #[arg(long)]
        repo: Option<String>,
    },
    /// Show or change repository settings
    RepoConfig {
        #[arg(long)]
        default_repo: Option<String>,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Clear the repository cache
    RepoCacheClear,
}

fn init_logging(cfg: &Config, default_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    // Console (stderr) + rolling file. stdout carries MCP frames and command output.
    let log_dir = cfg.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = rolling::daily(&log_dir, "reccall.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_ansi(true).with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}

/// Print a message and map refusals to exit status 1.
fn report(msg: impl std::fmt::Display, ok: bool) -> ExitCode {
    println!("{msg}");
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = Config::load_with_overrides(cli.store_file)?;
    let default_level = if matches!(cli.command, Command::Serve { .. }) { "info" } else { "warn" };
    let _guard = init_logging(&cfg, default_level);

    if cli.persist_config { cfg.save()?; }
    tracing::debug!(config_file = %cfg.settings_path.display(), store_file = %cfg.store_file().display(), log_dir = %cfg.log_dir().display(), "paths initialized");

    let svc = ShortcutService::from_config(&cfg);
    let code = match cli.command {
        Command::Serve { transport, bind } => {
            serve(cfg, transport, &bind).await?;
            ExitCode::SUCCESS
        }
        Command::Rec { shortcut, context } => {
            let outcome = svc.record(&shortcut, &context)?;
            let ok = matches!(outcome, RecordOutcome::Recorded { .. });
            report(outcome, ok)
        }
        Command::List => {
            let previews: Vec<_> = svc.list()?.collect();
            if previews.is_empty() {
                println!("No shortcuts stored yet. Use \"reccall rec <shortcut> <context>\" to create your first shortcut.");
            } else {
                println!("📋 Stored shortcuts ({}):\n", previews.len());
                for p in &previews { println!("{p}"); }
            }
            ExitCode::SUCCESS
        }
        Command::Call { shortcut } => match svc.call(&shortcut)? {
            CallOutcome::Found { name, context } => {
                println!("📋 Context for '{name}':\n\n{context}");
                ExitCode::SUCCESS
            }
            not_found => report(not_found, false),
        },
        Command::Update { shortcut, context } => {
            let outcome = svc.update(&shortcut, &context)?;
            let ok = matches!(outcome, UpdateOutcome::Updated { .. });
            report(outcome, ok)
        }
        Command::Delete { shortcut } => report(svc.delete(&shortcut)?, true),
        Command::Purge { yes } => {
            let outcome = svc.purge(yes)?;
            let ok = !matches!(outcome, PurgeOutcome::ConfirmationRequired { .. });
            let hint = if ok { "" } else { "\nUse --yes flag to confirm deletion." };
            report(format!("{outcome}{hint}"), ok)
        }
        Command::ReloadStarterPack { yes } => {
            let outcome = svc.reload_starter_pack(yes)?;
            let ok = matches!(outcome, ReloadOutcome::Reloaded { .. });
            let hint = if ok { "" } else { "\nUse --yes flag to confirm reload." };
            report(format!("{outcome}{hint}"), ok)
        }
        Command::Search { query } => {
            let hits: Vec<_> = svc.search(&query)?.collect();
            if hits.is_empty() {
                println!("No shortcuts found matching \"{query}\".");
            } else {
                println!("🔍 Found {} shortcut(s) matching \"{query}\":\n", hits.len());
                for p in &hits { println!("{p}"); }
            }
            ExitCode::SUCCESS
        }
        Command::Export { file } => {
            let n = svc.export(&file)?;
            report(format!("✓ {n} shortcuts exported to {}", file.display()), true)
        }
        Command::Import { file, merge } => match svc.import(&file, merge) {
            Ok(outcome) => report(outcome, true),
            Err(e) => report(format!("✗ Failed to import shortcuts: {e:#}"), false),
        },
        Command::Info => report(svc.info()?, true),
        Command::RepoList { repo } => {
            let repo_cfg = RepoConfig::load(&cfg)?;
            let url = repo_cfg.resolve_repo(repo.as_deref()).to_string();
            let client = RepoClient::from_config(&cfg, &repo_cfg)?;
            let recipes = client.list_recipes_cached(&url).await?;
            if recipes.is_empty() {
                println!("No recipes available in {url}.");
            } else {
                println!("📦 Recipes in {url} ({}):\n\n{}", recipes.len(), repo::format_recipes(&recipes));
            }
            ExitCode::SUCCESS
        }
        Command::RepoSearch { query, repo } => {
            let repo_cfg = RepoConfig::load(&cfg)?;
            let url = repo_cfg.resolve_repo(repo.as_deref()).to_string();
            let client = RepoClient::from_config(&cfg, &repo_cfg)?;
            let recipes = client.search_recipes(&url, &query).await?;
            if recipes.is_empty() {
                println!("No recipes found matching \"{query}\".");
            } else {
                println!("🔍 Found {} recipe(s) matching \"{query}\":\n\n{}", recipes.len(), repo::format_recipes(&recipes));
            }
            ExitCode::SUCCESS
        }
        Command::RepoInstall { shortcut, repo } => {
            let repo_cfg = RepoConfig::load(&cfg)?;
            let url = repo_cfg.resolve_repo(repo.as_deref()).to_string();
            let client = RepoClient::from_config(&cfg, &repo_cfg)?;
            match client.install_recipe(&shortcut, &url, &svc).await {
                Ok(outcome) => report(outcome, true),
                Err(e) => report(format!("✗ {e}"), false),
            }
        }
        Command::RepoConfig { default_repo, cache_dir, enabled } => {
            let mut repo_cfg = RepoConfig::load(&cfg)?;
            let changed = default_repo.is_some() || cache_dir.is_some() || enabled.is_some();
            if let Some(url) = default_repo { repo_cfg.default_repo = url; }
            if let Some(dir) = cache_dir { repo_cfg.cache_dir = dir; }
            if let Some(on) = enabled { repo_cfg.enabled = on; }
            if changed {
                repo_cfg.save(&cfg.repo_config_file())?;
                println!("✓ Repository configuration updated.");
            }
            println!("{}", serde_json::to_string_pretty(&repo_cfg)?);
            ExitCode::SUCCESS
        }
        Command::RepoCacheClear => {
            let repo_cfg = RepoConfig::load(&cfg)?;
            let client = RepoClient::new(repo_cfg.cache_dir, cfg.http_timeout())?;
            let n = client.clear_cache()?;
            report(format!("✓ Cleared {n} cached repository listing(s)."), true)
        }
    };
    Ok(code)
}

async fn serve(cfg: Config, transport: TransportKind, bind: &str) -> anyhow::Result<()> {
    let server = RecCallServer::new(cfg);
    match transport {
        TransportKind::Stdio => {
            tracing::info!("RecCall MCP server running on stdio");
            let io = (tokio::io::stdin(), tokio::io::stdout());
            serve_server(server, io).await?.waiting().await?;
        }
        TransportKind::Http => {
            let router = build_router(AppState { server });
            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!("reccall http server listening on {}", bind);
            axum::serve(listener, router)
                .with_graceful_shutdown(async { let _ = tokio::signal::ctrl_c().await; })
                .await?;
        }
    }
    Ok(())
}
