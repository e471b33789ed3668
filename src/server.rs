//! rmcp server exposing the shortcut and repository verbs as MCP tools.

use crate::{
    config::Config,
    repo::{self, RepoClient, RepoConfig},
    service::ShortcutService,
};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RecordArgs {
    /// The shortcut name/alias
    pub shortcut: String,
    /// The context or instruction to store
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ShortcutArgs {
    /// The shortcut name/alias
    pub shortcut: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConfirmArgs {
    /// Confirmation to proceed with the destructive operation
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryArgs {
    /// Case-insensitive text to look for
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RepoArgs {
    /// Repository base URL. Defaults to the configured repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RepoQueryArgs {
    /// Case-insensitive text matched against shortcut, name, description and context
    pub query: String,
    /// Repository base URL. Defaults to the configured repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RepoInstallArgs {
    /// Exact shortcut of the recipe to install
    pub shortcut: String,
    /// Repository base URL. Defaults to the configured repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

fn text(msg: impl Display) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(msg.to_string())]))
}

fn failure(msg: impl Display) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(format!("✗ Error: {msg}"))]))
}

fn internal(e: anyhow::Error) -> McpError {
    tracing::error!(error = %format!("{e:#}"), "tool failed");
    McpError::internal_error(format!("{e:#}"), None)
}

#[derive(Clone)]
pub struct RecCallServer {
    cfg: Arc<Config>,
    tool_router: ToolRouter<RecCallServer>,
}

impl RecCallServer {
    pub fn new(cfg: Config) -> Self {
        Self { cfg: Arc::new(cfg), tool_router: Self::tool_router() }
    }

    pub fn config(&self) -> &Config { &self.cfg }

    fn service(&self) -> ShortcutService {
        ShortcutService::from_config(&self.cfg)
    }

    fn repo(&self, repo: Option<&str>) -> Result<(RepoClient, String), String> {
        let repo_cfg = RepoConfig::load(&self.cfg).map_err(|e| format!("{e:#}"))?;
        let client = RepoClient::from_config(&self.cfg, &repo_cfg).map_err(|e| e.to_string())?;
        let url = repo_cfg.resolve_repo(repo).to_string();
        Ok((client, url))
    }
}

#[tool_router]
impl RecCallServer {
    #[tool(description = "Record a new context shortcut with instructions. Never overwrites an existing shortcut")]
    pub async fn rec(&self, Parameters(args): Parameters<RecordArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(shortcut = %args.shortcut, "rec invoked");
        text(self.service().record(&args.shortcut, &args.context).map_err(internal)?)
    }

    #[tool(description = "List all stored context shortcuts with a short preview of each")]
    pub async fn rec_list(&self) -> Result<CallToolResult, McpError> {
        let previews: Vec<_> = self.service().list().map_err(internal)?.collect();
        if previews.is_empty() {
            return text("No shortcuts stored yet. Use 'rec <shortcut> <context>' to create your first shortcut.");
        }
        let lines: Vec<String> = previews.iter().map(ToString::to_string).collect();
        text(format!("📋 Stored shortcuts ({}):\n\n{}", previews.len(), lines.join("\n")))
    }

    #[tool(description = "Update/replace an existing context shortcut")]
    pub async fn rec_update(&self, Parameters(args): Parameters<RecordArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(shortcut = %args.shortcut, "rec_update invoked");
        text(self.service().update(&args.shortcut, &args.context).map_err(internal)?)
    }

    #[tool(description = "Delete a context shortcut if it exists (idempotent operation)")]
    pub async fn rec_delete(&self, Parameters(args): Parameters<ShortcutArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(shortcut = %args.shortcut, "rec_delete invoked");
        text(self.service().delete(&args.shortcut).map_err(internal)?)
    }

    #[tool(description = "Purge all stored shortcuts (requires confirm: true)")]
    pub async fn rec_purge(&self, Parameters(args): Parameters<ConfirmArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(confirm = args.confirm, "rec_purge invoked");
        text(self.service().purge(args.confirm).map_err(internal)?)
    }

    #[tool(description = "Call a stored context shortcut and return its full context")]
    pub async fn call(&self, Parameters(args): Parameters<ShortcutArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(shortcut = %args.shortcut, "call invoked");
        text(self.service().call(&args.shortcut).map_err(internal)?)
    }

    #[tool(description = "Search stored shortcuts by name or content (case-insensitive)")]
    pub async fn rec_search(&self, Parameters(args): Parameters<QueryArgs>) -> Result<CallToolResult, McpError> {
        let hits: Vec<String> = self
            .service()
            .search(&args.query)
            .map_err(internal)?
            .map(|p| p.to_string())
            .collect();
        if hits.is_empty() {
            return text(format!("No shortcuts found matching \"{}\".", args.query));
        }
        text(format!("🔍 Found {} shortcut(s) matching \"{}\":\n\n{}", hits.len(), args.query, hits.join("\n")))
    }

    #[tool(description = "Replace all shortcuts with the bundled starter pack (requires confirm: true when shortcuts exist)")]
    pub async fn rec_reload_starter_pack(&self, Parameters(args): Parameters<ConfirmArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(confirm = args.confirm, "rec_reload_starter_pack invoked");
        text(self.service().reload_starter_pack(args.confirm).map_err(internal)?)
    }

    #[tool(description = "List recipes published by a shortcut repository")]
    pub async fn repo_list(&self, Parameters(args): Parameters<RepoArgs>) -> Result<CallToolResult, McpError> {
        let (client, url) = match self.repo(args.repo.as_deref()) { Ok(v) => v, Err(e) => return failure(e) };
        match client.list_recipes_cached(&url).await {
            Ok(recipes) if recipes.is_empty() => text(format!("No recipes available in {url}.")),
            Ok(recipes) => text(format!("📦 Recipes in {url} ({}):\n\n{}", recipes.len(), repo::format_recipes(&recipes))),
            Err(e) => failure(e),
        }
    }

    #[tool(description = "Search recipes in a shortcut repository")]
    pub async fn repo_search(&self, Parameters(args): Parameters<RepoQueryArgs>) -> Result<CallToolResult, McpError> {
        let (client, url) = match self.repo(args.repo.as_deref()) { Ok(v) => v, Err(e) => return failure(e) };
        match client.search_recipes(&url, &args.query).await {
            Ok(recipes) if recipes.is_empty() => text(format!("No recipes found matching \"{}\".", args.query)),
            Ok(recipes) => text(format!("🔍 Found {} recipe(s) matching \"{}\":\n\n{}", recipes.len(), args.query, repo::format_recipes(&recipes))),
            Err(e) => failure(e),
        }
    }

    #[tool(description = "Install a recipe from a shortcut repository into the local store (overwrites a shortcut with the same name)")]
    pub async fn repo_install(&self, Parameters(args): Parameters<RepoInstallArgs>) -> Result<CallToolResult, McpError> {
        tracing::info!(shortcut = %args.shortcut, "repo_install invoked");
        let (client, url) = match self.repo(args.repo.as_deref()) { Ok(v) => v, Err(e) => return failure(e) };
        match client.install_recipe(&args.shortcut, &url, &self.service()).await {
            Ok(outcome) => text(outcome),
            Err(e) => failure(e),
        }
    }

    #[tool(description = "Clear the local repository cache")]
    pub async fn repo_cache_clear(&self) -> Result<CallToolResult, McpError> {
        let repo_cfg = RepoConfig::load(&self.cfg).map_err(internal)?;
        let client = match RepoClient::new(repo_cfg.cache_dir, self.cfg.http_timeout()) { Ok(c) => c, Err(e) => return failure(e) };
        match client.clear_cache() {
            Ok(n) => text(format!("✓ Cleared {n} cached repository listing(s).")),
            Err(e) => failure(e),
        }
    }
}

#[tool_handler]
impl ServerHandler for RecCallServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("reccall: rec(shortcut, context) to record, call(shortcut) to recall".to_string()),
        }
    }
}
