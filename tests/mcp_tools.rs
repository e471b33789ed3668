use axum::{Json, Router, routing::get};
use reccall::{
    RecCallServer, ShortcutService,
    config::Config,
    repo::RepoConfig,
    server::{ConfirmArgs, RecordArgs, RepoArgs, RepoInstallArgs, ShortcutArgs},
};
use rmcp::{handler::server::wrapper::Parameters, model::CallToolResult};
use serde_json::json;
use tokio::net::TcpListener;

fn test_cfg(root: &std::path::Path) -> Config {
    let mut cfg = Config::rooted_at(root);
    cfg.settings.store_file = Some(root.join("store.json").to_string_lossy().into_owned());
    cfg.settings.bootstrap_starter_pack = false;
    cfg
}

fn write_repo_cfg(cfg: &Config, enabled: bool) {
    let mut repo_cfg = RepoConfig::defaults(cfg);
    repo_cfg.cache_dir = cfg.root_dir.join("cache");
    repo_cfg.enabled = enabled;
    repo_cfg.save(&cfg.repo_config_file()).unwrap();
}

fn text_of(res: &CallToolResult) -> String {
    res.content
        .iter()
        .filter_map(|c| c.as_text())
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn shortcut(name: &str) -> Parameters<ShortcutArgs> {
    Parameters(ShortcutArgs { shortcut: name.into() })
}

async fn start_stub_repo() -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/manifest.json",
            get(|| async { Json(json!({ "recipes": [ { "file": "greet.json", "name": "Greeting" } ] })) }),
        )
        .route(
            "/greet.json",
            get(|| async { Json(json!({ "shortcut": "greet", "context": "Hello from the repo!" })) }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let h = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}:{}", addr.ip(), addr.port()), h)
}

#[test]
fn confirm_defaults_to_false() {
    let args: ConfirmArgs = serde_json::from_value(json!({})).unwrap();
    assert!(!args.confirm);
}

#[tokio::test(flavor = "multi_thread")]
async fn refusals_are_successful_tool_results() {
    let td = tempfile::tempdir().unwrap();
    let server = RecCallServer::new(test_cfg(td.path()));

    let rec = |ctx: &str| Parameters(RecordArgs { shortcut: "greet".into(), context: ctx.into() });
    let res = server.rec(rec("Hello!")).await.unwrap();
    assert_ne!(res.is_error, Some(true));
    let res = server.rec(rec("Other")).await.unwrap();
    assert_ne!(res.is_error, Some(true));
    assert!(text_of(&res).contains("already exists"));

    let res = server.call(shortcut("greet")).await.unwrap();
    assert_eq!(text_of(&res), "Hello!");

    let res = server.call(shortcut("missing")).await.unwrap();
    assert_ne!(res.is_error, Some(true));
    assert!(text_of(&res).contains("Available shortcuts: greet"));

    let res = server.rec_purge(Parameters(ConfirmArgs { confirm: false })).await.unwrap();
    assert_ne!(res.is_error, Some(true));
    assert!(text_of(&res).contains("Confirmation required"));
    assert!(ShortcutService::from_config(server.config()).store().load().contains("greet"));

    let res = server.rec_purge(Parameters(ConfirmArgs { confirm: true })).await.unwrap();
    assert!(text_of(&res).contains("purged"));
    assert!(ShortcutService::from_config(server.config()).store().load().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_repository_is_an_error_result() {
    let td = tempfile::tempdir().unwrap();
    let cfg = test_cfg(td.path());
    write_repo_cfg(&cfg, false);
    let server = RecCallServer::new(cfg);

    let res = server.repo_list(Parameters(RepoArgs { repo: None })).await.unwrap();
    assert_eq!(res.is_error, Some(true));

    let res = server.repo_cache_clear().await.unwrap();
    assert_ne!(res.is_error, Some(true));
}

#[tokio::test(flavor = "multi_thread")]
async fn repo_install_writes_the_recipe_into_the_store() {
    let (base, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();
    let cfg = test_cfg(td.path());
    write_repo_cfg(&cfg, true);
    let server = RecCallServer::new(cfg);

    let res = server
        .repo_list(Parameters(RepoArgs { repo: Some(base.clone()) }))
        .await
        .unwrap();
    assert_ne!(res.is_error, Some(true));
    assert!(text_of(&res).contains("greet"));

    let res = server
        .repo_install(Parameters(RepoInstallArgs { shortcut: "greet".into(), repo: Some(base.clone()) }))
        .await
        .unwrap();
    assert_ne!(res.is_error, Some(true));
    assert_eq!(text_of(&server.call(shortcut("greet")).await.unwrap()), "Hello from the repo!");

    let res = server
        .repo_install(Parameters(RepoInstallArgs { shortcut: "nope".into(), repo: Some(base) }))
        .await
        .unwrap();
    assert_eq!(res.is_error, Some(true));
}
