use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use reccall::{
    Store,
    config::Config,
    error::RepoError,
    recipe::{Recipe, validate_recipe},
    repo::{CacheEntry, RepoClient, RepoConfig, now_millis},
    service::ShortcutService,
};
use serde_json::json;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Stub {
    hits: Arc<AtomicUsize>,
}

async fn manifest(State(stub): State<Stub>) -> Json<serde_json::Value> {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "recipes": [
            { "file": "greet.json", "name": "Greeting", "description": "Say hello" },
            { "file": "bad name.json" },
            { "file": "broken.json" },
            { "file": "missing.json" }
        ]
    }))
}

async fn recipe_file(State(stub): State<Stub>, Path(file): Path<String>) -> Response {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    match file.as_str() {
        "greet.json" => Json(json!({ "shortcut": "greet", "context": "Hello from the repo!" })).into_response(),
        "bad name.json" => Json(json!({ "shortcut": "bad name", "context": "" })).into_response(),
        "broken.json" => "{ not json".into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_stub_repo() -> (String, Stub, tokio::task::JoinHandle<()>) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/repo/manifest.json", get(manifest))
        .route("/repo/{file}", get(recipe_file))
        .route("/down/manifest.json", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .with_state(stub.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}:{}", addr.ip(), addr.port()), stub, handle)
}

fn client(dir: &std::path::Path) -> RepoClient {
    RepoClient::new(dir.join("cache"), Duration::from_secs(5)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn listing_skips_broken_recipes_and_keeps_manifest_metadata() {
    let (base, _stub, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();
    let repo = format!("{base}/repo/");

    let recipes = client(td.path()).list_recipes(&repo).await.unwrap();
    let shortcuts: Vec<&str> = recipes.iter().map(|r| r.shortcut.as_str()).collect();
    assert_eq!(shortcuts, vec!["greet", "bad name"]);
    assert_eq!(recipes[0].name.as_deref(), Some("Greeting"));
    assert_eq!(recipes[0].description.as_deref(), Some("Say hello"));
}

#[tokio::test(flavor = "multi_thread")]
async fn manifest_failure_is_an_error() {
    let (base, _stub, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();

    let err = client(td.path())
        .list_recipes_cached(&format!("{base}/down"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Status { status: 503, .. }), "got {err:?}");
    assert!(!client(td.path()).cache_file(&format!("{base}/down")).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn cache_is_served_within_ttl_and_refetched_after() {
    let (base, stub, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();
    let repo = format!("{base}/repo");
    let c = client(td.path());

    let cached = vec![Recipe::new("from-cache", "cached context")];
    let minute = 60 * 1000;

    // T+59min: served from cache, no request
    let entry = CacheEntry { timestamp: now_millis() - 59 * minute, recipes: cached.clone() };
    c.write_cache(&repo, &entry).unwrap();
    let got = c.list_recipes_cached(&repo).await.unwrap();
    assert_eq!(got, cached);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);

    // T+61min: stale, refetched and rewritten
    let entry = CacheEntry { timestamp: now_millis() - 61 * minute, recipes: cached };
    c.write_cache(&repo, &entry).unwrap();
    let got = c.list_recipes_cached(&repo).await.unwrap();
    assert_eq!(got[0].shortcut, "greet");
    assert!(stub.hits.load(Ordering::SeqCst) > 0);

    let text = std::fs::read_to_string(c.cache_file(&repo)).unwrap();
    let rewritten: CacheEntry = serde_json::from_str(&text).unwrap();
    assert!(rewritten.is_fresh(now_millis(), reccall::repo::CACHE_TTL));
    assert_eq!(rewritten.recipes.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn future_stamped_cache_entry_is_refetched() {
    let (base, stub, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();
    let repo = format!("{base}/repo");
    let c = client(td.path());

    let now = now_millis();
    let ahead = CacheEntry { timestamp: now + 5 * 60 * 1000, recipes: vec![Recipe::new("skewed", "x")] };
    assert!(!ahead.is_fresh(now, reccall::repo::CACHE_TTL));
    c.write_cache(&repo, &ahead).unwrap();

    let got = c.list_recipes_cached(&repo).await.unwrap();
    assert_eq!(got[0].shortcut, "greet");
    assert!(stub.hits.load(Ordering::SeqCst) > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn install_validates_and_writes_through_the_service() {
    let (base, _stub, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();
    let repo = format!("{base}/repo");
    let c = client(td.path());
    let svc = ShortcutService::new(Store::new(td.path().join("store.json")));
    svc.record("greet", "old").unwrap();

    let outcome = c.install_recipe("greet", &repo, &svc).await.unwrap();
    assert!(outcome.replaced);
    assert_eq!(svc.store().load().get("greet"), Some("Hello from the repo!"));

    let err = c.install_recipe("bad name", &repo, &svc).await.unwrap_err();
    match err {
        RepoError::InvalidRecipe { errors, .. } => assert_eq!(errors.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!svc.store().load().contains("bad name"));

    let err = c.install_recipe("nope", &repo, &svc).await.unwrap_err();
    assert!(matches!(err, RepoError::RecipeNotFound { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_matches_metadata_case_insensitively() {
    let (base, _stub, _h) = start_stub_repo().await;
    let td = tempfile::tempdir().unwrap();
    let repo = format!("{base}/repo");

    let hits = client(td.path()).search_recipes(&repo, "SAY HELLO").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].shortcut, "greet");
}

#[test]
fn validation_reports_every_violation() {
    let report = validate_recipe(&Recipe::new("no spaces!", ""));
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 2);

    let report = validate_recipe(&Recipe::new("", ""));
    assert_eq!(report.errors.len(), 2);

    let report = validate_recipe(&Recipe::new("snake_case-ok9", "text"));
    assert!(report.valid);
    assert!(report.errors.is_empty());
}

#[test]
fn clear_cache_counts_files_and_tolerates_missing_dir() {
    let td = tempfile::tempdir().unwrap();
    let c = client(td.path());
    assert_eq!(c.clear_cache().unwrap(), 0);

    c.write_cache("https://a.example", &CacheEntry::new(vec![])).unwrap();
    c.write_cache("https://b.example", &CacheEntry::new(vec![])).unwrap();
    assert_ne!(c.cache_file("https://a.example"), c.cache_file("https://b.example"));
    assert_eq!(c.clear_cache().unwrap(), 2);
    assert_eq!(c.clear_cache().unwrap(), 0);
}

#[test]
fn repo_config_merges_partial_file_with_defaults() {
    let td = tempfile::tempdir().unwrap();
    let cfg = Config::rooted_at(td.path());

    let first = RepoConfig::load(&cfg).unwrap();
    assert!(first.enabled);
    assert!(cfg.repo_config_file().exists());

    std::fs::write(cfg.repo_config_file(), r#"{ "enabled": false }"#).unwrap();
    let merged = RepoConfig::load(&cfg).unwrap();
    assert!(!merged.enabled);
    assert_eq!(merged.default_repo, first.default_repo);
    assert_eq!(merged.cache_dir, first.cache_dir);

    assert!(matches!(RepoClient::from_config(&cfg, &merged), Err(RepoError::Disabled)));
    assert_eq!(merged.resolve_repo(Some("https://x.example")), "https://x.example");
    assert_eq!(merged.resolve_repo(None), merged.default_repo);
}
