use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::{ensure_index, FsCorpus, IndexFormat, IndexPaths, IndexerConfig, ScorerConfig};
use http_body_util::BodyExt;
use serde_json::Value;
use server::ServerSettings;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

fn write_corpus(root: &Path, docs: &[(&str, &str)]) {
    let mut bookkeeping = serde_json::Map::new();
    for (doc_id, html) in docs {
        let path = root.join(doc_id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, html).unwrap();
        bookkeeping.insert(doc_id.to_string(), Value::String(format!("www.example.com/{doc_id}")));
    }
    fs::write(root.join("bookkeeping.json"), serde_json::to_string(&bookkeeping).unwrap()).unwrap();
}

fn build_index(corpus: &Path, index: &Path) {
    let source = FsCorpus::new(corpus, 10);
    let metadata = source.metadata().unwrap();
    ensure_index(&IndexPaths::new(index), &source, &metadata, &IndexerConfig::default()).unwrap();
}

fn settings(corpus: &Path, index: &Path) -> ServerSettings {
    ServerSettings {
        index_dir: index.to_path_buf(),
        corpus_dir: corpus.to_path_buf(),
        format: IndexFormat::Json,
        scorer: ScorerConfig::default(),
        admin_token: Some(TOKEN.to_string()),
    }
}

fn tiny_corpus(root: &Path) {
    write_corpus(
        root,
        &[
            (
                "0/0",
                r#"<html><head><title>Rust Systems</title><meta name="description" content="Systems programming in Rust"></head>
                   <body><p>Rust systems programming with ownership.</p></body></html>"#,
            ),
            ("0/1", "<html><body><p>Learning rust and other systems languages takes time.</p></body></html>"),
            ("0/2", "<html><body><p>Gardening in spring.</p></body></html>"),
        ],
    );
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    tiny_corpus(corpus.path());
    build_index(corpus.path(), index.path());
    let app = server::build_app(settings(corpus.path(), index.path())).unwrap();

    let (status, json) = call(app, get("/search?q=rust%20systems&k=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], "0/0");
    assert_eq!(arr[0]["url"], "www.example.com/0/0");
    assert_eq!(arr[1]["doc_id"], "0/1");
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_searches_see_the_same_ranking() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    tiny_corpus(corpus.path());
    build_index(corpus.path(), index.path());
    let app = server::build_app(settings(corpus.path(), index.path())).unwrap();

    let searches: Vec<_> = (0..8)
        .map(|_| tokio::spawn(call(app.clone(), get("/search?q=rust%20systems%20programming"))))
        .collect();
    let mut rankings = Vec::new();
    for search in searches {
        let (status, json) = search.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["query"], "rust systems programming");
        rankings.push(json["results"].clone());
    }
    assert_eq!(rankings[0][0]["doc_id"], "0/0");
    assert!(rankings.iter().all(|r| r == &rankings[0]));
}

#[tokio::test]
async fn search_truncates_to_k() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    tiny_corpus(corpus.path());
    build_index(corpus.path(), index.path());
    let app = server::build_app(settings(corpus.path(), index.path())).unwrap();

    let (_, json) = call(app, get("/search?q=rust&k=1")).await;
    assert_eq!(json["total_hits"], 2);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn doc_preview_prefers_description() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    tiny_corpus(corpus.path());
    build_index(corpus.path(), index.path());
    let app = server::build_app(settings(corpus.path(), index.path())).unwrap();

    let (status, json) = call(app.clone(), get("/doc?id=0/0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Rust Systems");
    assert_eq!(json["summary"], "Systems programming in Rust");

    let (_, json) = call(app.clone(), get("/doc?id=0/2")).await;
    assert_eq!(json["summary"], "Gardening in spring....");

    let (status, _) = call(app, get("/doc?id=9/9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_swaps_in_a_rebuilt_index() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    tiny_corpus(corpus.path());
    build_index(corpus.path(), index.path());
    let app = server::build_app(settings(corpus.path(), index.path())).unwrap();

    let (_, json) = call(app.clone(), get("/search?q=gardening")).await;
    assert_eq!(json["results"][0]["doc_id"], "0/2");

    // rebuild from a different corpus by deleting the artifact
    write_corpus(
        corpus.path(),
        &[
            ("1/0", "<html><body><p>Orchids need careful gardening.</p></body></html>"),
            ("1/1", "<html><body><p>Compilers and interpreters.</p></body></html>"),
        ],
    );
    fs::remove_file(IndexPaths::new(index.path()).artifact(IndexFormat::Json)).unwrap();
    build_index(corpus.path(), index.path());

    let unauthorized = Request::post("/index/reload").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reload = Request::post("/index/reload").header("X-ADMIN-TOKEN", TOKEN).body(Body::empty()).unwrap();
    let (status, json) = call(app.clone(), reload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 2);

    let (_, json) = call(app, get("/search?q=gardening")).await;
    assert_eq!(json["results"][0]["doc_id"], "1/0");
}

#[tokio::test]
async fn missing_index_fails_startup() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    tiny_corpus(corpus.path());
    assert!(server::build_app(settings(corpus.path(), index.path())).is_err());
}
