use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn dh_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("dh");
    path
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Routed docs: one page per folder
    write(
        &root,
        "app/page.mdx",
        "---\ntitle: Welcome\n---\n\n# Welcome\n\nStart here.\n",
    );
    write(
        &root,
        "app/guides/webhooks/page.mdx",
        "import { Callout } from '@/components'\n\n# Webhooks\n\nWebhooks deliver events to your callback URL.\n\n## Retries\n\nFailed deliveries are retried with exponential backoff for up to 24 hours.\n\n<Callout type=\"info\">\nRetries stop after 24 hours.\n</Callout>\n\n## Signing\n\nEvery webhook is signed.\n",
    );
    write(&root, "app/guides/webhooks/layout.tsx", "export default function Layout() {}\n");
    write(&root, "app/broken/page.mdx", "# Broken\n\n<Callout>\n\nnever closed\n");

    // Knowledge base: any .md file
    write(
        &root,
        "kb/billing/refund_policy.md",
        "# Refunds\n\nRefunds are issued within 30 days.\n\n## Rate limit errors\n\nWhen the rate limit is exceeded the API returns errors.\n",
    );
    write(&root, "kb/notes.txt", "plain notes\n");

    // Roots are relative to the config file's directory
    let config_content = r#"workspace = "test"

[corpora.docs]
root = "../app"

[corpora.kb]
root = "../kb"
extensions = ["md"]

[chunking]
max_chars = 4000
overlap_chars = 400

[retrieval]
top_k = 5
"#;
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("dh.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dh(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dh_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dh binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Lines of the `sync <corpus>` block in the sync output.
fn block<'a>(stdout: &'a str, header: &str) -> Vec<&'a str> {
    stdout
        .lines()
        .skip_while(|l| *l != header)
        .skip(1)
        .take_while(|l| l.starts_with("  "))
        .collect()
}

#[test]
fn test_sync_counts_per_corpus() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dh(&config_path, &["sync"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);

    let docs = block(&stdout, "sync docs");
    assert!(docs.contains(&"  files scanned: 4"), "{:?}", docs);
    assert!(docs.contains(&"  created: 2"), "{:?}", docs);
    assert!(docs.contains(&"  skipped: 1"), "{:?}", docs);
    assert!(docs.contains(&"  failed: 1"), "{:?}", docs);

    let kb = block(&stdout, "sync kb");
    assert!(kb.contains(&"  created: 1"), "{:?}", kb);
    assert!(kb.contains(&"  skipped: 1"), "{:?}", kb);
    assert!(kb.contains(&"  failed: 0"), "{:?}", kb);

    assert!(stdout.contains("index: 3 documents (2 docs, 1 kb)"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_sync_failure_is_logged_not_fatal() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_dh(&config_path, &["sync", "--corpus", "docs"]);
    assert!(success);
    assert!(stderr.contains("broken/page.mdx"), "stderr={}", stderr);
    assert!(stderr.contains("unclosed component"), "stderr={}", stderr);
}

#[test]
fn test_sync_verify_reports_unchanged() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dh(&config_path, &["sync", "--verify"]);
    assert!(success, "verify failed: stdout={}, stderr={}", stdout, stderr);

    let docs = block(&stdout, "sync docs (verify)");
    assert!(docs.contains(&"  unchanged: 2"), "{:?}", docs);
    assert!(docs.contains(&"  created: 0"), "{:?}", docs);
    let kb = block(&stdout, "sync kb (verify)");
    assert!(kb.contains(&"  unchanged: 1"), "{:?}", kb);
}

#[test]
fn test_sync_dry_run() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_dh(&config_path, &["sync", "--dry-run", "--corpus", "docs"]);
    assert!(success);
    assert!(stdout.contains("sync docs (dry-run)"));
    assert!(stdout.contains("documents found: 2"));
    assert!(stdout.contains("estimated chunks: 4"));
    assert!(!stdout.contains("sync kb"));
}

#[test]
fn test_search_ranks_section_with_anchor() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_dh(&config_path, &["search", "webhook retries"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let first = stdout.lines().next().unwrap();
    assert!(first.starts_with("1. ["), "{}", first);
    assert!(first.contains("Webhooks > Retries"), "{}", first);
    assert!(stdout.contains("link: /guides/webhooks#retries"));
    assert!(stdout.contains("confidence: high (answer mode: direct)"));
}

#[test]
fn test_search_json_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_dh(&config_path, &["search", "webhook retries", "--json", "--explain"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = json["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["link"], "/guides/webhooks#retries");
    assert_eq!(results[0]["corpus"], "docs");
    assert!(results[0]["explain"]["heading"].as_f64().unwrap() > 0.0);
    assert!(results.iter().all(|r| r["score"].as_f64().unwrap() > 0.0));
    assert_eq!(json["confidence"]["level"], "high");
    assert_eq!(json["confidence"]["answer_mode"], "direct");
    assert!(json["tokens"]["terms"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "backoff"));
}

#[test]
fn test_search_phrase_in_kb() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_dh(
        &config_path,
        &["search", "\"rate limit\" errors", "--corpus", "kb", "--json"],
    );
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["corpus"], "kb");
    assert_eq!(results[0]["link"], "billing/refund_policy.md");
    assert_eq!(results[0]["title"], "Refunds");
    assert_eq!(json["confidence"]["signals"]["docs_count"], 0);
}

#[test]
fn test_search_no_results_escalates() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_dh(&config_path, &["search", "completely unrelated xyz123"]);
    assert!(success);
    assert!(stdout.contains("No results."));
    assert!(stdout.contains("confidence: low (answer mode: escalate)"));
}

#[test]
fn test_search_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_dh(&config_path, &["search", "webhook", "--limit", "1", "--json"]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

#[test]
fn test_chunks_shows_identity_and_anchors() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("app/guides/webhooks/page.mdx");

    let (stdout, stderr, success) = run_dh(&config_path, &["chunks", file.to_str().unwrap()]);
    assert!(success, "chunks failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("canonical id: docs:/guides/webhooks"));
    assert!(stdout.contains("route: /guides/webhooks"));
    assert!(stdout.contains("title: Webhooks"));
    assert!(stdout.contains("chunks: 3"));
    assert!(stdout.contains("[1] Webhooks > Retries (anchor: retries"));
    assert!(stdout.contains("[2] Webhooks > Signing (anchor: signing"));
    assert!(!stdout.contains("Callout"));
    assert!(!stdout.contains("import"));
}

#[test]
fn test_chunks_kb_has_no_anchors() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("kb/billing/refund_policy.md");

    let (stdout, _, success) = run_dh(&config_path, &["chunks", file.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("canonical id: kb:billing/refund_policy.md"));
    assert!(!stdout.contains("route:"));
    assert!(stdout.contains("[1] Refunds > Rate limit errors (anchor: -"));
}

#[test]
fn test_chunks_malformed_file_fails() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("app/broken/page.mdx");

    let (_, stderr, success) = run_dh(&config_path, &["chunks", file.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("unclosed component <Callout>"), "stderr={}", stderr);
}

#[test]
fn test_tokenize_needs_no_config() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("absent.toml");

    let (stdout, _, success) = run_dh(&missing, &["tokenize", "How do webhooks retry?"]);
    assert!(success);
    assert!(stdout.contains("webhook"));
    assert!(stdout.contains("backoff"));
    assert!(!stdout.contains("how"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("absent.toml");

    let (_, stderr, success) = run_dh(&missing, &["sync"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_invalid_config_fails() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(
        &config_path,
        "[corpora.kb]\nroot = \"../kb\"\n[chunking]\nmax_chars = 100\noverlap_chars = 200\n",
    )
    .unwrap();

    let (_, stderr, success) = run_dh(&config_path, &["sync"]);
    assert!(!success);
    assert!(stderr.contains("overlap_chars"), "stderr={}", stderr);
}

#[test]
fn test_unknown_corpus_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_dh(&config_path, &["sync", "--corpus", "wiki"]);
    assert!(!success);
    assert!(stderr.contains("unknown corpus"));
}
