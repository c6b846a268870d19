use repo_indexer::cli::{run, Cli, Commands};
use repo_indexer::load_config::{ENV_HOSTING_PASSWORD, ENV_HOSTING_USERNAME, ENV_INDEX_API_KEY};
use serde_json::json;
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One full pass against mocked hosting and index services: two files listed, one excluded by
/// extension, one indexed, and one stale index entry deleted under its normalised URL.
#[tokio::test]
#[serial]
async fn sync_crawls_indexes_and_reconciles() {
    env::set_var(ENV_HOSTING_USERNAME, "crawler");
    env::set_var(ENV_HOSTING_PASSWORD, "hunter2");
    env::set_var(ENV_INDEX_API_KEY, "index-key");

    let hosting = MockServer::start().await;
    let index = MockServer::start().await;
    let api = hosting.uri();

    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "r1", "contents_url": format!("{api}/repos/alice/r1/contents/{{+path}}")},
            {"name": "legacy", "contents_url": format!("{api}/repos/alice/legacy/contents/{{+path}}")}
        ])))
        .expect(1)
        .mount(&hosting)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/r1/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "README.md", "path": "README.md", "type": "file", "download_url": format!("{api}/raw/README.md")},
            {"name": "src", "path": "src", "type": "dir", "download_url": null}
        ])))
        .expect(1)
        .mount(&hosting)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/r1/contents/src"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "main.rs", "path": "src/main.rs", "type": "file", "download_url": format!("{api}/raw/src/main.rs")}
        ])))
        .expect(1)
        .mount(&hosting)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/src/main.rs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fn main() {}\n"))
        .expect(1)
        .mount(&hosting)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/README.md"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&hosting)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/legacy/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&hosting)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&index)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/add"))
        .and(body_partial_json(json!({
            "apikey": "index-key",
            "document": {"colname": "code", "title": "main.rs", "meta": {"size": "13"}}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&index)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results":{"@hits":"1","result":{"uid":"u","url":"http://x/f&amp;oo.txt","title":"f&amp;oo.txt"}}}"#,
        ))
        .expect(1)
        .mount(&index)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/delete"))
        .and(body_partial_json(json!({
            "apikey": "index-key",
            "document": {"colname": "code", "url": "http://x/f&;oo.txt"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&index)
        .await;

    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    let config_path = config.path().join("indexer.yml");
    write(
        &config_path,
        format!(
            r#"
hosting:
  base_url: {api}
  include_users: [alice]
exclude:
  repos: [legacy]
  extensions: [".md"]
index:
  url: {index_uri}/rest/v1/api
  servlet_url: {index_uri}/search
  collection: code
staging:
  data_dir: {data_dir}
run:
  settle_delay_secs: 0
  probe_retries: 0
"#,
            index_uri = index.uri(),
            data_dir = data.path().display(),
        ),
    )
    .unwrap();

    run(Cli {
        command: Commands::Sync {
            config: config_path,
        },
    })
    .await
    .expect("sync should succeed");

    let staged: Vec<_> = std::fs::read_dir(data.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(staged.len(), 1, "exactly one staging directory per run");
    let run_dir = &staged[0];
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("static"));
    assert_eq!(
        std::fs::read_to_string(run_dir.join("main.rs")).unwrap(),
        "fn main() {}\n"
    );
    assert!(!run_dir.join("README.md").exists());
}

#[tokio::test]
#[serial]
async fn unauthorized_listing_fails_the_run() {
    env::set_var(ENV_HOSTING_USERNAME, "crawler");
    env::set_var(ENV_HOSTING_PASSWORD, "wrong");
    env::set_var(ENV_INDEX_API_KEY, "index-key");

    let hosting = MockServer::start().await;
    let index = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&hosting)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&index)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&index)
        .await;

    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    let config_path = config.path().join("indexer.yml");
    write(
        &config_path,
        format!(
            "hosting:\n  base_url: {}\n  include_orgs: [acme]\nindex:\n  url: {}/rest/v1/api\n  servlet_url: {}/search\n  collection: code\nstaging:\n  data_dir: {}\nrun:\n  settle_delay_secs: 0\n  probe_retries: 0\n",
            hosting.uri(),
            index.uri(),
            index.uri(),
            data.path().display()
        ),
    )
    .unwrap();

    let err = run(Cli {
        command: Commands::Sync {
            config: config_path,
        },
    })
    .await
    .unwrap_err();
    assert!(err.to_string().contains("unauthorized"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn unreachable_index_stops_cleanly_without_crawling() {
    env::set_var(ENV_HOSTING_USERNAME, "crawler");
    env::set_var(ENV_HOSTING_PASSWORD, "hunter2");
    env::set_var(ENV_INDEX_API_KEY, "index-key");

    let hosting = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&hosting)
        .await;

    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    let config_path = config.path().join("indexer.yml");
    write(
        &config_path,
        format!(
            "hosting:\n  base_url: {}\n  include_users: [alice]\nindex:\n  url: http://127.0.0.1:9/rest/v1/api\n  servlet_url: http://127.0.0.1:9/search\n  collection: code\nstaging:\n  data_dir: {}\nrun:\n  settle_delay_secs: 0\n  probe_retries: 0\n",
            hosting.uri(),
            data.path().display()
        ),
    )
    .unwrap();

    run(Cli {
        command: Commands::Sync {
            config: config_path,
        },
    })
    .await
    .expect("an unreachable index ends the run without an error");

    // The staging directory is still prepared before the index is checked.
    assert_eq!(std::fs::read_dir(data.path()).unwrap().count(), 1);
}
