use chrono::{TimeZone, Utc};
use repo_indexer::index_client::SearchIndexClient;
use repo_indexer::load_config::IndexEndpoints;
use repo_indexer_core::config::IndexTarget;
use repo_indexer_core::contract::{
    DeleteOutcome, DeleteRequest, IndexClient, IndexOutcome, IndexRequest, StagedDocument,
    WindowQuery,
};
use repo_indexer_core::error::IndexError;
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SearchIndexClient {
    SearchIndexClient::new(IndexEndpoints {
        url: format!("{}/rest/v1/api", server.uri()),
        servlet_url: format!("{}/searchblox/servlet/SearchServlet", server.uri()),
    })
    .unwrap()
}

fn request() -> IndexRequest {
    let target = IndexTarget {
        collection: "code".into(),
        api_key: "k".into(),
    };
    let doc = StagedDocument::new(
        "b.txt",
        PathBuf::from("/data/static2024-03-07-09-05-01/b.txt"),
        "https://raw/o/r/main/b.txt",
        3,
    );
    IndexRequest::for_document(&target, &doc)
}

#[tokio::test]
async fn index_posts_the_document_and_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/add"))
        .and(body_json(json!({
            "apikey": "k",
            "document": {
                "colname": "code",
                "url": "https://raw/o/r/main/b.txt",
                "uid": "https://raw/o/r/main/b.txt",
                "title": "b.txt",
                "location": "/data/static2024-03-07-09-05-01/b.txt",
                "meta": {"name": "b.txt", "size": "3"}
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server).index(&request()).await;
    assert_eq!(outcome, IndexOutcome::Indexed { status: 200 });
}

#[tokio::test]
async fn index_translates_service_status_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/add"))
        .respond_with(ResponseTemplate::new(501))
        .mount(&server)
        .await;

    let outcome = client(&server).index(&request()).await;
    assert_eq!(outcome, IndexOutcome::UnknownCollection);
}

#[tokio::test]
async fn server_error_from_add_is_not_counted_as_indexed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/add"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server).index(&request()).await;
    assert_eq!(outcome, IndexOutcome::Rejected { status: 500 });
    assert!(!outcome.is_indexed());
}

#[tokio::test]
async fn unreachable_service_is_status_minus_one() {
    let client = SearchIndexClient::new(IndexEndpoints {
        url: "http://127.0.0.1:9/rest/v1/api".into(),
        servlet_url: "http://127.0.0.1:9/search".into(),
    })
    .unwrap();

    assert_eq!(client.index(&request()).await, IndexOutcome::Unreachable);
    assert!(!client.ping().await);
}

#[tokio::test]
async fn delete_posts_collection_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/delete"))
        .and(body_partial_json(json!({
            "apikey": "k",
            "document": {"colname": "code", "url": "http://x/f&;oo.txt"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/api/delete"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server);
    let deleted = client
        .delete(&DeleteRequest {
            api_key: "k".into(),
            collection: "code".into(),
            url: "http://x/f&;oo.txt".into(),
        })
        .await;
    assert_eq!(deleted, DeleteOutcome::Deleted);

    let missing = client
        .delete(&DeleteRequest {
            api_key: "k".into(),
            collection: "code".into(),
            url: "http://x/other.txt".into(),
        })
        .await;
    assert_eq!(missing, DeleteOutcome::NotDeleted { status: 404 });
}

#[tokio::test]
async fn ping_hits_the_service_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).ping().await);
}

#[tokio::test]
async fn search_sends_the_window_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchblox/servlet/SearchServlet"))
        .and(query_param("cname", "code"))
        .and(query_param("sort", "indexdate"))
        .and(query_param("sortdir", "des"))
        .and(query_param("pagesize", "1000"))
        .and(query_param("xsl", "json"))
        .and(query_param(
            "f.indexdate.range",
            "[1970-01-10T00:00:00TO2024-03-07T09:05:01]",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":{"@hits":"0"}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let query = WindowQuery::up_to("code", Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap());
    let body = client(&server).search(&query).await.unwrap();
    assert_eq!(body, br#"{"results":{"@hits":"0"}}"#);
}

#[tokio::test]
async fn search_rejection_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let query = WindowQuery::up_to("code", Utc::now());
    let err = client(&server).search(&query).await.unwrap_err();
    assert!(matches!(err, IndexError::Status(503)));
}
