use std::num::NonZeroU32;
use std::time::Duration;

use gamedex::application::repos::{PageSource, PropertyStore, StoreError};
use gamedex::config::StoreSettings;
use gamedex::domain::properties::{Property, PropertyValue};
use gamedex::domain::query::{Category, Condition, DataQuery, QueryExpression, SortKey};
use gamedex::infra::smw::SmwClient;
use httpmock::prelude::*;
use url::Url;

fn client(server: &MockServer, timeout: Duration) -> SmwClient {
    client_with_page_size(server, timeout, 500)
}

fn client_with_page_size(server: &MockServer, timeout: Duration, page_size: u32) -> SmwClient {
    let settings = StoreSettings {
        api_url: Url::parse(&server.url("/api.php")).expect("mock server url"),
        wiki_base_url: server.url("/wiki/"),
        timeout,
        count_limit: NonZeroU32::new(page_size).expect("non-zero"),
    };
    SmwClient::new(&settings).expect("client builds")
}

const GAMES_BODY: &str = r#"{
  "query": {
    "results": {
      "Games/Portal 2": {
        "fulltext": "Games/Portal 2",
        "fullurl": "http://wiki.test/wiki/Games/Portal_2",
        "displaytitle": "",
        "printouts": {
          "Has name": ["Portal 2"],
          "Has platforms": [
            {"fulltext": "Platforms/PC", "fullurl": "http://wiki.test/wiki/Platforms/PC", "displaytitle": "PC"}
          ],
          "Has release date": [{"timestamp": "1303171200", "raw": "1/2011/4/19"}]
        }
      },
      "Games/Halo 3": {
        "fulltext": "Games/Halo 3",
        "fullurl": "http://wiki.test/wiki/Games/Halo_3",
        "printouts": {
          "Has name": ["Halo 3"],
          "Has platforms": [],
          "Has release date": []
        }
      }
    }
  }
}"#;

#[tokio::test]
async fn query_renders_ask_syntax_and_keeps_store_order() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api.php")
                .query_param("format", "json")
                .query_param("action", "ask")
                .query_param(
                    "query",
                    "[[Category:Games]][[Has name::~*portal*]]|?Has name|?Has platforms|?Has release date|sort=Has release date|order=desc|limit=2|offset=4",
                );
            then.status(200)
                .header("content-type", "application/json")
                .body(GAMES_BODY);
        })
        .await;

    let store = client(&server, Duration::from_secs(5));
    let expression = QueryExpression::in_category(Category::Games)
        .and(Condition::Contains(Property::Name, "portal".to_string()));
    let query = DataQuery::new(expression, 2)
        .sorted(SortKey::ReleaseDate.directive())
        .offset(4)
        .project(&[Property::Name, Property::Platforms, Property::ReleaseDate]);

    let rows = store.query(&query).await.expect("query succeeds");

    mock.assert_async().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].subject.fulltext, "Games/Portal 2");
    assert_eq!(rows[0].subject.display_title, None);
    assert_eq!(rows[0].text(Property::Name), Some("Portal 2"));
    let platform = rows[0].page(Property::Platforms).expect("platform page");
    assert_eq!(platform.title(), "PC");
    assert_eq!(
        rows[0].values(Property::ReleaseDate),
        &[PropertyValue::Date {
            raw: "1/2011/4/19".to_string(),
            timestamp: Some(1_303_171_200),
        }]
    );
    assert_eq!(rows[1].subject.fulltext, "Games/Halo 3");
    assert!(rows[1].values(Property::Platforms).is_empty());
}

#[tokio::test]
async fn count_is_the_number_of_subjects_on_a_single_page() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api.php")
                .query_param("action", "ask")
                .query_param("query", "[[Category:Games]][[Has platforms::Platforms/PC]]|limit=500");
            then.status(200)
                .header("content-type", "application/json")
                .body(GAMES_BODY);
        })
        .await;

    let store = client(&server, Duration::from_secs(5));
    let expression = QueryExpression::in_category(Category::Games)
        .and(Condition::Equals(Property::Platforms, "Platforms/PC".to_string()));

    assert_eq!(store.count(&expression).await.expect("count succeeds"), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn count_follows_continuation_past_the_page_size() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api.php")
                .query_param("action", "ask")
                .query_param("query", "[[Category:Games]]|limit=2");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"query-continue-offset": 2, "query": {"results": {
                        "Games/Halo": {"fulltext": "Games/Halo"},
                        "Games/Portal": {"fulltext": "Games/Portal"}
                    }}}"#,
                );
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api.php")
                .query_param("action", "ask")
                .query_param("query", "[[Category:Games]]|limit=2|offset=2");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"query": {"results": {"Games/Zork": {"fulltext": "Games/Zork"}}}}"#);
        })
        .await;

    let store = client_with_page_size(&server, Duration::from_secs(5), 2);
    let total = store
        .count(&QueryExpression::in_category(Category::Games))
        .await
        .expect("count succeeds");

    assert_eq!(total, 3);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn empty_results_array_counts_as_zero() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api.php").query_param("action", "ask");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"query": {"results": []}}"#);
        })
        .await;

    let store = client(&server, Duration::from_secs(5));
    let expression = QueryExpression::in_category(Category::Concepts);

    assert_eq!(store.count(&expression).await.expect("count succeeds"), 0);
}

#[tokio::test]
async fn api_errors_surface_as_remote_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api.php").query_param("action", "ask");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"error": {"code": "smw-error", "info": "Query too complex"}}"#);
        })
        .await;

    let store = client(&server, Duration::from_secs(5));
    let err = store
        .count(&QueryExpression::in_category(Category::People))
        .await
        .expect_err("remote error");

    match err {
        StoreError::Remote { code, info } => {
            assert_eq!(code, "smw-error");
            assert_eq!(info, "Query too complex");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn http_failures_and_bad_bodies_are_distinguished() {
    let server = MockServer::start_async().await;
    let mut failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/api.php");
            then.status(503).body("maintenance");
        })
        .await;

    let store = client(&server, Duration::from_secs(5));
    let expression = QueryExpression::in_category(Category::Games);
    assert!(matches!(
        store.count(&expression).await,
        Err(StoreError::Transport(_))
    ));

    failing.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api.php");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html>not json</html>");
        })
        .await;
    assert!(matches!(
        store.count(&expression).await,
        Err(StoreError::Decode(_))
    ));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api.php");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"query": {"results": []}}"#)
                .delay(Duration::from_secs(2));
        })
        .await;

    let store = client(&server, Duration::from_millis(200));
    let result = store
        .count(&QueryExpression::in_category(Category::Games))
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn wikitext_reads_the_main_slot() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api.php")
                .query_param("action", "query")
                .query_param("prop", "revisions")
                .query_param("titles", "Games/Halo 3");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"query": {"pages": [{"title": "Games/Halo 3", "revisions": [
                        {"slots": {"main": {"content": "{{Game}}\n<div id='imageData' data-json='{}'></div>"}}}
                    ]}]}}"#,
                );
        })
        .await;

    let store = client(&server, Duration::from_secs(5));
    let text = store
        .wikitext("Games/Halo 3")
        .await
        .expect("wikitext succeeds")
        .expect("page exists");

    mock.assert_async().await;
    assert!(text.starts_with("{{Game}}"));
}

#[tokio::test]
async fn missing_pages_have_no_wikitext() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api.php").query_param("action", "query");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"query": {"pages": [{"title": "Games/Nope", "missing": true}]}}"#);
        })
        .await;

    let store = client(&server, Duration::from_secs(5));

    assert_eq!(store.wikitext("Games/Nope").await.expect("request succeeds"), None);
}
