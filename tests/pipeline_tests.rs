mod common;

use mockito::Matcher;
use serde_json::json;
use shelfscout::agent::AgentError;
use shelfscout::retry::RetryError;
use shelfscout::{BookQuery, RecommendError, Recommender, ResolvedMetadata};

const META_ONLY_PAGE: &str = r#"<html><head>
    <meta property="og:image" content="https://images.example.com/hail-mary.jpg"/>
    <meta itemprop="ratingValue" content="4.52"/>
    <meta itemprop="reviewCount" content="98765"/>
</head><body><p>Nothing structured here.</p></body></html>"#;

#[tokio::test]
async fn recommends_enriched_book_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);
    let detail_url = format!("{}/book/show/54493401-project-hail-mary", server.url());

    let shelf = server
        .mock("GET", "/review/list/42")
        .match_query(Matcher::UrlEncoded("shelf".into(), "read".into()))
        .with_status(200)
        .with_body(common::shelf_page(&["Dune"]))
        .expect(1)
        .create_async()
        .await;

    let model = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "model-key".into()))
        .match_body(Matcher::Regex("The user's list of read books is: Dune\\.".into()))
        .with_status(200)
        .with_body(common::model_reply(
            "```json\n[{\"bookTitle\":\"Project Hail Mary\",\"summary\":\"space survival\"}]\n```",
        ))
        .expect(1)
        .create_async()
        .await;

    let search = server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Project Hail Mary site:goodreads.com".into()),
            Matcher::UrlEncoded("key".into(), "search-key".into()),
            Matcher::UrlEncoded("cx".into(), "search-cx".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "link": "https://www.goodreads.com/author/show/6540057.Andy_Weir" },
                    { "link": detail_url, "title": "Project Hail Mary" }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let page = server
        .mock("GET", "/book/show/54493401-project-hail-mary")
        .match_header("user-agent", Matcher::Regex("^Mozilla/5\\.0".into()))
        .with_status(200)
        .with_body(META_ONLY_PAGE)
        .expect(1)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let results = recommender
        .get_recommendations("42", &common::image(), &common::credentials())
        .await
        .unwrap();

    shelf.assert_async().await;
    model.assert_async().await;
    search.assert_async().await;
    page.assert_async().await;

    assert_eq!(results.len(), 1);
    let book = &results[0];
    assert_eq!(book.candidate.book_title, "Project Hail Mary");
    assert_eq!(book.candidate.summary.as_deref(), Some("space survival"));
    assert_eq!(book.metadata.canonical_url.as_deref(), Some(detail_url.as_str()));
    assert_eq!(book.metadata.rating.as_deref(), Some("4.52"));
    assert_eq!(book.metadata.review_count.as_deref(), Some("98765"));
    assert_eq!(
        book.metadata.cover_image_url.as_deref(),
        Some("https://images.example.com/hail-mary.jpg")
    );
    assert_eq!(book.metadata.title, None);
}

#[tokio::test]
async fn one_failed_enrichment_does_not_affect_siblings_or_order() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);
    let detail_url = format!("{}/book/show/1.Piranesi", server.url());

    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(common::model_reply(
            r#"[{"bookTitle":"Unfindable Book"},{"bookTitle":"Piranesi","author":"Susanna Clarke"}]"#,
        ))
        .create_async()
        .await;

    server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "Unfindable Book site:goodreads.com".into(),
        ))
        .with_status(200)
        .with_body(r#"{"items":[]}"#)
        .create_async()
        .await;

    server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "Piranesi Susanna Clarke site:goodreads.com".into(),
        ))
        .with_status(200)
        .with_body(json!({ "items": [{ "link": detail_url }] }).to_string())
        .create_async()
        .await;

    server
        .mock("GET", "/book/show/1.Piranesi")
        .with_status(200)
        .with_body(r#"<html><body><h1 class="Text__title1">Piranesi</h1></body></html>"#)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let results = recommender
        .get_recommendations("", &common::image(), &common::credentials())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].candidate.book_title, "Unfindable Book");
    assert_eq!(results[0].metadata, ResolvedMetadata::empty());
    assert_eq!(results[1].candidate.book_title, "Piranesi");
    assert_eq!(results[1].metadata.title.as_deref(), Some("Piranesi"));
    assert_eq!(
        results[1].metadata.canonical_url.as_deref(),
        Some(detail_url.as_str())
    );
}

#[tokio::test]
async fn no_detail_page_in_results_skips_page_fetch() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "items": [
                    { "link": format!("{}/author/show/58.Frank_Herbert", server.url()) },
                    { "link": format!("{}/series/45935-dune", server.url()) }
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let any_page = server
        .mock("GET", Matcher::Regex("^/(author|series|book)/".into()))
        .expect(0)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let metadata = recommender
        .metadata()
        .resolve(
            &BookQuery::new("Dune", None),
            &common::credentials().search,
        )
        .await;

    any_page.assert_async().await;
    assert_eq!(metadata, ResolvedMetadata::empty());
}

#[tokio::test]
async fn page_network_error_leaves_canonical_url_unset() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    // Nothing listens on port 1, so the page fetch fails at the transport level.
    server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"items":[{"link":"http://127.0.0.1:1/book/show/1.Dune"}]}"#)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let metadata = recommender
        .metadata()
        .resolve(
            &BookQuery::new("Dune", None),
            &common::credentials().search,
        )
        .await;

    assert_eq!(metadata.canonical_url, None);
    assert!(metadata.is_empty());
}

#[tokio::test]
async fn page_error_status_yields_empty_metadata() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({ "items": [{ "link": format!("{}/book/show/1.Dune", server.url()) }] })
                .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/book/show/1.Dune")
        .with_status(403)
        .with_body("<html>blocked</html>")
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let metadata = recommender
        .metadata()
        .resolve(
            &BookQuery::new("Dune", None),
            &common::credentials().search,
        )
        .await;

    assert!(metadata.is_empty());
}

#[tokio::test]
async fn search_failure_and_missing_credentials_are_absorbed() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    let search = server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let query = BookQuery::new("Dune", None);

    let metadata = recommender
        .metadata()
        .resolve(&query, &common::credentials().search)
        .await;
    assert!(metadata.is_empty());

    let metadata = recommender
        .metadata()
        .resolve(&query, &shelfscout::SearchCredentials::default())
        .await;
    assert!(metadata.is_empty());

    search.assert_async().await;
}

#[tokio::test]
async fn unparseable_model_answer_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(common::model_reply("I see a lovely shelf of books!"))
        .create_async()
        .await;
    let search = server
        .mock("GET", "/customsearch/v1")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let err = recommender
        .get_recommendations("", &common::image(), &common::credentials())
        .await
        .unwrap_err();

    search.assert_async().await;
    assert!(matches!(err, RecommendError::Decode(_)));
    assert_eq!(
        err.user_message(),
        "The recommendations could not be read. Please try again."
    );
}

#[tokio::test]
async fn hard_model_failure_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    let model = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"error":{"code":500,"message":"Internal error encountered."}}"#)
        .expect(1)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let err = recommender
        .get_recommendations("", &common::image(), &common::credentials())
        .await
        .unwrap_err();

    model.assert_async().await;
    match err {
        RecommendError::Model(AgentError::RequestFailed(RetryError::Upstream {
            status,
            message,
        })) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "Internal error encountered.");
        }
        other => panic!("expected upstream model failure, got {other:?}"),
    }
}

#[tokio::test]
async fn model_without_candidates_is_an_empty_response() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"candidates":[],"promptFeedback":{"blockReason":"OTHER"}}"#)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let err = recommender
        .get_recommendations("", &common::image(), &common::credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, RecommendError::Model(AgentError::EmptyResponse)));
}

#[tokio::test]
async fn unreachable_read_shelf_does_not_block_recommendations() {
    let mut server = mockito::Server::new_async().await;
    let config = common::config_for(&server);

    server
        .mock("GET", "/review/list/42")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let model = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("The user's list of read books is: \\.".into()))
        .with_status(200)
        .with_body(common::model_reply("[]"))
        .expect(1)
        .create_async()
        .await;

    let recommender = Recommender::from_config(&config).unwrap();
    let results = recommender
        .get_recommendations("42", &common::image(), &common::credentials())
        .await
        .unwrap();

    model.assert_async().await;
    assert!(results.is_empty());
}
