//! tests/indexer_http.rs
//!
//! GraphQL indexer client against a mock HTTP server:
//! - request shape (query variables, fixed headers)
//! - packet hash extraction, empty results, HTTP and GraphQL errors
//! - bounded polling through `poll_packet_hash`

use std::time::Duration;

use httpmock::{Method, MockServer};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use union_bridger::{
    error::IndexerError,
    indexer::{poll_packet_hash, GraphQlIndexer, PacketIndexer, PollSettings},
};

fn indexer(server: &MockServer) -> GraphQlIndexer {
    GraphQlIndexer::new(server.url("/v1/graphql").parse().unwrap()).unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn returns_packet_hash_from_first_transfer() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path("/v1/graphql")
                .header("user-agent", "Mozilla/5.0")
                .header("content-type", "application/json")
                .json_body_partial(r#"{ "variables": { "submission_tx_hash": "0xabc" } }"#);
            then.status(200).json_body(json!({
                "data": { "v2_transfers": [ { "packet_hash": "0xpacket" } ] }
            }));
        })
        .await;

    let found = indexer(&server).packet_hash("0xabc").await.unwrap();

    mock.assert_async().await;
    assert_eq!(found.as_deref(), Some("0xpacket"));
}

#[tokio::test(flavor = "current_thread")]
async fn empty_transfers_mean_not_indexed_yet() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/v1/graphql");
            then.status(200)
                .json_body(json!({ "data": { "v2_transfers": [] } }));
        })
        .await;

    let found = indexer(&server).packet_hash("0xabc").await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test(flavor = "current_thread")]
async fn null_transfers_mean_not_indexed_yet() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST).path("/v1/graphql");
            then.status(200)
                .json_body(json!({ "data": { "v2_transfers": null } }));
        })
        .await;

    let found = indexer(&server).packet_hash("0xabc").await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test(flavor = "current_thread")]
async fn http_and_graphql_errors_are_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path("/v1/graphql")
                .json_body_partial(r#"{ "variables": { "submission_tx_hash": "0xdown" } }"#);
            then.status(503);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path("/v1/graphql")
                .json_body_partial(r#"{ "variables": { "submission_tx_hash": "0xbad" } }"#);
            then.status(200)
                .json_body(json!({ "errors": [ { "message": "field not found" } ] }));
        })
        .await;

    let client = indexer(&server);
    assert!(matches!(
        client.packet_hash("0xdown").await,
        Err(IndexerError::Status(status)) if status.as_u16() == 503
    ));
    assert!(matches!(
        client.packet_hash("0xbad").await,
        Err(IndexerError::GraphQl(_))
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn polling_normalizes_hash_and_gives_up_after_retries() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(Method::POST)
                .path("/v1/graphql")
                .json_body_partial(r#"{ "variables": { "submission_tx_hash": "0xfeed" } }"#);
            then.status(200)
                .json_body(json!({ "data": { "v2_transfers": [] } }));
        })
        .await;

    let settings = PollSettings {
        retries: 3,
        interval: Duration::from_millis(10),
    };
    let found =
        poll_packet_hash(&indexer(&server), "feed", settings, &CancellationToken::new()).await;

    assert_eq!(found, None);
    mock.assert_hits_async(3).await;
}
