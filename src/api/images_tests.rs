//! Tests for image downloads and the per-record image memo.

use std::collections::BTreeSet;
use std::io::Cursor;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::ImageResolver;
use crate::api::hosts::ImageHosts;
use crate::error::FetchFailure;
use crate::models::{CardImage, CardRecord};
use tokio_util::sync::CancellationToken;

/// Helper: encodes a tiny PNG so responses pass image validation.
fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn resolver_for(server: &MockServer) -> ImageResolver {
    ImageResolver::new(reqwest::Client::new(), ImageHosts::all_at(&server.uri()))
}

fn card(scryfall_id: &str, multiverse_id: &str) -> CardRecord {
    let mut card = CardRecord::new(
        "Delver of Secrets".to_string(),
        "u1".to_string(),
        "51",
        "ISD",
        BTreeSet::new(),
    );
    card.set_image_ids(scryfall_id, multiverse_id);
    card
}

fn placeholder() -> CardImage {
    CardImage::from_bytes(png_bytes(7, 7)).unwrap()
}

// ── fetch_image ──────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_image_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(4, 6)))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let url = format!("{}/img.png", mock_server.uri());
    let image = resolver
        .fetch_image(&url, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(image.width(), 4);
    assert_eq!(image.height(), 6);
}

#[tokio::test]
async fn fetch_image_404_is_status_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let url = format!("{}/missing.jpg", mock_server.uri());
    let result = resolver.fetch_image(&url, &CancellationToken::new()).await;

    match result {
        Err(FetchFailure::Status(status)) => assert_eq!(status.as_u16(), 404),
        other => panic!("Expected FetchFailure::Status, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_image_malformed_bytes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not an image</html>"))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let url = format!("{}/broken.jpg", mock_server.uri());
    let result = resolver.fetch_image(&url, &CancellationToken::new()).await;

    assert!(matches!(result, Err(FetchFailure::Malformed(_))));
    assert!(resolver
        .try_fetch_image(&url, &CancellationToken::new())
        .await
        .is_none());
}

#[tokio::test]
async fn fetch_image_unreachable_host() {
    let resolver = ImageResolver::new(reqwest::Client::new(), ImageHosts::default());
    // Port 9 (discard) on localhost is not expected to serve HTTP
    let result = resolver
        .fetch_image("http://127.0.0.1:9/x.jpg", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(FetchFailure::Transport(_))));
}

#[tokio::test]
async fn fetch_image_cancelled_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1, 1)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let url = format!("{}/img.png", mock_server.uri());

    let result = resolver.fetch_image(&url, &cancel).await;
    assert!(matches!(result, Err(FetchFailure::Cancelled)));
}

// ── fetch_images ─────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_images_uses_scryfall_front_and_back() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large/front/a/b/abc123.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(2, 3)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/large/back/a/b/abc123.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(3, 2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let card = card("abc123", "130550");

    let (front, back) = resolver
        .fetch_images(&card, None, &CancellationToken::new())
        .await;

    assert_eq!(front.unwrap().width(), 2);
    assert_eq!(back.unwrap().width(), 3);
}

#[tokio::test]
async fn fetch_images_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large/front/a/b/abc123.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(2, 3)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/large/back/a/b/abc123.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let card = card("abc123", "");
    let placeholder = placeholder();
    let cancel = CancellationToken::new();

    let first = resolver.fetch_images(&card, Some(&placeholder), &cancel).await;
    let second = resolver.fetch_images(&card, Some(&placeholder), &cancel).await;

    assert_eq!(first, second);
    assert!(card.front_image().is_some());
    assert_eq!(card.back_image(), Some(&placeholder));
}

#[tokio::test]
async fn fetch_images_falls_back_to_gatherer() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Handlers/Image.ashx"))
        .and(query_param("multiverseid", "130550"))
        .and(query_param("type", "card"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(5, 5)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let card = card("", "130550");
    let placeholder = placeholder();

    let (front, back) = resolver
        .fetch_images(&card, Some(&placeholder), &CancellationToken::new())
        .await;

    assert_eq!(front.unwrap().width(), 5);
    // No Scryfall id means no back face lookup at all
    assert_eq!(back, Some(placeholder));
}

#[tokio::test]
async fn fetch_images_without_ids_touches_no_host() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let card = card("", "");

    let (front, back) = resolver
        .fetch_images(&card, None, &CancellationToken::new())
        .await;

    assert!(front.is_none());
    assert!(back.is_none());
}

#[tokio::test]
async fn fetch_images_failure_is_absorbed_and_retried_later() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Handlers/Image.ashx"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Handlers/Image.ashx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1, 1)))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let card = card("", "42");
    let cancel = CancellationToken::new();

    let (front, _) = resolver.fetch_images(&card, None, &cancel).await;
    assert!(front.is_none());
    assert!(card.front_image().is_none());

    let (front, _) = resolver.fetch_images(&card, None, &cancel).await;
    assert!(front.is_some());
}

#[tokio::test]
async fn fetch_images_cancelled_memoises_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(1, 1)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let card = card("abc123", "");
    let placeholder = placeholder();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (front, back) = resolver.fetch_images(&card, Some(&placeholder), &cancel).await;

    assert!(front.is_none());
    assert!(back.is_none());
    assert!(card.front_image().is_none());
    assert!(card.back_image().is_none());
}
