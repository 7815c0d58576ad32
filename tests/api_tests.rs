use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use shelf_recs::{
    api::{create_router, AppState},
    db::{MemoryCatalog, MemoryLibrary},
    middleware::REQUEST_ID_HEADER,
    models::{Item, ItemId, LibraryEntry, ShelfKind, UserId, WeightTable},
    services::{Recommender, RecommenderSettings},
};

fn catalog() -> MemoryCatalog {
    MemoryCatalog::with_items(vec![
        Item::new(1, "The Hobbit", "J.R.R. Tolkien")
            .with_genre("Fantasy")
            .with_category("Fiction")
            .with_themes("adventure, dragons, journey"),
        Item::new(2, "The Silmarillion", "J.R.R. Tolkien")
            .with_genre("Fantasy")
            .with_category("Fiction")
            .with_themes("myth, creation, elves"),
        Item::new(3, "A Wizard of Earthsea", "Ursula K. Le Guin")
            .with_genre("Fantasy")
            .with_category("Fiction")
            .with_themes("magic, journey, coming of age"),
        Item::new(4, "Dune", "Frank Herbert")
            .with_genre("Science Fiction")
            .with_category("Fiction")
            .with_themes("desert, politics"),
        Item::new(5, "Cosmos", "Carl Sagan")
            .with_genre("Science")
            .with_category("Nonfiction")
            .with_themes("universe, history"),
    ])
}

async fn create_test_server() -> TestServer {
    let library = MemoryLibrary::new();
    library
        .add(LibraryEntry::new(UserId(1), ItemId(1), ShelfKind::Favorite))
        .await;
    library
        .add(LibraryEntry::new(UserId(1), ItemId(4), ShelfKind::Read))
        .await;

    let recommender = Recommender::new(
        Arc::new(catalog()),
        Arc::new(library),
        WeightTable::default(),
        RecommenderSettings::default(),
    );
    let state = AppState::new(Arc::new(recommender), 10, 20);
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendations_exclude_library() {
    let server = create_test_server().await;
    let response = server.get("/api/v1/users/1/recommendations").await;
    response.assert_status_ok();

    let items: Vec<Value> = response.json();
    assert!(!items.is_empty());
    assert!(items.len() <= 3);
    for item in &items {
        assert_ne!(item["id"], 1);
        assert_ne!(item["id"], 4);
    }
}

#[tokio::test]
async fn test_recommendations_respect_limit() {
    let server = create_test_server().await;
    let response = server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("limit", 1)
        .await;
    response.assert_status_ok();

    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_limit_above_max_is_rejected() {
    let server = create_test_server().await;
    let response = server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("limit", 500)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn test_unknown_user_gets_recent_items() {
    let server = create_test_server().await;
    let response = server.get("/api/v1/users/99/recommendations").await;
    response.assert_status_ok();

    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 5);
}

#[tokio::test]
async fn test_profile_endpoint() {
    let server = create_test_server().await;
    let response = server.get("/api/v1/users/1/profile").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["library_size"], 2);
    assert_eq!(body["profile"]["author_loyal"], false);
    assert!(body["weights"]["genre"].is_number());
}

#[tokio::test]
async fn test_similarity_endpoint() {
    let server = create_test_server().await;
    let response = server
        .get("/api/v1/similarity")
        .add_query_param("a", 1)
        .add_query_param("b", 2)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let score = body["score"].as_f64().unwrap();
    assert!(score > 0.5 && score <= 1.0);
}

#[tokio::test]
async fn test_similarity_unknown_item_is_not_found() {
    let server = create_test_server().await;
    let response = server
        .get("/api/v1/similarity")
        .add_query_param("a", 1)
        .add_query_param("b", 404)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server().await;
    let id = "6f1c2a1e-7a44-4c6b-9a53-0d4b5f3c2e10";
    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static(REQUEST_ID_HEADER),
            axum::http::HeaderValue::from_static(id),
        )
        .await;
    response.assert_status_ok();
    assert_eq!(response.header(REQUEST_ID_HEADER), id);
}
