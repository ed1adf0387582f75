use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use libris_api::app::{AppConfig, AppServices, build_router};
use libris_auth::{Role, TokenService};
use libris_core::UserId;
use libris_infra::{StaticProvider, VolumeMetadata};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with_volumes(Vec::new()).await
    }

    /// Same router as prod, in-memory storage, canned metadata provider,
    /// ephemeral port.
    async fn spawn_with_volumes(volumes: Vec<VolumeMetadata>) -> Self {
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            token_ttl: ChronoDuration::minutes(30),
            database_url: None,
            use_persistent_stores: false,
            google_books_base_url: None,
        };
        let services = AppServices::in_memory(Arc::new(StaticProvider::new(volumes)));
        let app = build_router(&config, services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Register a user and return `(user_id, token)`.
async fn register_and_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> (String, String) {
    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "firstname": "Maria",
            "lastname": "Rivera",
            "password": "correct horse",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: serde_json::Value = res.json().await.unwrap();
    let user_id = user["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/auth/token", base_url))
        .json(&json!({ "username": username, "password": "correct horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();

    (user_id, body["access_token"].as_str().unwrap().to_string())
}

/// Create an author and a book under it, returning the book id.
async fn create_book(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    title: &str,
    isbn: &str,
    stock: i32,
) -> String {
    let res = client
        .post(format!("{}/authors", base_url))
        .bearer_auth(token)
        .json(&json!({ "name": "Ursula K. Le Guin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let author: serde_json::Value = res.json().await.unwrap();

    let res = client
        .post(format!("{}/books", base_url))
        .bearer_auth(token)
        .json(&json!({
            "title": title,
            "isbn": isbn,
            "publication_year": 1974,
            "genre": "Science Fiction",
            "stock": stock,
            "author_id": author["id"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let book: serde_json::Value = res.json().await.unwrap();
    book["id"].as_str().unwrap().to_string()
}

async fn stock_of(client: &reqwest::Client, base_url: &str, book_id: &str) -> i64 {
    let res = client
        .get(format!("{}/books/{}", base_url, book_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["stock"].as_i64().unwrap()
}

#[tokio::test]
async fn health_and_catalog_reads_are_public() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/books", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn mutations_require_a_token_and_rejection_leaves_state_unchanged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let payload = json!({ "name": "Ursula K. Le Guin" });

    // No token.
    let res = client
        .post(format!("{}/authors", srv.base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Malformed token.
    let res = client
        .post(format!("{}/authors", srv.base_url))
        .bearer_auth("not-a-token")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Nothing was written.
    let res = client
        .get(format!("{}/authors", srv.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Well-signed but issued two hours ago against a 30-minute ttl.
    let tokens = TokenService::new(JWT_SECRET.as_bytes(), ChronoDuration::minutes(30));
    let stale = tokens
        .issue(
            UserId::new(),
            "ghost",
            Role::member(),
            Utc::now() - ChronoDuration::hours(2),
        )
        .unwrap();

    let res = client
        .post(format!("{}/authors", srv.base_url))
        .bearer_auth(stale)
        .json(&json!({ "name": "Ursula K. Le Guin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_token_then_protected_call_succeeds() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (_user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;

    let res = client
        .get(format!("{}/users", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let users: serde_json::Value = res.json().await.unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "maria");
    // The hash never leaves the server.
    assert!(users[0].get("password_hash").is_none());
    assert!(users[0].get("hashed_password").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_and_login(&client, &srv.base_url, "maria").await;

    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({
            "username": "maria",
            "email": "other@example.com",
            "firstname": "Maria",
            "lastname": "Rivera",
            "password": "battery staple",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn wrong_password_and_unknown_account_answer_identically() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_and_login(&client, &srv.base_url, "maria").await;

    let wrong = client
        .post(format!("{}/auth/token", srv.base_url))
        .json(&json!({ "username": "maria", "password": "battery staple" }))
        .send()
        .await
        .unwrap();
    let missing = client
        .post(format!("{}/auth/token", srv.base_url))
        .json(&json!({ "username": "nobody", "password": "battery staple" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let wrong: serde_json::Value = wrong.json().await.unwrap();
    let missing: serde_json::Value = missing.json().await.unwrap();
    assert_eq!(wrong, missing);
}

#[tokio::test]
async fn checkout_decrements_stock_and_return_restores_it() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;
    let book_id = create_book(
        &client,
        &srv.base_url,
        &token,
        "The Dispossessed",
        "978-0060512750",
        2,
    )
    .await;

    let res = client
        .post(format!("{}/borrow/{}/{}", srv.base_url, user_id, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let confirmation: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        confirmation["message"],
        "'The Dispossessed' borrowed by maria."
    );

    assert_eq!(stock_of(&client, &srv.base_url, &book_id).await, 1);

    let res = client
        .post(format!(
            "{}/borrow/return/{}/{}",
            srv.base_url, user_id, book_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(stock_of(&client, &srv.base_url, &book_id).await, 2);
}

#[tokio::test]
async fn last_copy_rejects_the_second_borrower() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (first, token) = register_and_login(&client, &srv.base_url, "maria").await;
    let (second, _) = register_and_login(&client, &srv.base_url, "amal").await;
    let book_id = create_book(
        &client,
        &srv.base_url,
        &token,
        "The Dispossessed",
        "978-0060512750",
        1,
    )
    .await;

    let res = client
        .post(format!("{}/borrow/{}/{}", srv.base_url, first, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/borrow/{}/{}", srv.base_url, second, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["code"], "out_of_stock");

    assert_eq!(stock_of(&client, &srv.base_url, &book_id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_on_the_last_copy_admit_exactly_one() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (first, token) = register_and_login(&client, &srv.base_url, "maria").await;
    let (second, _) = register_and_login(&client, &srv.base_url, "amal").await;
    let book_id = create_book(
        &client,
        &srv.base_url,
        &token,
        "The Dispossessed",
        "978-0060512750",
        1,
    )
    .await;

    let race = |user_id: String| {
        let client = client.clone();
        let url = format!("{}/borrow/{}/{}", srv.base_url, user_id, book_id);
        let token = token.clone();
        async move { client.post(url).bearer_auth(token).send().await.unwrap().status() }
    };
    let (a, b) = tokio::join!(race(first), race(second));

    let statuses = [a, b];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1
    );
    assert_eq!(stock_of(&client, &srv.base_url, &book_id).await, 0);
}

#[tokio::test]
async fn double_return_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;
    let book_id = create_book(
        &client,
        &srv.base_url,
        &token,
        "The Dispossessed",
        "978-0060512750",
        1,
    )
    .await;

    let borrow_url = format!("{}/borrow/{}/{}", srv.base_url, user_id, book_id);
    let return_url = format!("{}/borrow/return/{}/{}", srv.base_url, user_id, book_id);

    let res = client.post(&borrow_url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client.post(&return_url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.post(&return_url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The failed return must not have touched stock.
    assert_eq!(stock_of(&client, &srv.base_url, &book_id).await, 1);
}

#[tokio::test]
async fn open_loans_listing_tracks_checkouts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;

    // Empty library answers an empty list, not an error.
    let res = client
        .get(format!("{}/borrow/borrowed-books", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!([]));

    let book_id = create_book(
        &client,
        &srv.base_url,
        &token,
        "The Dispossessed",
        "978-0060512750",
        1,
    )
    .await;
    client
        .post(format!("{}/borrow/{}/{}", srv.base_url, user_id, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/borrow/borrowed-books", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let loans: serde_json::Value = res.json().await.unwrap();
    assert_eq!(loans.as_array().unwrap().len(), 1);
    assert_eq!(loans[0]["book_title"], "The Dispossessed");
    assert_eq!(loans[0]["user_name"], "Maria Rivera");
}

#[tokio::test]
async fn history_distinguishes_unknown_user_from_empty_history() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;

    // Known user, nothing borrowed yet.
    let res = client
        .get(format!("{}/borrow/user/{}/history", srv.base_url, user_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!([]));

    // Unknown user id.
    let res = client
        .get(format!(
            "{}/borrow/user/{}/history",
            srv.base_url,
            UserId::new()
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_retains_returned_loans() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;
    let book_id = create_book(
        &client,
        &srv.base_url,
        &token,
        "The Dispossessed",
        "978-0060512750",
        1,
    )
    .await;

    let borrow_url = format!("{}/borrow/{}/{}", srv.base_url, user_id, book_id);
    let return_url = format!("{}/borrow/return/{}/{}", srv.base_url, user_id, book_id);
    client.post(&borrow_url).bearer_auth(&token).send().await.unwrap();
    client.post(&return_url).bearer_auth(&token).send().await.unwrap();
    client.post(&borrow_url).bearer_auth(&token).send().await.unwrap();

    let res = client
        .get(format!("{}/borrow/user/{}/history", srv.base_url, user_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let history: serde_json::Value = res.json().await.unwrap();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0]["returned_at"].is_string());
    assert!(entries[1]["returned_at"].is_null());
}

#[tokio::test]
async fn seeding_imports_volumes_and_purge_removes_unreferenced() {
    let volumes = vec![
        VolumeMetadata {
            title: Some("The Left Hand of Darkness".to_string()),
            authors: vec!["Ursula K. Le Guin".to_string()],
            isbn_13: Some("9780441478125".to_string()),
            isbn_10: None,
            published_date: Some("1969".to_string()),
            categories: vec!["Fiction".to_string()],
        },
        // No isbn: unusable.
        VolumeMetadata {
            title: Some("Untraceable".to_string()),
            authors: vec!["Anonymous".to_string()],
            isbn_13: None,
            isbn_10: None,
            published_date: Some("1999".to_string()),
            categories: vec![],
        },
    ];
    let srv = TestServer::spawn_with_volumes(volumes).await;
    let client = reqwest::Client::new();

    let (_user_id, token) = register_and_login(&client, &srv.base_url, "maria").await;

    let res = client
        .post(format!("{}/seed/fiction/10", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["imported"], 1);
    assert_eq!(report["skipped_invalid"], 1);

    let res = client
        .get(format!("{}/books", srv.base_url))
        .send()
        .await
        .unwrap();
    let books: serde_json::Value = res.json().await.unwrap();
    assert_eq!(books.as_array().unwrap().len(), 1);

    // Nothing borrowed the seeded book, so purge removes it and its author.
    let res = client
        .delete(format!("{}/seed", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report: serde_json::Value = res.json().await.unwrap();
    assert_eq!(report["books_deleted"], 1);
    assert_eq!(report["authors_deleted"], 1);

    let res = client
        .get(format!("{}/books", srv.base_url))
        .send()
        .await
        .unwrap();
    let books: serde_json::Value = res.json().await.unwrap();
    assert_eq!(books, json!([]));
}
