use axum::http::StatusCode;
use campus_market::handlers::{routes, AppState};
use campus_market::marketplace::{Category, ListingStatus};
use campus_market::mocks::{MockAuth, MockBackend};
use campus_market::query::queries::{BIDS, LISTINGS};
use campus_market::views::HomeView;
use campus_market::SessionContext;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

const SELLER: &str = "seller-a";
const BUYER: &str = "buyer-b";
const PASSWORD: &str = "correct horse";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

struct TestApp {
    base: String,
    client: Client,
    mock: MockBackend,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn sign_in(&self, email: &str) {
        let response = self
            .client
            .post(self.url("/session"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn place_bid(&self, listing_id: &str, amount: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/listings/{}/bids", listing_id)))
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// Gateway on an ephemeral port over in-memory stores
async fn spawn_app() -> TestApp {
    init_tracing();
    let mock = MockBackend::new();
    mock.seed_profile(SELLER, "a@uni.edu").await;
    mock.seed_profile(BUYER, "b@uni.edu").await;

    let auth = Arc::new(
        MockAuth::new()
            .with_account("a@uni.edu", PASSWORD, SELLER)
            .with_account("b@uni.edu", PASSWORD, BUYER),
    );
    let state = AppState {
        backend: mock.backend.clone(),
        session: Arc::new(SessionContext::start(auth)),
        home: Arc::new(HomeView::new()),
    };

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, routes(state)).await.ok();
    });

    TestApp {
        base: format!("http://{}", addr),
        client: Client::new(),
        mock,
    }
}

/// Buyer bids on a seller's listing and sees the bid after the re-fetch
#[tokio::test]
async fn test_place_bid() {
    let app = spawn_app().await;
    let listing_id = app
        .mock
        .seed_listing(SELLER, "Desk lamp", Category::Electronics, ListingStatus::Active, 20.0)
        .await;
    app.sign_in("b@uni.edu").await;

    let response = app.place_bid(&listing_id, "25").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["phase"], "loaded");
    assert_eq!(body["can_interact"], true);
    assert_eq!(body["bid_input"], "");
    assert_eq!(body["notice"]["kind"], "success");

    let bids = body["listing"]["bids"].as_array().expect("bids embedded");
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0]["amount"].as_f64(), Some(25.0));
    assert_eq!(bids[0]["status"], "pending");
    assert_eq!(bids[0]["bidder"]["id"], BUYER);
}

#[tokio::test]
async fn test_invalid_bid_is_rejected() {
    let app = spawn_app().await;
    let listing_id = app
        .mock
        .seed_listing(SELLER, "Calculator", Category::Electronics, ListingStatus::Active, 15.0)
        .await;
    app.sign_in("b@uni.edu").await;

    for amount in ["abc", "-5", "0"] {
        let response = app.place_bid(&listing_id, amount).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", amount);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert!(body["error"].is_string());
    }
    assert_eq!(app.mock.store.insert_count(BIDS).await, 0);
}

#[tokio::test]
async fn test_seller_cannot_bid_on_own_listing() {
    let app = spawn_app().await;
    let listing_id = app
        .mock
        .seed_listing(SELLER, "Textbook", Category::Books, ListingStatus::Active, 35.0)
        .await;
    app.sign_in("a@uni.edu").await;

    let detail: Value = app
        .client
        .get(app.url(&format!("/listings/{}", listing_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(detail["can_interact"], false);
    assert_eq!(detail["listing"]["seller"]["email"], "a@uni.edu");

    let response = app.place_bid(&listing_id, "40").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.mock.store.insert_count(BIDS).await, 0);
}

#[tokio::test]
async fn test_bid_requires_sign_in() {
    let app = spawn_app().await;
    let listing_id = app
        .mock
        .seed_listing(SELLER, "Ticket", Category::Tickets, ListingStatus::Active, 50.0)
        .await;

    let response = app.place_bid(&listing_id, "55").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_listing() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/listings/does-not-exist"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_listing_with_images() {
    let app = spawn_app().await;
    app.sign_in("a@uni.edu").await;

    let listing = json!({
        "title": "Graphing calculator",
        "description": "Works fine",
        "price": 60.0,
        "category": "Electronics",
    });
    let image = |name: &str| {
        Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
            .file_name(name.to_string())
            .mime_str("image/png")
            .expect("valid mime")
    };
    let form = Form::new()
        .text("listing", listing.to_string())
        .part("image", image("front.png"))
        .part("image", image("back.png"));

    let response = app
        .client
        .post(app.url("/listings"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["seller_id"], SELLER);
    assert_eq!(body["images"].as_array().map(Vec::len), Some(2));
    assert_eq!(app.mock.store.insert_count(LISTINGS).await, 1);
    assert_eq!(app.mock.objects.paths().await.len(), 2);
}

#[tokio::test]
async fn test_create_listing_requires_sign_in() {
    let app = spawn_app().await;
    let form = Form::new().text(
        "listing",
        json!({"title": "x", "price": 1.0, "category": "Books"}).to_string(),
    );
    let response = app
        .client
        .post(app.url("/listings"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.mock.store.insert_count(LISTINGS).await, 0);
}

/// Category filter and carousel paging over HTTP
#[tokio::test]
async fn test_home_listings_and_featured() {
    let app = spawn_app().await;
    for category in [Category::Books, Category::Books, Category::Services, Category::Tickets, Category::Books] {
        let id = app
            .mock
            .seed_listing(SELLER, "item", category, ListingStatus::Active, 5.0)
            .await;
        app.mock.seed_image(&id).await;
    }

    let home: Value = app
        .client
        .get(app.url("/listings?category=All"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(home["listings"].as_array().map(Vec::len), Some(5));
    assert_eq!(home["featured"].as_array().map(Vec::len), Some(3));
    assert_eq!(home["featured_total"], 5);
    assert!(home["selected_category"].is_null());

    let next: Value = app
        .client
        .post(app.url("/featured/next"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(next["featured_offset"], 3);
    assert_eq!(next["featured"].as_array().map(Vec::len), Some(2));

    let prev: Value = app
        .client
        .post(app.url("/featured/prev"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(prev["featured_offset"], 0);

    let books: Value = app
        .client
        .get(app.url("/listings?category=Books&q=calc"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(books["selected_category"], "Books");
    assert_eq!(books["query"], "calc");
    assert_eq!(books["listings"].as_array().map(Vec::len), Some(3));
    assert_eq!(books["categories"][0]["count"], 3);
    assert_eq!(books["categories"][1]["count"], 0);

    let response = app
        .client
        .get(app.url("/listings?category=Furniture"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_message_seller() {
    let app = spawn_app().await;
    let listing_id = app
        .mock
        .seed_listing(SELLER, "Tutoring", Category::Services, ListingStatus::Active, 25.0)
        .await;
    app.sign_in("b@uni.edu").await;

    let response = app
        .client
        .post(app.url(&format!("/listings/{}/messages", listing_id)))
        .json(&json!({ "content": "Are weekends ok?" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let sent: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(sent["receiver_id"], SELLER);

    let blank = app
        .client
        .post(app.url(&format!("/listings/{}/messages", listing_id)))
        .json(&json!({ "content": "   " }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let messages: Value = app
        .client
        .get(app.url(&format!("/listings/{}/messages", listing_id)))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let messages = messages.as_array().expect("message list");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Are weekends ok?");
    assert_eq!(messages[0]["sender"]["email"], "b@uni.edu");
}

#[tokio::test]
async fn test_dashboard_and_session() {
    let app = spawn_app().await;
    let listing_id = app
        .mock
        .seed_listing(SELLER, "Mini fridge", Category::Electronics, ListingStatus::Active, 45.0)
        .await;

    let response = app
        .client
        .get(app.url("/dashboard"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bad = app
        .client
        .post(app.url("/session"))
        .json(&json!({ "email": "b@uni.edu", "password": "nope" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

    app.sign_in("b@uni.edu").await;
    let session: Value = app
        .client
        .get(app.url("/session"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(session["user"]["id"], BUYER);

    assert_eq!(app.place_bid(&listing_id, "50").await.status(), StatusCode::OK);
    let dashboard: Value = app
        .client
        .get(app.url("/dashboard"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(dashboard["listings"].as_array().map(Vec::len), Some(0));
    assert_eq!(dashboard["bids"][0]["listing"]["title"], "Mini fridge");

    let response = app
        .client
        .delete(app.url("/session"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let session: Value = app
        .client
        .get(app.url("/session"))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(session["user"].is_null());
}
