// region:    --- Imports
use crate::backend::{Backend, User};
use crate::error::{MarketError, MarketResult};
use crate::marketplace::commands::create_listing;
use crate::marketplace::model::{
    Category, ImageUpload, Listing, ListingStatus, Message, NewListing,
};
use crate::query::fetch_messages;
use crate::session::SessionContext;
use crate::views::{
    load_dashboard, Dashboard, DetailSnapshot, HomeSnapshot, HomeView, ListingDetail,
};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

// endregion: --- Imports

// region:    --- State & Router

#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub session: Arc<SessionContext>,
    pub home: Arc<HomeView>,
}

pub fn routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/listings", get(handle_get_listings).post(handle_create_listing))
        .route("/listings/:id", get(handle_get_listing))
        .route("/listings/:id/bids", post(handle_place_bid))
        .route(
            "/listings/:id/messages",
            get(handle_get_messages).post(handle_send_message),
        )
        .route("/featured/next", post(handle_featured_next))
        .route("/featured/prev", post(handle_featured_prev))
        .route("/dashboard", get(handle_get_dashboard))
        .route(
            "/session",
            get(handle_get_session)
                .post(handle_sign_in)
                .delete(handle_sign_out),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // listing images arrive as multipart bodies
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20))
        .with_state(state)
}

// endregion: --- State & Router

// region:    --- Home Handlers

#[derive(Debug, Deserialize)]
pub struct ListingsParams {
    pub category: Option<String>,
    pub q: Option<String>,
}

/// Search / category filter
async fn handle_get_listings(
    State(state): State<AppState>,
    Query(params): Query<ListingsParams>,
) -> MarketResult<Json<HomeSnapshot>> {
    info!("{:<12} --> listings {:?}", "Handler", params);
    let category = Category::parse_filter(params.category.as_deref())?;
    state.home.load(&state.backend, category, params.q).await?;
    Ok(Json(state.home.snapshot(&state.backend).await))
}

async fn handle_featured_next(State(state): State<AppState>) -> Json<HomeSnapshot> {
    state.home.advance_featured().await;
    Json(state.home.snapshot(&state.backend).await)
}

async fn handle_featured_prev(State(state): State<AppState>) -> Json<HomeSnapshot> {
    state.home.retreat_featured().await;
    Json(state.home.snapshot(&state.backend).await)
}

// endregion: --- Home Handlers

// region:    --- Listing Handlers

async fn handle_get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
) -> MarketResult<Json<DetailSnapshot>> {
    info!("{:<12} --> listing id: {}", "Handler", listing_id);
    let user = state.session.current_user();
    let mut detail = ListingDetail::new(&listing_id);
    detail.load(&state.backend).await?;
    Ok(Json(detail.snapshot(&state.backend, user.as_ref())))
}

/// Listing fields as posted in the `listing` multipart part.
#[derive(Debug, Deserialize)]
pub struct ListingForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub category: Category,
}

async fn handle_create_listing(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> MarketResult<(StatusCode, Json<Listing>)> {
    let user = state.session.require_user()?;
    info!("{:<12} --> create listing by {}", "Handler", user.id);

    let mut form: Option<ListingForm> = None;
    let mut images = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MarketError::Validation(format!("multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "listing" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| MarketError::Validation(format!("listing field: {}", e)))?;
                form = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| MarketError::Validation(format!("listing field: {}", e)))?,
                );
            }
            "image" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| MarketError::Validation(format!("image field: {}", e)))?;
                images.push(ImageUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let form = form.ok_or_else(|| {
        MarketError::Validation("missing 'listing' field in multipart form".to_string())
    })?;
    let fields = NewListing {
        title: form.title,
        description: form.description,
        price: form.price,
        category: form.category,
        seller_id: user.id,
        status: ListingStatus::Pending,
    };

    let listing = create_listing(&state.backend, fields, images).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

#[derive(Debug, Deserialize)]
pub struct BidForm {
    pub amount: String,
}

async fn handle_place_bid(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Json(form): Json<BidForm>,
) -> MarketResult<Json<DetailSnapshot>> {
    let user = state.session.current_user();
    info!(
        "{:<12} --> bid {:?} on {} by {:?}",
        "Handler",
        form.amount,
        listing_id,
        user.as_ref().map(|u| &u.id)
    );
    let mut detail = ListingDetail::new(&listing_id);
    detail.load(&state.backend).await?;
    detail.bid_input = form.amount;
    detail.submit_bid(&state.backend, user.as_ref()).await?;
    Ok(Json(detail.snapshot(&state.backend, user.as_ref())))
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub content: String,
}

async fn handle_send_message(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    Json(form): Json<MessageForm>,
) -> MarketResult<(StatusCode, Json<Message>)> {
    let user = state.session.current_user();
    info!("{:<12} --> message on {}", "Handler", listing_id);
    let mut detail = ListingDetail::new(&listing_id);
    detail.load(&state.backend).await?;
    detail.message_input = form.content;
    let message = detail.submit_message(&state.backend, user.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn handle_get_messages(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
) -> MarketResult<Json<Vec<Message>>> {
    let user = state.session.require_user()?;
    info!("{:<12} --> messages on {} for {}", "Handler", listing_id, user.id);
    Ok(Json(
        fetch_messages(&state.backend, &listing_id, &user.id).await?,
    ))
}

// endregion: --- Listing Handlers

// region:    --- Account Handlers

async fn handle_get_dashboard(State(state): State<AppState>) -> MarketResult<Json<Dashboard>> {
    let user = state.session.current_user();
    Ok(Json(load_dashboard(&state.backend, user.as_ref()).await?))
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: Option<User>,
}

async fn handle_get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(SessionView {
        user: state.session.current_user(),
    })
}

#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

async fn handle_sign_in(
    State(state): State<AppState>,
    Json(form): Json<SignInForm>,
) -> MarketResult<Json<SessionView>> {
    let user = state.session.sign_in(&form.email, &form.password).await?;
    Ok(Json(SessionView { user: Some(user) }))
}

async fn handle_sign_out(State(state): State<AppState>) -> MarketResult<StatusCode> {
    state.session.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Account Handlers
