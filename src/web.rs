use crate::{
    app::{App, AppError},
    chat::ChatReply,
    config::Config,
    feed::RestaurantDetails,
    gemini::GeminiProxy,
    model::{
        AvailableLocation, ChatMessage, Coordinates, Coupon, Favorite, HomeFeed, MenuItem,
        NearestCity, NewOrderItem, NewReview, Notification, Order, RankedCategory, Restaurant,
        Review, SearchFilters, SearchResult, Video,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::signal;

pub struct SharedState {
    pub app: App,
    /// Backs `/api/gemini-proxy`. Requires `GEMINI_API_KEY`.
    pub gemini: Option<GeminiProxy>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/restaurants", get(restaurants))
        .route("/api/restaurants/:id", get(restaurant))
        .route("/api/restaurants/:id/menu", get(menu))
        .route("/api/restaurants/:id/videos", get(restaurant_videos))
        .route("/api/restaurants/:id/reviews", get(reviews).post(add_review))
        .route("/api/restaurants/:id/coupons", get(coupons))
        .route("/api/feed", get(feed))
        .route("/api/feed/highlights", get(highlights))
        .route("/api/feed/promotions", get(promotions))
        .route("/api/feed/videos", get(videos))
        .route("/api/feed/rankings", get(rankings))
        .route("/api/locations", get(locations))
        .route("/api/locations/nearest", get(nearest_location))
        .route("/api/chat", post(chat))
        .route("/api/users/:user_id/favorites", get(favorites))
        .route(
            "/api/users/:user_id/favorites/restaurants",
            get(favorite_restaurants),
        )
        .route(
            "/api/users/:user_id/favorites/:restaurant_id",
            post(toggle_favorite),
        )
        .route("/api/coupons/:id/redeem", post(redeem_coupon))
        .route("/api/users/:user_id/notifications", get(notifications))
        .route(
            "/api/users/:user_id/notifications/unread",
            get(unread_notifications),
        )
        .route(
            "/api/users/:user_id/notifications/read",
            post(mark_all_notifications_read),
        )
        .route("/api/notifications/:id/read", post(mark_notification_read))
        .route("/api/orders", post(place_order))
        .route("/api/gemini-proxy", post(gemini_proxy))
        .route("/api/config", get(get_config))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn start_app(state: SharedState) -> anyhow::Result<()> {
    let addr = state.app.config.listen_addr.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: App, gemini: Option<GeminiProxy>) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(SharedState { app, gemini }).await })
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::NotFound => axum::http::StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => {
                log::warn!("{self:?}");
                axum::http::StatusCode::SERVICE_UNAVAILABLE
            }
            err if err.is_upstream() => {
                log::error!("{self:?}");
                axum::http::StatusCode::BAD_GATEWAY
            }
            _ => {
                log::error!("{self:?}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Optional `?lat=..&lng=..`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl LocationQuery {
    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchFilters>,
) -> Result<Json<SearchResult>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || Ok(state.app.search_restaurants(payload).into()))
}

async fn restaurants(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<Vec<Restaurant>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.restaurants(location.coordinates()).into()))
}

async fn restaurant(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<RestaurantDetails>, HttpError> {
    tokio::task::block_in_place(move || {
        state
            .app
            .restaurant_details(&id)
            .map(Into::into)
            .ok_or(HttpError(AppError::NotFound))
    })
}

async fn menu(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MenuItem>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.menu_items(&id).into()))
}

async fn restaurant_videos(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Video>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.restaurant_videos(&id).into()))
}

async fn reviews(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.reviews(&id).into()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddReviewRequest {
    pub user_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub menu_item_id: Option<String>,
    pub photo_url: Option<String>,
}

async fn add_review(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    Json(payload): Json<AddReviewRequest>,
) -> Result<Json<Review>, HttpError> {
    log::debug!("payload: {payload:?}");

    let review = NewReview {
        user_id: payload.user_id,
        restaurant_id: id,
        rating: payload.rating,
        comment: payload.comment,
        menu_item_id: payload.menu_item_id,
        photo_url: payload.photo_url,
    };

    tokio::task::block_in_place(move || {
        state
            .app
            .add_review(review)
            .map(Into::into)
            .map_err(Into::into)
    })
}

async fn coupons(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Coupon>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.coupons_for_restaurant(&id).into()))
}

async fn feed(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<HomeFeed>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.home_feed(location.coordinates()).into()))
}

async fn highlights(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<Vec<Restaurant>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.highlights(location.coordinates()).into()))
}

async fn promotions(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<Vec<Coupon>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.promotions(location.coordinates()).into()))
}

async fn videos(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<Vec<Video>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.videos(location.coordinates()).into()))
}

async fn rankings(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<Vec<RankedCategory>>, HttpError> {
    tokio::task::block_in_place(move || {
        Ok(state.app.ranked_categories(location.coordinates()).into())
    })
}

async fn locations(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<Vec<AvailableLocation>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.available_locations().into()))
}

async fn nearest_location(
    State(state): State<Arc<SharedState>>,
    Query(location): Query<LocationQuery>,
) -> Result<Json<NearestCity>, HttpError> {
    let at = location
        .coordinates()
        .ok_or_else(|| AppError::invalid_input("lat and lng are required"))?;

    tokio::task::block_in_place(move || Ok(state.app.nearest_city(at).into()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

async fn chat(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, HttpError> {
    log::debug!("chat with {} messages", payload.messages.len());

    tokio::task::block_in_place(move || {
        state
            .app
            .chat_with_assistant(&payload.messages)
            .map(Into::into)
            .map_err(Into::into)
    })
}

async fn favorites(
    State(state): State<Arc<SharedState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Favorite>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.favorites(&user_id).into()))
}

async fn favorite_restaurants(
    State(state): State<Arc<SharedState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Restaurant>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.favorite_restaurants(&user_id).into()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavoriteResponse {
    pub added: bool,
}

async fn toggle_favorite(
    State(state): State<Arc<SharedState>>,
    Path((user_id, restaurant_id)): Path<(String, String)>,
) -> Result<Json<ToggleFavoriteResponse>, HttpError> {
    tokio::task::block_in_place(move || {
        let added = state.app.toggle_favorite(&user_id, &restaurant_id)?;
        Ok(ToggleFavoriteResponse { added }.into())
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub redeemed: bool,
}

async fn redeem_coupon(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<Json<RedeemResponse>, HttpError> {
    tokio::task::block_in_place(move || {
        Ok(RedeemResponse {
            redeemed: state.app.redeem_coupon(&id),
        }
        .into())
    })
}

async fn notifications(
    State(state): State<Arc<SharedState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Notification>>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.app.notifications(&user_id).into()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub count: u64,
}

async fn unread_notifications(
    State(state): State<Arc<SharedState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UnreadResponse>, HttpError> {
    tokio::task::block_in_place(move || {
        Ok(UnreadResponse {
            count: state.app.unread_count(&user_id),
        }
        .into())
    })
}

async fn mark_all_notifications_read(
    State(state): State<Arc<SharedState>>,
    Path(user_id): Path<String>,
) -> Result<(), HttpError> {
    tokio::task::block_in_place(move || state.app.mark_all_as_read(&user_id).map_err(Into::into))
}

async fn mark_notification_read(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<(), HttpError> {
    tokio::task::block_in_place(move || state.app.mark_as_read(&id).map_err(Into::into))
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: String,
    pub restaurant_id: String,
    pub total_amount: f64,
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
}

async fn place_order(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<Order>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        state
            .app
            .place_order(
                &payload.user_id,
                &payload.restaurant_id,
                payload.total_amount,
                payload.delivery_address,
                payload.items,
            )
            .map(Into::into)
            .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiProxyRequest {
    pub prompt: String,
}

async fn gemini_proxy(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<GeminiProxyRequest>,
) -> Result<Json<Value>, HttpError> {
    tokio::task::block_in_place(move || {
        let gemini = state
            .gemini
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("GEMINI_API_KEY is not set".to_string()))?;

        let models = &state.app.config.gemini.proxy_models;
        Ok(gemini.answer(&payload.prompt, models)?.into())
    })
}

async fn get_config(State(state): State<Arc<SharedState>>) -> Result<Json<Config>, HttpError> {
    Ok(state.app.config().clone().into())
}
