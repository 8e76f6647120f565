//! Data access behind a trait, so the services run the same way against
//! Supabase and against the in-memory store used in mock mode and tests.

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

use crate::app::errors::AppError;
use crate::model::{
    Coordinates, Coupon, DishMatch, Favorite, LocationRow, MenuItem, NewOrder, NewReview,
    Notification, Order, OrderItem, Restaurant, RestaurantSummary, Review, Video,
};

/// Structured part of a restaurant search, pushed down to the store.
///
/// Only active restaurants are returned. `categories` and `vibes` match on
/// overlap (any shared element), `vibes` against the `tags` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantQuery {
    pub categories: Vec<String>,
    pub vibes: Vec<String>,
    pub max_price: Option<u8>,
    pub city: Option<String>,
    pub state: Option<String>,
}

pub trait Store: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    // restaurants

    fn active_restaurants(&self) -> Result<Vec<Restaurant>, AppError>;

    /// Restaurants around a point, nearest first, with `distance_meters` set.
    fn nearby_restaurants(&self, at: Coordinates) -> Result<Vec<Restaurant>, AppError>;

    fn restaurant(&self, id: &str) -> Result<Option<Restaurant>, AppError>;

    fn query_restaurants(&self, query: &RestaurantQuery) -> Result<Vec<Restaurant>, AppError>;

    /// Restaurants with the given ids regardless of status.
    fn restaurants_by_ids(&self, ids: &[String]) -> Result<Vec<Restaurant>, AppError>;

    /// Active restaurants with the given ids, optionally within one city.
    fn active_restaurants_by_ids(
        &self,
        ids: &[String],
        city: Option<&str>,
    ) -> Result<Vec<Restaurant>, AppError>;

    fn verified_restaurants(&self, limit: usize) -> Result<Vec<Restaurant>, AppError>;

    fn restaurants_with_price(&self, level: u8, limit: usize) -> Result<Vec<Restaurant>, AppError>;

    fn location_rows(&self) -> Result<Vec<LocationRow>, AppError>;

    fn restaurant_summaries(&self) -> Result<Vec<RestaurantSummary>, AppError>;

    fn update_rating(&self, id: &str, rating_avg: f64, rating_count: u64) -> Result<(), AppError>;

    // menu and media

    /// Active menu items whose name or description contains `term`.
    fn match_dishes(&self, term: &str, limit: usize) -> Result<Vec<DishMatch>, AppError>;

    /// Active menu items ordered by category.
    fn menu_items(&self, restaurant_id: &str) -> Result<Vec<MenuItem>, AppError>;

    fn restaurant_videos(&self, restaurant_id: &str) -> Result<Vec<Video>, AppError>;

    // reviews

    /// Newest first, with the author joined in.
    fn reviews(&self, restaurant_id: &str) -> Result<Vec<Review>, AppError>;

    fn insert_review(&self, review: &NewReview) -> Result<Review, AppError>;

    fn review_ratings(&self, restaurant_id: &str) -> Result<Vec<u8>, AppError>;

    // favorites

    fn favorites(&self, user_id: &str) -> Result<Vec<Favorite>, AppError>;

    fn find_favorite(&self, user_id: &str, restaurant_id: &str)
        -> Result<Option<Favorite>, AppError>;

    fn insert_favorite(&self, user_id: &str, restaurant_id: &str) -> Result<Favorite, AppError>;

    fn delete_favorite(&self, id: &str) -> Result<(), AppError>;

    fn favorite_restaurants(&self, user_id: &str) -> Result<Vec<Restaurant>, AppError>;

    // coupons

    /// Active coupons of a restaurant with `valid_until >= now` (RFC 3339).
    fn active_coupons(&self, restaurant_id: &str, now: &str) -> Result<Vec<Coupon>, AppError>;

    fn coupon(&self, id: &str) -> Result<Option<Coupon>, AppError>;

    /// Server-side atomic increment.
    fn increment_coupon_redemption(&self, id: &str) -> Result<(), AppError>;

    fn set_coupon_redemptions(&self, id: &str, count: u32) -> Result<(), AppError>;

    // notifications

    /// Newest first.
    fn notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>, AppError>;

    fn mark_notification_read(&self, id: &str) -> Result<(), AppError>;

    fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), AppError>;

    fn unread_notifications(&self, user_id: &str) -> Result<u64, AppError>;

    // orders

    fn insert_order(&self, order: &NewOrder) -> Result<Order, AppError>;

    fn insert_order_items(&self, items: &[OrderItem]) -> Result<(), AppError>;
}
