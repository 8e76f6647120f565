//! Domain types shared by the store, the remote clients and the HTTP API.
//!
//! Field names follow the `restaurants`, `reviews`, `coupons`, ... tables so
//! rows returned by PostgREST deserialize without any mapping layer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::utils::photos;

/// Treats an explicit JSON `null` the same way as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds coordinates only when both halves are present.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantPhoto {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_cover: bool,
}

/// Free-form attribute flags (`pet_friendly`, `wifi`, ...).
///
/// Stored as an open map because rows and AI interpretations both carry keys
/// outside the well-known set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(pub BTreeMap<String, Value>);

impl Attributes {
    pub const KNOWN: [&'static str; 10] = [
        "pet_friendly",
        "outdoor_seating",
        "wheelchair_accessible",
        "reservation_available",
        "delivery",
        "wifi",
        "parking",
        "vegan_options",
        "vegetarian_options",
        "live_music",
    ];

    /// Every well-known attribute set to `false`.
    pub fn all_false() -> Self {
        Self(
            Self::KNOWN
                .iter()
                .map(|key| (key.to_string(), Value::Bool(false)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// JavaScript-style truthiness of a single attribute.
    pub fn is_set(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn set(&mut self, key: &str, value: bool) {
        self.0.insert(key.to_string(), Value::Bool(value));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: String,
    pub close: String,
}

/// Opening hours in either of the two shapes found in the database.
///
/// The old shape keys `{open, close}` objects by Portuguese day name
/// (`segunda`, `terca`, ...). The new shape carries Google's
/// `weekday_descriptions` plus an optional `open_now` snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday_descriptions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,

    #[serde(flatten)]
    pub days: BTreeMap<String, Value>,
}

impl OpeningHours {
    pub fn day(&self, name: &str) -> Option<DayHours> {
        self.days
            .get(name)
            .and_then(|value| serde_json::from_value::<DayHours>(value.clone()).ok())
    }

    pub fn set_day(&mut self, name: &str, open: String, close: String) {
        self.days.insert(
            name.to_string(),
            serde_json::json!({ "open": open, "close": close }),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.weekday_descriptions.is_none() && self.open_now.is_none() && self.days.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestaurantStatus {
    #[default]
    Active,
    Pending,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restaurant {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_place_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub instagram: Option<String>,
    pub website: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub price_level: Option<u8>,
    #[serde(deserialize_with = "null_as_default")]
    pub rating_avg: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub rating_count: u64,
    #[serde(deserialize_with = "photos::deserialize")]
    pub photos: Vec<RestaurantPhoto>,
    #[serde(deserialize_with = "null_as_default")]
    pub opening_hours: OpeningHours,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Attributes,
    #[serde(deserialize_with = "null_as_default")]
    pub status: RestaurantStatus,
    #[serde(deserialize_with = "null_as_default")]
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_reviews: Option<Vec<Value>>,

    /// Dish name that pulled this restaurant into a search result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_dish: Option<String>,
}

impl Restaurant {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }

    pub fn is_active(&self) -> bool {
        self.status == RestaurantStatus::Active
    }

    pub fn is_from_places(&self) -> bool {
        self.id.starts_with("gplace_")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Rating,
    Distance,
    Price,
    #[default]
    #[serde(other)]
    Popularity,
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortBy::Rating => "rating",
            SortBy::Distance => "distance",
            SortBy::Price => "price",
            SortBy::Popularity => "popularity",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rating" => Ok(SortBy::Rating),
            "distance" => Ok(SortBy::Distance),
            "price" => Ok(SortBy::Price),
            "popularity" => Ok(SortBy::Popularity),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

/// Search filters, as sent by clients and as produced by the query
/// interpreter. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_perola: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_promotions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl SearchFilters {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub restaurants: Vec<Restaurant>,
    pub distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_interpretation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_upper(&self) -> &'static str {
        match self {
            ChatRole::User => "USER",
            ChatRole::Assistant => "ASSISTANT",
            ChatRole::System => "SYSTEM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_restaurants: Option<Vec<Restaurant>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    Percentage,
    Fixed,
    Freebie,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    #[default]
    Active,
    Expired,
    Paused,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coupon {
    pub id: String,
    pub restaurant_id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_order_value: Option<f64>,
    pub max_redemptions: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub current_redemptions: u32,
    pub valid_from: String,
    pub valid_until: String,
    pub status: CouponStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<Restaurant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ReviewAuthor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub user_id: String,
    pub restaurant_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// One menu item hit from the dish search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishMatch {
    pub restaurant_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Video {
    pub id: String,
    pub restaurant_id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: u32,
    pub views_count: u64,
    pub likes_count: u64,
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<Box<Restaurant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_photo: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Promo,
    NewRestaurant,
    ReviewReply,
    Badge,
    #[default]
    System,
    Tip,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub data: BTreeMap<String, Value>,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Delivering,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: String,
    pub restaurant_id: String,
    pub total_amount: f64,
    pub delivery_address: Option<String>,
    pub status: OrderStatus,
}

/// Line item as submitted by a client, before it belongs to an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub menu_item_id: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCategory {
    pub title: String,
    pub emoji: String,
    pub category_filter: String,
    pub restaurants: Vec<Restaurant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableLocation {
    pub state: String,
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCity {
    pub state: String,
    pub city: String,
    pub lat: f64,
    pub lng: f64,
}

/// Projection of `restaurants` used to build the location picker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRow {
    pub state: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Short restaurant description handed to the concierge as context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Attributes,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    pub highlights: Vec<Restaurant>,
    pub promotions: Vec<Coupon>,
    pub videos: Vec<Video>,
    pub rankings: Vec<RankedCategory>,
}
