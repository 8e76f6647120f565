use serde::Deserialize;
use serde_json::{json, Value};

use super::{RestaurantQuery, Store};
use crate::app::errors::AppError;
use crate::model::{
    Coordinates, Coupon, DishMatch, Favorite, LocationRow, MenuItem, NewOrder, NewReview,
    Notification, Order, OrderItem, Restaurant, RestaurantSummary, Review, Video,
};
use crate::supabase::SupabaseClient;

const NEARBY_RPC: &str = "get_nearby_restaurants";
const REDEEM_RPC: &str = "increment_coupon_redemption";

/// `Store` over Supabase's REST API.
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct RatingRow {
    rating: u8,
}

#[derive(Deserialize)]
struct FavoriteJoin {
    restaurant: Option<Restaurant>,
}

impl Store for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn active_restaurants(&self) -> Result<Vec<Restaurant>, AppError> {
        self.client
            .from("restaurants")
            .select("*")
            .eq("status", "active")
            .execute()
    }

    fn nearby_restaurants(&self, at: Coordinates) -> Result<Vec<Restaurant>, AppError> {
        let rows = self
            .client
            .rpc(NEARBY_RPC, &json!({ "user_lat": at.lat, "user_lng": at.lng }))?;

        match rows {
            Value::Null => Ok(Vec::new()),
            rows => Ok(serde_json::from_value(rows)?),
        }
    }

    fn restaurant(&self, id: &str) -> Result<Option<Restaurant>, AppError> {
        self.client.from("restaurants").select("*").eq("id", id).first()
    }

    fn query_restaurants(&self, query: &RestaurantQuery) -> Result<Vec<Restaurant>, AppError> {
        let mut q = self
            .client
            .from("restaurants")
            .select("*")
            .eq("status", "active");

        if !query.categories.is_empty() {
            q = q.overlaps("categories", &query.categories);
        }
        if !query.vibes.is_empty() {
            q = q.overlaps("tags", &query.vibes);
        }
        if let Some(price) = query.max_price {
            q = q.lte("price_level", price);
        }
        if let Some(city) = &query.city {
            q = q.eq("city", city);
        }
        if let Some(state) = &query.state {
            q = q.eq("state", state);
        }

        q.execute()
    }

    fn restaurants_by_ids(&self, ids: &[String]) -> Result<Vec<Restaurant>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .from("restaurants")
            .select("*")
            .in_("id", ids)
            .execute()
    }

    fn active_restaurants_by_ids(
        &self,
        ids: &[String],
        city: Option<&str>,
    ) -> Result<Vec<Restaurant>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut q = self
            .client
            .from("restaurants")
            .select("*")
            .in_("id", ids)
            .eq("status", "active");
        if let Some(city) = city {
            q = q.eq("city", city);
        }
        q.execute()
    }

    fn verified_restaurants(&self, limit: usize) -> Result<Vec<Restaurant>, AppError> {
        self.client
            .from("restaurants")
            .select("*")
            .eq("is_verified", true)
            .limit(limit)
            .execute()
    }

    fn restaurants_with_price(&self, level: u8, limit: usize) -> Result<Vec<Restaurant>, AppError> {
        self.client
            .from("restaurants")
            .select("*")
            .eq("price_level", level)
            .limit(limit)
            .execute()
    }

    fn location_rows(&self) -> Result<Vec<LocationRow>, AppError> {
        self.client
            .from("restaurants")
            .select("state,city,lat,lng")
            .eq("status", "active")
            .execute()
    }

    fn restaurant_summaries(&self) -> Result<Vec<RestaurantSummary>, AppError> {
        self.client
            .from("restaurants")
            .select("id,name,city,categories,attributes,description")
            .execute()
    }

    fn update_rating(&self, id: &str, rating_avg: f64, rating_count: u64) -> Result<(), AppError> {
        self.client
            .from("restaurants")
            .eq("id", id)
            .update::<_, Value>(&json!({
                "rating_avg": rating_avg,
                "rating_count": rating_count,
            }))?;
        Ok(())
    }

    fn match_dishes(&self, term: &str, limit: usize) -> Result<Vec<DishMatch>, AppError> {
        // commas and parentheses would break the `or` expression
        let term: String = term
            .chars()
            .filter(|c| !matches!(c, ',' | '(' | ')'))
            .collect();

        self.client
            .from("menu_items")
            .select("restaurant_id,name")
            .eq("is_active", true)
            .or(&format!(
                "name.ilike.*{term}*,description.ilike.*{term}*"
            ))
            .limit(limit)
            .execute()
    }

    fn menu_items(&self, restaurant_id: &str) -> Result<Vec<MenuItem>, AppError> {
        self.client
            .from("menu_items")
            .select("*")
            .eq("restaurant_id", restaurant_id)
            .eq("is_active", true)
            .order("category", true)
            .execute()
    }

    fn restaurant_videos(&self, restaurant_id: &str) -> Result<Vec<Video>, AppError> {
        self.client
            .from("videos")
            .select("*")
            .eq("restaurant_id", restaurant_id)
            .eq("status", "active")
            .execute()
    }

    fn reviews(&self, restaurant_id: &str) -> Result<Vec<Review>, AppError> {
        self.client
            .from("reviews")
            .select("*,user:users(name,avatar_url)")
            .eq("restaurant_id", restaurant_id)
            .order("created_at", false)
            .execute()
    }

    fn insert_review(&self, review: &NewReview) -> Result<Review, AppError> {
        self.client
            .from("reviews")
            .insert::<_, Review>(review)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unavailable("review insert returned no row".to_string()))
    }

    fn review_ratings(&self, restaurant_id: &str) -> Result<Vec<u8>, AppError> {
        let rows: Vec<RatingRow> = self
            .client
            .from("reviews")
            .select("rating")
            .eq("restaurant_id", restaurant_id)
            .execute()?;
        Ok(rows.into_iter().map(|r| r.rating).collect())
    }

    fn favorites(&self, user_id: &str) -> Result<Vec<Favorite>, AppError> {
        self.client
            .from("favorites")
            .select("*")
            .eq("user_id", user_id)
            .execute()
    }

    fn find_favorite(
        &self,
        user_id: &str,
        restaurant_id: &str,
    ) -> Result<Option<Favorite>, AppError> {
        self.client
            .from("favorites")
            .select("*")
            .eq("user_id", user_id)
            .eq("restaurant_id", restaurant_id)
            .first()
    }

    fn insert_favorite(&self, user_id: &str, restaurant_id: &str) -> Result<Favorite, AppError> {
        self.client
            .from("favorites")
            .insert::<_, Favorite>(&json!({ "user_id": user_id, "restaurant_id": restaurant_id }))?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unavailable("favorite insert returned no row".to_string()))
    }

    fn delete_favorite(&self, id: &str) -> Result<(), AppError> {
        self.client.from("favorites").eq("id", id).delete()
    }

    fn favorite_restaurants(&self, user_id: &str) -> Result<Vec<Restaurant>, AppError> {
        let rows: Vec<FavoriteJoin> = self
            .client
            .from("favorites")
            .select("restaurant:restaurants(*)")
            .eq("user_id", user_id)
            .execute()?;
        Ok(rows.into_iter().filter_map(|row| row.restaurant).collect())
    }

    fn active_coupons(&self, restaurant_id: &str, now: &str) -> Result<Vec<Coupon>, AppError> {
        self.client
            .from("coupons")
            .select("*")
            .eq("restaurant_id", restaurant_id)
            .eq("status", "active")
            .gte("valid_until", now)
            .execute()
    }

    fn coupon(&self, id: &str) -> Result<Option<Coupon>, AppError> {
        self.client.from("coupons").select("*").eq("id", id).first()
    }

    fn increment_coupon_redemption(&self, id: &str) -> Result<(), AppError> {
        self.client.rpc(REDEEM_RPC, &json!({ "coupon_id": id }))?;
        Ok(())
    }

    fn set_coupon_redemptions(&self, id: &str, count: u32) -> Result<(), AppError> {
        self.client
            .from("coupons")
            .eq("id", id)
            .update::<_, Value>(&json!({ "current_redemptions": count }))?;
        Ok(())
    }

    fn notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>, AppError> {
        self.client
            .from("notifications")
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", false)
            .limit(limit)
            .execute()
    }

    fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        self.client
            .from("notifications")
            .eq("id", id)
            .update::<_, Value>(&json!({ "is_read": true }))?;
        Ok(())
    }

    fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), AppError> {
        self.client
            .from("notifications")
            .eq("user_id", user_id)
            .eq("is_read", false)
            .update::<_, Value>(&json!({ "is_read": true }))?;
        Ok(())
    }

    fn unread_notifications(&self, user_id: &str) -> Result<u64, AppError> {
        self.client
            .from("notifications")
            .select("id")
            .eq("user_id", user_id)
            .eq("is_read", false)
            .count()
    }

    fn insert_order(&self, order: &NewOrder) -> Result<Order, AppError> {
        self.client
            .from("orders")
            .insert::<_, Order>(order)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unavailable("Falha ao criar pedido".to_string()))
    }

    fn insert_order_items(&self, items: &[OrderItem]) -> Result<(), AppError> {
        // ids are assigned by the database
        let rows: Vec<Value> = items
            .iter()
            .map(|item| {
                json!({
                    "order_id": item.order_id,
                    "menu_item_id": item.menu_item_id,
                    "quantity": item.quantity,
                    "unit_price": item.unit_price,
                    "special_instructions": item.special_instructions,
                })
            })
            .collect();

        self.client
            .from("order_items")
            .insert::<_, Value>(&rows)?;
        Ok(())
    }
}
