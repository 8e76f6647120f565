use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{RestaurantQuery, Store};
use crate::app::errors::AppError;
use crate::eid::Eid;
use crate::model::{
    Coordinates, Coupon, CouponStatus, DishMatch, Favorite, LocationRow, MenuItem, NewOrder,
    NewReview, Notification, Order, OrderItem, Restaurant, RestaurantSummary, Review, Video,
};
use crate::utils::geo;

/// Tables held by the memory store. Also the shape of the mock data fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryData {
    pub restaurants: Vec<Restaurant>,
    pub menu_items: Vec<MenuItem>,
    pub videos: Vec<Video>,
    pub reviews: Vec<Review>,
    pub favorites: Vec<Favorite>,
    pub coupons: Vec<Coupon>,
    pub notifications: Vec<Notification>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
}

/// `Store` kept in process memory.
///
/// Serves mock mode and tests. There is no RPC layer, so
/// `increment_coupon_redemption` always fails and callers take their manual
/// path.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn overlaps(have: &[String], want: &[String]) -> bool {
    have.iter().any(|v| want.contains(v))
}

impl MemoryStore {
    pub fn new(data: MemoryData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let data: MemoryData = serde_json::from_slice(&bytes)?;
        log::info!(
            "loaded mock data from {path}: {} restaurants",
            data.restaurants.len()
        );
        Ok(Self::new(data))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryData>, AppError> {
        self.data
            .read()
            .map_err(|_| AppError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryData>, AppError> {
        self.data
            .write()
            .map_err(|_| AppError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn active(&self) -> Result<Vec<Restaurant>, AppError> {
        Ok(self
            .read()?
            .restaurants
            .iter()
            .filter(|r| r.is_active())
            .cloned()
            .collect())
    }

    /// Snapshot of the tables.
    #[cfg(test)]
    pub fn dump(&self) -> Result<MemoryData, AppError> {
        Ok(self.read()?.clone())
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn active_restaurants(&self) -> Result<Vec<Restaurant>, AppError> {
        self.active()
    }

    fn nearby_restaurants(&self, at: Coordinates) -> Result<Vec<Restaurant>, AppError> {
        let mut rows: Vec<Restaurant> = self
            .active()?
            .into_iter()
            .filter_map(|mut r| {
                let km = geo::distance_km(at, r.coordinates()?);
                r.distance_meters = Some((km * 1000.0).round());
                Some(r)
            })
            .collect();

        rows.sort_by(|a, b| {
            a.distance_meters
                .partial_cmp(&b.distance_meters)
                .unwrap_or(Ordering::Equal)
        });
        Ok(rows)
    }

    fn restaurant(&self, id: &str) -> Result<Option<Restaurant>, AppError> {
        Ok(self.read()?.restaurants.iter().find(|r| r.id == id).cloned())
    }

    fn query_restaurants(&self, query: &RestaurantQuery) -> Result<Vec<Restaurant>, AppError> {
        Ok(self
            .active()?
            .into_iter()
            .filter(|r| query.categories.is_empty() || overlaps(&r.categories, &query.categories))
            .filter(|r| query.vibes.is_empty() || overlaps(&r.tags, &query.vibes))
            .filter(|r| match (query.max_price, r.price_level) {
                (Some(max), Some(level)) => level <= max,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|r| query.city.as_deref().map_or(true, |c| r.city == c))
            .filter(|r| query.state.as_deref().map_or(true, |s| r.state == s))
            .collect())
    }

    fn restaurants_by_ids(&self, ids: &[String]) -> Result<Vec<Restaurant>, AppError> {
        Ok(self
            .read()?
            .restaurants
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    fn active_restaurants_by_ids(
        &self,
        ids: &[String],
        city: Option<&str>,
    ) -> Result<Vec<Restaurant>, AppError> {
        Ok(self
            .active()?
            .into_iter()
            .filter(|r| ids.contains(&r.id))
            .filter(|r| city.map_or(true, |c| r.city == c))
            .collect())
    }

    fn verified_restaurants(&self, limit: usize) -> Result<Vec<Restaurant>, AppError> {
        Ok(self
            .read()?
            .restaurants
            .iter()
            .filter(|r| r.is_verified)
            .take(limit)
            .cloned()
            .collect())
    }

    fn restaurants_with_price(&self, level: u8, limit: usize) -> Result<Vec<Restaurant>, AppError> {
        Ok(self
            .read()?
            .restaurants
            .iter()
            .filter(|r| r.price_level == Some(level))
            .take(limit)
            .cloned()
            .collect())
    }

    fn location_rows(&self) -> Result<Vec<LocationRow>, AppError> {
        Ok(self
            .active()?
            .into_iter()
            .map(|r| LocationRow {
                state: Some(r.state).filter(|s| !s.is_empty()),
                city: Some(r.city).filter(|c| !c.is_empty()),
                lat: r.lat,
                lng: r.lng,
            })
            .collect())
    }

    fn restaurant_summaries(&self) -> Result<Vec<RestaurantSummary>, AppError> {
        Ok(self
            .read()?
            .restaurants
            .iter()
            .map(|r| RestaurantSummary {
                id: r.id.clone(),
                name: r.name.clone(),
                city: r.city.clone(),
                categories: r.categories.clone(),
                attributes: r.attributes.clone(),
                description: r.description.clone(),
            })
            .collect())
    }

    fn update_rating(&self, id: &str, rating_avg: f64, rating_count: u64) -> Result<(), AppError> {
        let mut data = self.write()?;
        if let Some(r) = data.restaurants.iter_mut().find(|r| r.id == id) {
            r.rating_avg = rating_avg;
            r.rating_count = rating_count;
            r.updated_at = now();
        }
        Ok(())
    }

    fn match_dishes(&self, term: &str, limit: usize) -> Result<Vec<DishMatch>, AppError> {
        Ok(self
            .read()?
            .menu_items
            .iter()
            .filter(|m| m.is_active)
            .filter(|m| {
                contains_ci(&m.name, term)
                    || m.description.as_deref().map_or(false, |d| contains_ci(d, term))
            })
            .take(limit)
            .map(|m| DishMatch {
                restaurant_id: m.restaurant_id.clone(),
                name: m.name.clone(),
            })
            .collect())
    }

    fn menu_items(&self, restaurant_id: &str) -> Result<Vec<MenuItem>, AppError> {
        let mut items: Vec<MenuItem> = self
            .read()?
            .menu_items
            .iter()
            .filter(|m| m.restaurant_id == restaurant_id && m.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(items)
    }

    fn restaurant_videos(&self, restaurant_id: &str) -> Result<Vec<Video>, AppError> {
        Ok(self
            .read()?
            .videos
            .iter()
            .filter(|v| v.restaurant_id == restaurant_id && v.status == "active")
            .cloned()
            .collect())
    }

    fn reviews(&self, restaurant_id: &str) -> Result<Vec<Review>, AppError> {
        let mut reviews: Vec<Review> = self
            .read()?
            .reviews
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    fn insert_review(&self, review: &NewReview) -> Result<Review, AppError> {
        let row = Review {
            id: Eid::new().to_string(),
            user_id: review.user_id.clone(),
            restaurant_id: review.restaurant_id.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            menu_item_id: review.menu_item_id.clone(),
            photo_url: review.photo_url.clone(),
            created_at: now(),
            user: None,
        };
        self.write()?.reviews.push(row.clone());
        Ok(row)
    }

    fn review_ratings(&self, restaurant_id: &str) -> Result<Vec<u8>, AppError> {
        Ok(self
            .read()?
            .reviews
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id)
            .map(|r| r.rating)
            .collect())
    }

    fn favorites(&self, user_id: &str) -> Result<Vec<Favorite>, AppError> {
        Ok(self
            .read()?
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_favorite(
        &self,
        user_id: &str,
        restaurant_id: &str,
    ) -> Result<Option<Favorite>, AppError> {
        Ok(self
            .read()?
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.restaurant_id == restaurant_id)
            .cloned())
    }

    fn insert_favorite(&self, user_id: &str, restaurant_id: &str) -> Result<Favorite, AppError> {
        let row = Favorite {
            id: Eid::with_prefix("fav").to_string(),
            user_id: user_id.to_string(),
            restaurant_id: restaurant_id.to_string(),
            created_at: now(),
            restaurant: None,
        };
        self.write()?.favorites.push(row.clone());
        Ok(row)
    }

    fn delete_favorite(&self, id: &str) -> Result<(), AppError> {
        self.write()?.favorites.retain(|f| f.id != id);
        Ok(())
    }

    fn favorite_restaurants(&self, user_id: &str) -> Result<Vec<Restaurant>, AppError> {
        let data = self.read()?;
        Ok(data
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| data.restaurants.iter().find(|r| r.id == f.restaurant_id))
            .cloned()
            .collect())
    }

    fn active_coupons(&self, restaurant_id: &str, now: &str) -> Result<Vec<Coupon>, AppError> {
        Ok(self
            .read()?
            .coupons
            .iter()
            .filter(|c| c.restaurant_id == restaurant_id)
            .filter(|c| c.status == CouponStatus::Active)
            .filter(|c| c.valid_until.as_str() >= now)
            .cloned()
            .collect())
    }

    fn coupon(&self, id: &str) -> Result<Option<Coupon>, AppError> {
        Ok(self.read()?.coupons.iter().find(|c| c.id == id).cloned())
    }

    fn increment_coupon_redemption(&self, _id: &str) -> Result<(), AppError> {
        Err(AppError::Unavailable(
            "increment_coupon_redemption is not available in memory".to_string(),
        ))
    }

    fn set_coupon_redemptions(&self, id: &str, count: u32) -> Result<(), AppError> {
        let mut data = self.write()?;
        if let Some(c) = data.coupons.iter_mut().find(|c| c.id == id) {
            c.current_redemptions = count;
        }
        Ok(())
    }

    fn notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>, AppError> {
        let mut rows: Vec<Notification> = self
            .read()?
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        let mut data = self.write()?;
        if let Some(n) = data.notifications.iter_mut().find(|n| n.id == id) {
            n.is_read = true;
        }
        Ok(())
    }

    fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), AppError> {
        self.write()?
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .for_each(|n| n.is_read = true);
        Ok(())
    }

    fn unread_notifications(&self, user_id: &str) -> Result<u64, AppError> {
        Ok(self
            .read()?
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    fn insert_order(&self, order: &NewOrder) -> Result<Order, AppError> {
        let row = Order {
            id: Eid::new().to_string(),
            user_id: order.user_id.clone(),
            restaurant_id: order.restaurant_id.clone(),
            status: order.status,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address.clone(),
            created_at: now(),
        };
        self.write()?.orders.push(row.clone());
        Ok(row)
    }

    fn insert_order_items(&self, items: &[OrderItem]) -> Result<(), AppError> {
        let mut data = self.write()?;
        for item in items {
            let mut item = item.clone();
            if item.id.is_empty() {
                item.id = Eid::new().to_string();
            }
            data.order_items.push(item);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RestaurantStatus;

    fn restaurant(id: &str, city: &str, categories: &[&str], price: u8) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: format!("R {id}"),
            city: city.to_string(),
            state: "SP".to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            price_level: Some(price),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_restaurants_filters() {
        let mut inactive = restaurant("c", "Taubaté", &["Pizzaria"], 1);
        inactive.status = RestaurantStatus::Inactive;

        let store = MemoryStore::new(MemoryData {
            restaurants: vec![
                restaurant("a", "Taubaté", &["Pizzaria"], 2),
                restaurant("b", "Taubaté", &["Japonesa"], 3),
                inactive,
                restaurant("d", "Pindamonhangaba", &["Pizzaria", "Bar"], 1),
            ],
            ..Default::default()
        });

        let query = RestaurantQuery {
            categories: vec!["Pizzaria".to_string()],
            ..Default::default()
        };
        let ids: Vec<String> = store
            .query_restaurants(&query)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "d"]);

        let query = RestaurantQuery {
            max_price: Some(2),
            city: Some("Taubaté".to_string()),
            ..Default::default()
        };
        let ids: Vec<String> = store
            .query_restaurants(&query)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_nearby_sorted_by_distance() {
        let mut near = restaurant("near", "Taubaté", &[], 1);
        near.lat = Some(-23.02);
        near.lng = Some(-45.55);
        let mut far = restaurant("far", "São Paulo", &[], 1);
        far.lat = Some(-23.55);
        far.lng = Some(-46.63);
        let nowhere = restaurant("nowhere", "Taubaté", &[], 1);

        let store = MemoryStore::new(MemoryData {
            restaurants: vec![far, nowhere, near],
            ..Default::default()
        });

        let rows = store
            .nearby_restaurants(Coordinates::new(-23.023419, -45.556276))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "near");
        assert!(rows[0].distance_meters.unwrap() < 1000.0);
        assert_eq!(rows[1].id, "far");
    }

    #[test]
    fn test_match_dishes_case_insensitive() {
        let store = MemoryStore::new(MemoryData {
            menu_items: vec![
                MenuItem {
                    id: "m1".to_string(),
                    restaurant_id: "a".to_string(),
                    name: "Pizza Margherita".to_string(),
                    is_active: true,
                    ..Default::default()
                },
                MenuItem {
                    id: "m2".to_string(),
                    restaurant_id: "b".to_string(),
                    name: "Calzone".to_string(),
                    description: Some("massa de pizza recheada".to_string()),
                    is_active: true,
                    ..Default::default()
                },
                MenuItem {
                    id: "m3".to_string(),
                    restaurant_id: "c".to_string(),
                    name: "Pizza doce".to_string(),
                    is_active: false,
                    ..Default::default()
                },
            ],
            ..Default::default()
        });

        let matches = store.match_dishes("PIZZA", 30).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].restaurant_id, "a");
        assert_eq!(matches[1].restaurant_id, "b");
    }
}
