//! Restaurant listings and the home feed.
//!
//! Promotions and videos are synthesized from restaurant rows until the
//! catalogue carries real ones.

use chrono::{Duration, Local, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::app::App;
use crate::model::{
    AvailableLocation, City, Coordinates, Coupon, CouponStatus, DiscountType, HomeFeed, MenuItem,
    NearestCity, RankedCategory, Restaurant, Video,
};
use crate::utils::hours::{self, OpenStatus};
use crate::utils::{geo, highlight, photos, pricing};

const HIGHLIGHTS: usize = 5;
const PROMOTIONS: usize = 5;
const VIDEOS: usize = 10;
const RANKING_SIZE: usize = 5;
const RANKING_MIN: usize = 2;

struct Ranking {
    title: &'static str,
    emoji: &'static str,
    category: &'static str,
}

const RANKINGS: [Ranking; 5] = [
    Ranking { title: "Top 5 Pizzarias", emoji: "🍕", category: "Pizzaria" },
    Ranking { title: "Melhores Avaliados", emoji: "⭐", category: "" },
    Ranking { title: "Top 5 Hamburguerias", emoji: "🍔", category: "Hamburgueria" },
    Ranking { title: "Top 5 Japonesa", emoji: "🍣", category: "Japonesa" },
    Ranking { title: "Top 5 Bares", emoji: "🍺", category: "Bar" },
];

/// Terms of a synthesized promotion.
struct Offer {
    code: &'static str,
    discount: f64,
    redeemed: u32,
    brasileira: &'static str,
    other: &'static str,
}

const NEARBY_OFFER: Offer = Offer {
    code: "DEGUSTE20",
    discount: 20.0,
    redeemed: 12,
    brasileira: "Almoço completo com desconto",
    other: "Desconto especial em todo cardápio",
};

const CATALOGUE_OFFER: Offer = Offer {
    code: "DEGUSTE15",
    discount: 15.0,
    redeemed: 5,
    brasileira: "Desconto especial",
    other: "Desconto especial",
};

const HOME_OFFER: Offer = Offer {
    code: "DEGUSTE20",
    discount: 20.0,
    redeemed: 12,
    brasileira: "Almoço com desconto",
    other: "Desconto especial",
};

fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn by_rating_desc(a: &Restaurant, b: &Restaurant) -> Ordering {
    b.rating_avg
        .partial_cmp(&a.rating_avg)
        .unwrap_or(Ordering::Equal)
}

fn promotion(restaurant: &Restaurant, offer: &Offer) -> Coupon {
    let now = Utc::now();
    let description = if restaurant.categories.iter().any(|c| c == "Brasileira") {
        offer.brasileira
    } else {
        offer.other
    };

    Coupon {
        id: format!("promo-{}", restaurant.id),
        restaurant_id: restaurant.id.clone(),
        code: offer.code.to_string(),
        title: format!("Oferta em {}", restaurant.name),
        description: description.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: offer.discount,
        min_order_value: Some(30.0),
        max_redemptions: Some(100),
        current_redemptions: offer.redeemed,
        valid_from: timestamp(now),
        valid_until: timestamp(now + Duration::hours(24)),
        status: CouponStatus::Active,
        created_at: timestamp(now),
    }
}

/// Best-rated price level 1 restaurants as coupons.
fn cheap_promotions(restaurants: &[Restaurant], offer: &Offer) -> Vec<Coupon> {
    let mut cheap: Vec<&Restaurant> = restaurants
        .iter()
        .filter(|r| r.price_level == Some(1))
        .collect();
    cheap.sort_by(|a, b| by_rating_desc(a, b));

    cheap
        .into_iter()
        .take(PROMOTIONS)
        .map(|r| promotion(r, offer))
        .collect()
}

fn photo_video(restaurant: &Restaurant) -> Video {
    let thumbnail_url = restaurant
        .photos
        .first()
        .map(|p| p.url.as_str())
        .filter(|url| !url.is_empty())
        .unwrap_or(photos::DEFAULT_THUMBNAIL)
        .to_string();

    let category = restaurant
        .categories
        .first()
        .map(String::as_str)
        .unwrap_or("Lugar");

    Video {
        id: format!("video-{}", restaurant.id),
        restaurant_id: restaurant.id.clone(),
        title: format!("Melhor {category} da Cidade?"),
        description: Some(format!("Fomos conhecer o famoso {}!", restaurant.name)),
        video_url: String::new(),
        thumbnail_url,
        duration_seconds: 15,
        views_count: restaurant.rating_count * 153,
        likes_count: restaurant.rating_count * 12,
        tags: restaurant
            .categories
            .iter()
            .take(3)
            .map(|c| c.to_lowercase())
            .collect(),
        status: "active".to_string(),
        created_at: timestamp(Utc::now()),
        restaurant: Some(Box::new(restaurant.clone())),
        is_photo: Some(true),
    }
}

/// The most rated restaurants presented as photo posts.
fn famous_videos(restaurants: &[Restaurant]) -> Vec<Video> {
    let mut famous: Vec<&Restaurant> = restaurants.iter().collect();
    famous.sort_by(|a, b| b.rating_count.cmp(&a.rating_count));
    famous.into_iter().take(VIDEOS).map(photo_video).collect()
}

/// A restaurant row with the values a detail page derives from it.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantDetails {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub cover_photo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<&'static str>,
    pub open_status: OpenStatus,
}

impl RestaurantDetails {
    pub fn new(restaurant: Restaurant, at: NaiveDateTime) -> Self {
        Self {
            cover_photo_url: photos::cover_photo_url(&restaurant.photos),
            price_range: restaurant
                .price_level
                .map(pricing::range_text)
                .filter(|text| !text.is_empty()),
            highlight: highlight::prominent(&restaurant.attributes),
            open_status: hours::open_status(&restaurant.opening_hours, at),
            restaurant,
        }
    }
}

pub fn rank_categories(restaurants: &[Restaurant]) -> Vec<RankedCategory> {
    RANKINGS
        .iter()
        .filter_map(|ranking| {
            let needle = ranking.category.to_lowercase();
            let mut top: Vec<Restaurant> = restaurants
                .iter()
                .filter(|r| {
                    needle.is_empty()
                        || r.categories
                            .iter()
                            .any(|c| c.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect();
            top.sort_by(by_rating_desc);
            top.truncate(RANKING_SIZE);

            (top.len() >= RANKING_MIN).then(|| RankedCategory {
                title: ranking.title.to_string(),
                emoji: ranking.emoji.to_string(),
                category_filter: ranking.category.to_string(),
                restaurants: top,
            })
        })
        .collect()
}

/// Groups `(state, city, lat, lng)` rows; the first coordinates seen for a
/// city win. Rows missing any part are skipped.
pub fn group_locations(rows: &[crate::model::LocationRow]) -> Vec<AvailableLocation> {
    let mut states: BTreeMap<&str, BTreeMap<&str, (f64, f64)>> = BTreeMap::new();

    for row in rows {
        let (Some(state), Some(city), Some(lat), Some(lng)) =
            (row.state.as_deref(), row.city.as_deref(), row.lat, row.lng)
        else {
            continue;
        };
        if state.is_empty() || city.is_empty() {
            continue;
        }
        states
            .entry(state)
            .or_default()
            .entry(city)
            .or_insert((lat, lng));
    }

    states
        .into_iter()
        .map(|(state, cities)| AvailableLocation {
            state: state.to_string(),
            cities: cities
                .into_iter()
                .map(|(name, (lat, lng))| City {
                    name: name.to_string(),
                    lat,
                    lng,
                })
                .collect(),
        })
        .collect()
}

impl App {
    /// Nearby restaurants with coordinates, every active one otherwise.
    pub fn restaurants(&self, at: Option<Coordinates>) -> Vec<Restaurant> {
        let result = match at {
            Some(at) => self.store.nearby_restaurants(at),
            None => self.store.active_restaurants(),
        };

        result.unwrap_or_else(|err| {
            log::error!("error fetching restaurants (near {at:?}): {err}");
            Vec::new()
        })
    }

    pub fn restaurant_by_id(&self, id: &str) -> Option<Restaurant> {
        self.store.restaurant(id).unwrap_or_else(|err| {
            log::warn!("error fetching restaurant {id}: {err}");
            None
        })
    }

    /// `restaurant_by_id` plus cover photo, price band, highlight and
    /// whether it is open right now.
    pub fn restaurant_details(&self, id: &str) -> Option<RestaurantDetails> {
        self.restaurant_by_id(id)
            .map(|r| RestaurantDetails::new(r, Local::now().naive_local()))
    }

    pub fn menu_items(&self, restaurant_id: &str) -> Vec<MenuItem> {
        self.store.menu_items(restaurant_id).unwrap_or_else(|err| {
            log::error!("error fetching menu items: {err}");
            Vec::new()
        })
    }

    pub fn restaurant_videos(&self, restaurant_id: &str) -> Vec<Video> {
        self.store
            .restaurant_videos(restaurant_id)
            .unwrap_or_else(|err| {
                log::error!("error fetching restaurant videos: {err}");
                Vec::new()
            })
    }

    pub fn highlights(&self, at: Option<Coordinates>) -> Vec<Restaurant> {
        match at {
            Some(_) => self
                .restaurants(at)
                .into_iter()
                .filter(|r| r.is_verified)
                .take(HIGHLIGHTS)
                .collect(),
            None => self
                .store
                .verified_restaurants(HIGHLIGHTS)
                .unwrap_or_else(|err| {
                    log::error!("error fetching highlights: {err}");
                    Vec::new()
                }),
        }
    }

    pub fn promotions(&self, at: Option<Coordinates>) -> Vec<Coupon> {
        match at {
            Some(_) => cheap_promotions(&self.restaurants(at), &NEARBY_OFFER),
            None => self
                .store
                .restaurants_with_price(1, PROMOTIONS)
                .map(|rows| rows.iter().map(|r| promotion(r, &CATALOGUE_OFFER)).collect())
                .unwrap_or_else(|err| {
                    log::error!("error fetching cheap restaurants: {err}");
                    Vec::new()
                }),
        }
    }

    pub fn videos(&self, at: Option<Coordinates>) -> Vec<Video> {
        famous_videos(&self.restaurants(at))
    }

    pub fn ranked_categories(&self, at: Option<Coordinates>) -> Vec<RankedCategory> {
        rank_categories(&self.restaurants(at))
    }

    /// Highlights, promotions, videos and rankings from a single listing.
    pub fn home_feed(&self, at: Option<Coordinates>) -> HomeFeed {
        let all = self.restaurants(at);

        HomeFeed {
            highlights: all
                .iter()
                .filter(|r| r.is_verified)
                .take(HIGHLIGHTS)
                .cloned()
                .collect(),
            promotions: cheap_promotions(&all, &HOME_OFFER),
            videos: famous_videos(&all),
            rankings: rank_categories(&all),
        }
    }

    pub fn available_locations(&self) -> Vec<AvailableLocation> {
        match self.store.location_rows() {
            Ok(rows) => group_locations(&rows),
            Err(err) => {
                log::error!("error fetching available locations: {err}");
                Vec::new()
            }
        }
    }

    pub fn nearest_city(&self, at: Coordinates) -> NearestCity {
        geo::nearest_city(at, &self.available_locations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationRow, RestaurantPhoto};

    fn restaurant(id: &str, categories: &[&str], rating: f64, count: u64) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: format!("Restaurante {id}"),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            rating_avg: rating,
            rating_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_categories() {
        let rs = vec![
            restaurant("1", &["Pizzaria"], 4.1, 10),
            restaurant("2", &["Pizzaria Napolitana"], 4.8, 10),
            restaurant("3", &["Japonesa"], 4.9, 10),
            restaurant("4", &["Bar"], 3.0, 10),
        ];

        let rankings = rank_categories(&rs);
        let titles: Vec<&str> = rankings.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Top 5 Pizzarias", "Melhores Avaliados"]);

        let pizza: Vec<&str> = rankings[0].restaurants.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(pizza, vec!["2", "1"]);
        assert_eq!(rankings[1].restaurants.len(), 4);
        assert_eq!(rankings[1].restaurants[0].id, "3");
    }

    #[test]
    fn test_promotion_coupon() {
        let mut r = restaurant("abc", &["Brasileira"], 4.5, 3);
        r.price_level = Some(1);
        let coupons = cheap_promotions(&[r.clone(), restaurant("x", &[], 5.0, 1)], &NEARBY_OFFER);

        assert_eq!(coupons.len(), 1);
        let c = &coupons[0];
        assert_eq!(c.id, "promo-abc");
        assert_eq!(c.code, "DEGUSTE20");
        assert_eq!(c.title, "Oferta em Restaurante abc");
        assert_eq!(c.description, "Almoço completo com desconto");
        assert_eq!(c.current_redemptions, 12);
        assert_eq!(c.max_redemptions, Some(100));
        assert!(c.valid_until > c.valid_from);

        let c = promotion(&r, &CATALOGUE_OFFER);
        assert_eq!(c.code, "DEGUSTE15");
        assert_eq!(c.discount_value, 15.0);
        assert_eq!(c.description, "Desconto especial");
    }

    #[test]
    fn test_photo_video() {
        let mut r = restaurant("r1", &["Pizzaria", "Bar", "Italiana", "Massas"], 4.0, 10);
        let v = photo_video(&r);
        assert_eq!(v.id, "video-r1");
        assert_eq!(v.thumbnail_url, photos::DEFAULT_THUMBNAIL);
        assert_eq!(v.title, "Melhor Pizzaria da Cidade?");
        assert_eq!(v.views_count, 1530);
        assert_eq!(v.likes_count, 120);
        assert_eq!(v.tags, vec!["pizzaria", "bar", "italiana"]);

        r.categories.clear();
        r.photos = vec![RestaurantPhoto {
            url: "https://x/1.jpg".to_string(),
            ..Default::default()
        }];
        let v = photo_video(&r);
        assert_eq!(v.thumbnail_url, "https://x/1.jpg");
        assert_eq!(v.title, "Melhor Lugar da Cidade?");
    }

    #[test]
    fn test_group_locations() {
        let row = |state: Option<&str>, city: Option<&str>, lat: Option<f64>| LocationRow {
            state: state.map(str::to_owned),
            city: city.map(str::to_owned),
            lat,
            lng: lat,
        };
        let rows = vec![
            row(Some("SP"), Some("Taubaté"), Some(-23.0)),
            row(Some("MG"), Some("Juiz de Fora"), Some(-21.7)),
            row(Some("SP"), Some("Pindamonhangaba"), Some(-22.9)),
            row(Some("SP"), Some("Taubaté"), Some(-99.0)),
            row(None, Some("Nowhere"), Some(1.0)),
            row(Some("SP"), Some("Ubatuba"), None),
        ];

        let locations = group_locations(&rows);
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].state, "MG");
        assert_eq!(locations[1].state, "SP");
        let cities: Vec<&str> = locations[1].cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cities, vec!["Pindamonhangaba", "Taubaté"]);
        assert_eq!(locations[1].cities[1].lat, -23.0);
    }
}
