use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::app::{App, AppError};
use crate::config::Config;
use crate::gemini::LanguageModel;
use crate::model::{
    Attributes, Coupon, CouponStatus, MenuItem, Notification, NotificationKind, OpeningHours,
    Restaurant, RestaurantStatus, Review,
};
use crate::places::{PlacesProvider, TextSearch};
use crate::store::memory::MemoryData;
use crate::store::MemoryStore;
use crate::utils::hours::DAY_KEYS;

mod config;
mod feed;

/// Language model answering from a queue; `None` once the queue runs dry.
#[derive(Default)]
pub struct FakeModel {
    replies: Mutex<VecDeque<Option<String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Some(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for FakeModel {
    fn generate(&self, prompt: &str, _temperature: f32) -> Option<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().flatten()
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Places provider returning the same raw records for every search.
#[derive(Default)]
pub struct FakePlaces {
    places: Vec<Value>,
    pub requests: Mutex<Vec<TextSearch>>,
}

impl FakePlaces {
    pub fn new(places: Vec<Value>) -> Self {
        Self {
            places,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text_query.clone())
            .collect()
    }
}

impl PlacesProvider for FakePlaces {
    fn search_text(&self, request: &TextSearch) -> Result<Vec<Value>, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.places.clone())
    }

    fn photo_url(&self, photo_name: &str) -> Option<String> {
        Some(format!("https://photos.test/{photo_name}"))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Raw Google place located in `city`.
pub fn place(id: &str, name: &str, primary_type: &str, city: &str, rating_count: u64) -> Value {
    json!({
        "id": id,
        "displayName": { "text": name },
        "formattedAddress": format!("Rua das Flores, 100 - Centro, {city} - SP"),
        "primaryType": primary_type,
        "rating": 4.6,
        "userRatingCount": rating_count,
        "location": { "latitude": -23.02, "longitude": -45.55 },
        "addressComponents": [
            { "longText": city, "types": ["locality", "political"] },
            { "longText": "São Paulo", "types": ["administrative_area_level_1", "political"] }
        ]
    })
}

fn every_day(open: &str, close: &str) -> OpeningHours {
    let mut hours = OpeningHours::default();
    for day in DAY_KEYS {
        hours.set_day(day, open.to_string(), close.to_string());
    }
    hours
}

#[allow(clippy::too_many_arguments)]
fn restaurant(
    id: &str,
    name: &str,
    city: &str,
    categories: &[&str],
    rating: (f64, u64),
    price: u8,
    verified: bool,
    at: (f64, f64),
) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        city: city.to_string(),
        state: "SP".to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        rating_avg: rating.0,
        rating_count: rating.1,
        price_level: Some(price),
        is_verified: verified,
        lat: Some(at.0),
        lng: Some(at.1),
        status: RestaurantStatus::Active,
        ..Default::default()
    }
}

fn menu_item(id: &str, restaurant_id: &str, name: &str, category: &str, price: f64) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        restaurant_id: restaurant_id.to_string(),
        name: name.to_string(),
        price,
        category: Some(category.to_string()),
        is_active: true,
        ..Default::default()
    }
}

fn coupon(id: &str, valid_until: &str, status: CouponStatus) -> Coupon {
    Coupon {
        id: id.to_string(),
        restaurant_id: "r1".to_string(),
        code: id.to_uppercase(),
        title: "Rodízio com desconto".to_string(),
        discount_value: 10.0,
        max_redemptions: Some(2),
        current_redemptions: 1,
        valid_from: "2024-01-01T00:00:00.000Z".to_string(),
        valid_until: valid_until.to_string(),
        status,
        ..Default::default()
    }
}

fn notification(id: &str, user_id: &str, created_at: &str, is_read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        user_id: user_id.to_string(),
        kind: NotificationKind::Promo,
        title: format!("Novidade {id}"),
        body: "Tem cupom novo perto de você".to_string(),
        icon: "🎉".to_string(),
        is_read,
        created_at: created_at.to_string(),
        ..Default::default()
    }
}

/// Five active restaurants around Taubaté plus one inactive pizzaria.
pub fn fixture() -> MemoryData {
    let mut kyoko = restaurant(
        "r1",
        "Kyoko Sushi",
        "Taubaté",
        &["Japonesa"],
        (4.8, 120),
        2,
        true,
        (-23.024, -45.557),
    );
    kyoko.opening_hours = every_day("11:00", "23:00");
    let mut attributes = Attributes::all_false();
    attributes.set("wifi", true);
    kyoko.attributes = attributes;

    let mut bella = restaurant(
        "r2",
        "Pizzaria Bella",
        "Taubaté",
        &["Pizzaria"],
        (4.5, 80),
        1,
        true,
        (-23.03, -45.56),
    );
    bella.opening_hours = every_day("18:00", "23:30");

    let mut closed = restaurant(
        "r6",
        "Pizzaria Fechada",
        "Taubaté",
        &["Pizzaria"],
        (5.0, 500),
        2,
        false,
        (-23.025, -45.556),
    );
    closed.status = RestaurantStatus::Inactive;

    MemoryData {
        restaurants: vec![
            kyoko,
            bella,
            restaurant(
                "r3",
                "Burger Mania",
                "Taubaté",
                &["Hamburgueria", "Brasileira"],
                (4.2, 40),
                1,
                false,
                (-23.04, -45.57),
            ),
            restaurant(
                "r4",
                "Cantina do Vale",
                "Pindamonhangaba",
                &["Brasileira", "Pizzaria"],
                (4.9, 25),
                3,
                false,
                (-22.92, -45.46),
            ),
            restaurant(
                "r5",
                "Bar do Zé",
                "São José dos Campos",
                &["Bar"],
                (4.0, 300),
                2,
                false,
                (-23.18, -45.88),
            ),
            closed,
        ],
        menu_items: vec![
            menu_item("m1", "r1", "Temaki de salmão", "Temakis", 29.9),
            menu_item("m2", "r1", "Combinado Sushi", "Combinados", 79.9),
            menu_item("m3", "r4", "Lasanha à bolonhesa", "Massas", 54.0),
        ],
        reviews: vec![Review {
            id: "rev1".to_string(),
            user_id: "u2".to_string(),
            restaurant_id: "r1".to_string(),
            rating: 4,
            comment: Some("Peixe fresquinho".to_string()),
            created_at: "2020-09-01T20:00:00.000Z".to_string(),
            ..Default::default()
        }],
        coupons: vec![
            coupon("c1", "2999-12-31T23:59:59.000Z", CouponStatus::Active),
            coupon("c2", "2020-01-01T00:00:00.000Z", CouponStatus::Active),
            coupon("c3", "2999-12-31T23:59:59.000Z", CouponStatus::Paused),
        ],
        notifications: vec![
            notification("n1", "u1", "2026-10-01T12:00:00.000Z", false),
            notification("n2", "u1", "2026-10-02T12:00:00.000Z", false),
            notification("n3", "u2", "2026-10-03T12:00:00.000Z", true),
        ],
        ..Default::default()
    }
}

/// App over `store` with the given fakes standing in for Google and Gemini.
pub fn app_with(
    store: Arc<MemoryStore>,
    places: Option<Arc<FakePlaces>>,
    llm: Option<Arc<FakeModel>>,
) -> App {
    App::new(
        Arc::new(Config::default()),
        store,
        places.map(|p| p as Arc<dyn PlacesProvider>),
        llm.map(|l| l as Arc<dyn LanguageModel>),
    )
}

/// App over the fixture with no remote services.
pub fn create_app() -> (App, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(fixture()));
    (app_with(store.clone(), None, None), store)
}

pub fn ids(restaurants: &[Restaurant]) -> Vec<&str> {
    restaurants.iter().map(|r| r.id.as_str()).collect()
}
