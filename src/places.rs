//! Google Places text search, used as a live fallback when the database has
//! too few matches and as extra context for the concierge.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::app::errors::AppError;
use crate::config::Config;
use crate::model::{Attributes, Coordinates, OpeningHours, Restaurant, RestaurantPhoto, RestaurantStatus};
use crate::utils::{
    hours::DAY_KEYS,
    photos,
    text::{capitalize, comparable, title_case},
};

const SEARCH_TEXT_URL: &str = "https://places.googleapis.com/v1/places:searchText";

const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.rating,\
places.userRatingCount,places.priceLevel,places.primaryType,places.location,places.photos,\
places.reviews,places.websiteUri,places.nationalPhoneNumber,places.internationalPhoneNumber,\
places.regularOpeningHours,places.currentOpeningHours,places.addressComponents";

const DEFAULT_RATING: f64 = 4.5;
const DEFAULT_PRICE_LEVEL: u8 = 2;
const UNKNOWN_CITY: &str = "Desconhecida";

/// Cities recognised inside a formatted address when the address
/// components name none.
const ADDRESS_CITIES: [&str; 8] = [
    "campos do jordão",
    "são josé dos campos",
    "taubaté",
    "pindamonhangaba",
    "tremembé",
    "caçapava",
    "ubatuba",
    "juiz de fora",
];

const FOOD_TYPES: [&str; 48] = [
    "restaurant",
    "cafe",
    "bakery",
    "bar",
    "coffee_shop",
    "fast_food_restaurant",
    "meal_delivery",
    "meal_takeaway",
    "pizza_restaurant",
    "hamburger_restaurant",
    "sushi_restaurant",
    "ice_cream_shop",
    "sandwich_shop",
    "steak_house",
    "seafood_restaurant",
    "japanese_restaurant",
    "italian_restaurant",
    "brazilian_restaurant",
    "mexican_restaurant",
    "chinese_restaurant",
    "indian_restaurant",
    "thai_restaurant",
    "korean_restaurant",
    "french_restaurant",
    "greek_restaurant",
    "turkish_restaurant",
    "vegetarian_restaurant",
    "vegan_restaurant",
    "brunch_restaurant",
    "breakfast_restaurant",
    "dessert_restaurant",
    "food_court",
    "juice_shop",
    "tea_house",
    "pub",
    "wine_bar",
    "buffet_restaurant",
    "barbecue_restaurant",
    "ramen_restaurant",
    "acai_shop",
    "american_restaurant",
    "asian_restaurant",
    "middle_eastern_restaurant",
    "spanish_restaurant",
    "indonesian_restaurant",
    "vietnamese_restaurant",
    "mediterranean_restaurant",
    "lebanese_restaurant",
];

/// Generic shop types that still sell food.
const EXTRA_FOOD_TYPES: [&str; 5] = [
    "food",
    "store",
    "grocery_or_supermarket",
    "supermarket",
    "convenience_store",
];

static ACCEPTED_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    FOOD_TYPES
        .iter()
        .chain(EXTRA_FOOD_TYPES.iter())
        .copied()
        .collect()
});

/// Phrases that only make sense to a human and confuse text search.
static FILLER_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)perto\s+de\s+mim",
        r"(?i)pra\s+mim",
        r"(?i)aberto\s+agora",
        r"(?i)próximo",
    ]
    .iter()
    .filter_map(|re| Regex::new(re).ok())
    .collect()
});

/// Body of a `places:searchText` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearch {
    pub text_query: String,
    pub location_bias: LocationBias,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationBias {
    pub circle: Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Circle {
    pub center: LatLng,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl TextSearch {
    pub fn new(text_query: String, center: Coordinates, radius_m: f64, language_code: &str) -> Self {
        Self {
            text_query,
            location_bias: LocationBias {
                circle: Circle {
                    center: LatLng {
                        latitude: center.lat,
                        longitude: center.lng,
                    },
                    radius: radius_m,
                },
            },
            language_code: language_code.to_string(),
        }
    }
}

/// Source of raw place records.
pub trait PlacesProvider: Send + Sync {
    /// Raw `places` array of a text search.
    fn search_text(&self, request: &TextSearch) -> Result<Vec<Value>, AppError>;

    /// Public media URL for a photo resource name.
    fn photo_url(&self, photo_name: &str) -> Option<String>;

    /// Get the name of this provider for logging/debugging
    fn name(&self) -> &'static str;
}

pub struct GooglePlaces {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl GooglePlaces {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

impl PlacesProvider for GooglePlaces {
    fn search_text(&self, request: &TextSearch) -> Result<Vec<Value>, AppError> {
        let resp = self
            .client
            .post(SEARCH_TEXT_URL)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(request)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upstream {
                service: "google places",
                status: status.as_u16(),
                message: resp.text().unwrap_or_default(),
            });
        }

        let body: Value = resp.json()?;
        Ok(body
            .get("places")
            .and_then(|p| p.as_array())
            .cloned()
            .unwrap_or_default())
    }

    fn photo_url(&self, photo_name: &str) -> Option<String> {
        if photo_name.is_empty() {
            return None;
        }
        Some(format!(
            "https://places.googleapis.com/v1/{photo_name}/media?maxHeightPx=800&maxWidthPx=800&key={}",
            self.api_key
        ))
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

/// Removes filler phrases; a remainder shorter than two characters becomes
/// `restaurante`.
pub fn clean_query(query: &str) -> String {
    let mut cleaned = query.trim().to_string();
    for re in FILLER_PHRASES.iter() {
        cleaned = re.replace_all(&cleaned, "").to_string();
    }
    let cleaned = cleaned.trim().to_string();

    if cleaned.chars().count() < 2 {
        "restaurante".to_string()
    } else {
        cleaned
    }
}

fn is_food_place(place: &Value) -> bool {
    match place.get("primaryType").and_then(|t| t.as_str()) {
        None => true,
        Some(t) => ACCEPTED_TYPES.contains(t),
    }
}

fn is_closed_now(place: &Value) -> bool {
    place
        .get("currentOpeningHours")
        .and_then(|h| h.get("openNow"))
        .and_then(|o| o.as_bool())
        == Some(false)
}

/// Live search: returns mapped restaurants, or nothing on any failure.
pub fn fetch_places_by_query(
    provider: &dyn PlacesProvider,
    config: &Config,
    query: &str,
    city_fallback: &str,
    coords: Option<Coordinates>,
) -> Vec<Restaurant> {
    if query.chars().count() < 2 {
        return Vec::new();
    }

    let mut search = clean_query(query);

    let lowered = search.to_lowercase();
    let names_city = config
        .places
        .known_cities
        .iter()
        .any(|city| lowered.contains(&city.to_lowercase()));
    if !names_city && !city_fallback.is_empty() {
        search = format!("{search} em {city_fallback}");
    }

    let center = coords.unwrap_or(config.default_location);
    let request = TextSearch::new(
        search,
        center,
        config.places.radius_m,
        &config.places.language_code,
    );

    let places = match provider.search_text(&request) {
        Ok(places) => places,
        Err(err) => {
            log::error!("provider={} places search failed: {err}", provider.name());
            return Vec::new();
        }
    };

    let mapped: Vec<Restaurant> = places
        .iter()
        .filter(|p| is_food_place(p))
        .filter(|p| !is_closed_now(p))
        .map(|p| map_place(p, provider, config))
        .collect();

    log::debug!(
        "places query={:?} raw={} kept={}",
        request.text_query,
        places.len(),
        mapped.len()
    );

    // precise coordinates: trust the bias radius
    if coords.is_some() {
        return mapped;
    }

    let target = comparable(city_fallback);
    mapped
        .into_iter()
        .filter(|r| comparable(&r.city).contains(&target))
        .collect()
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().filter(|s| !s.is_empty())
}

fn component_name(components: &[Value], kind: &str) -> Option<String> {
    components
        .iter()
        .find(|c| {
            c.get("types")
                .and_then(|t| t.as_array())
                .map_or(false, |types| types.iter().any(|t| t.as_str() == Some(kind)))
        })
        .and_then(|c| str_at(c, &["longName"]).or_else(|| str_at(c, &["longText"])))
        .map(str::to_owned)
}

fn detect_city(place: &Value) -> String {
    if let Some(components) = place.get("addressComponents").and_then(|c| c.as_array()) {
        let found = ["locality", "sublocality_level_1", "administrative_area_level_2"]
            .iter()
            .find_map(|kind| component_name(components, kind));
        if let Some(city) = found {
            return city;
        }
    }

    let address = str_at(place, &["formattedAddress"])
        .unwrap_or_default()
        .to_lowercase();

    if let Some(city) = ADDRESS_CITIES.iter().find(|c| address.contains(*c)) {
        return title_case(city);
    }

    match address.split('-').next().unwrap_or_default().trim() {
        "" => UNKNOWN_CITY.to_string(),
        segment => segment.to_string(),
    }
}

fn price_level(place: &Value) -> u8 {
    match str_at(place, &["priceLevel"]) {
        Some("PRICE_LEVEL_INEXPENSIVE") => 1,
        Some("PRICE_LEVEL_MODERATE") => 2,
        Some("PRICE_LEVEL_EXPENSIVE") => 3,
        Some("PRICE_LEVEL_VERY_EXPENSIVE") => 4,
        _ => DEFAULT_PRICE_LEVEL,
    }
}

fn two_digits(value: Option<&Value>, default: u64) -> String {
    format!("{:02}", value.and_then(|v| v.as_u64()).unwrap_or(default))
}

/// `regularOpeningHours.periods` as the weekly `{day: {open, close}}` map.
fn opening_hours(place: &Value) -> OpeningHours {
    let mut hours = OpeningHours::default();

    let Some(periods) = place
        .get("regularOpeningHours")
        .and_then(|h| h.get("periods"))
        .and_then(|p| p.as_array())
    else {
        return hours;
    };

    for period in periods {
        let open = period.get("open");
        let Some(day) = open.and_then(|o| o.get("day")).and_then(|d| d.as_u64()) else {
            continue;
        };
        let close = period.get("close");

        let name = DAY_KEYS
            .get(day as usize)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("dia{day}"));

        let opens = format!(
            "{}:{}",
            two_digits(open.and_then(|o| o.get("hour")), 0),
            two_digits(open.and_then(|o| o.get("minute")), 0)
        );
        let closes = format!(
            "{}:{}",
            two_digits(close.and_then(|c| c.get("hour")), 23),
            two_digits(close.and_then(|c| c.get("minute")), 59)
        );
        hours.set_day(&name, opens, closes);
    }

    hours
}

/// Maps a raw place record to a `Restaurant` with a `gplace_` id.
pub fn map_place(place: &Value, provider: &dyn PlacesProvider, config: &Config) -> Restaurant {
    // ulid tail, the head is the timestamp
    let place_id = str_at(place, &["id"])
        .map(str::to_owned)
        .unwrap_or_else(|| crate::eid::Eid::new()[17..].to_string());
    let name = str_at(place, &["displayName", "text"])
        .unwrap_or("Estabelecimento")
        .to_string();
    let address = str_at(place, &["formattedAddress"]).unwrap_or_default().to_string();

    let category = str_at(place, &["primaryType"])
        .map(|t| t.replace('_', " "))
        .unwrap_or_else(|| "Restaurante".to_string());

    let photos: Vec<RestaurantPhoto> = match place.get("photos").and_then(|p| p.as_array()) {
        Some(list) => list
            .iter()
            .take(config.places.max_photos)
            .enumerate()
            .map(|(idx, photo)| RestaurantPhoto {
                id: idx.to_string(),
                url: str_at(photo, &["name"])
                    .and_then(|n| provider.photo_url(n))
                    .unwrap_or_default(),
                source: "google".to_string(),
                is_cover: idx == 0,
            })
            .collect(),
        None => vec![RestaurantPhoto {
            id: "0".to_string(),
            url: photos::menu_item_image(None, Some(&category), Some(&name)),
            source: "google".to_string(),
            is_cover: true,
        }],
    };

    let location = place.get("location");
    let lat = location
        .and_then(|l| l.get("latitude"))
        .and_then(|v| v.as_f64())
        .filter(|v| *v != 0.0)
        .unwrap_or(config.default_location.lat);
    let lng = location
        .and_then(|l| l.get("longitude"))
        .and_then(|v| v.as_f64())
        .filter(|v| *v != 0.0)
        .unwrap_or(config.default_location.lng);

    let rating = place
        .get("rating")
        .and_then(|v| v.as_f64())
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_RATING);

    let now = chrono::Utc::now().to_rfc3339();

    Restaurant {
        id: format!("gplace_{place_id}"),
        google_place_id: Some(place_id.clone()),
        name,
        slug: place_id,
        description: Some(address.clone()),
        city: detect_city(place),
        state: config.default_state.clone(),
        address,
        lat: Some(lat),
        lng: Some(lng),
        phone: str_at(place, &["nationalPhoneNumber"])
            .or_else(|| str_at(place, &["internationalPhoneNumber"]))
            .map(str::to_owned),
        whatsapp: None,
        instagram: None,
        website: str_at(place, &["websiteUri"]).map(str::to_owned),
        categories: vec![capitalize(&category)],
        tags: Vec::new(),
        price_level: Some(price_level(place)),
        rating_avg: rating,
        rating_count: place
            .get("userRatingCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        photos,
        opening_hours: opening_hours(place),
        attributes: Attributes::all_false(),
        status: RestaurantStatus::Active,
        is_verified: true,
        google_reviews: Some(
            place
                .get("reviews")
                .and_then(|r| r.as_array())
                .cloned()
                .unwrap_or_default(),
        ),
        created_at: now.clone(),
        updated_at: now,
        ..Default::default()
    }
}
