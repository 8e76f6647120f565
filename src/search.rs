//! Restaurant search: AI interpretation, database query, dish matches and a
//! Google Places fallback, merged into one ranked list.

use chrono::{Local, NaiveDateTime};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::app::App;
use crate::gemini;
use crate::model::{Coordinates, Restaurant, SearchFilters, SearchResult, SortBy};
use crate::places;
use crate::store::RestaurantQuery;
use crate::utils::{geo, hours, pricing};

const MISSING_DISTANCE_M: f64 = 999_999.0;
const MISSING_PRICE_LEVEL: u8 = 4;

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn has_items<T>(v: &Option<Vec<T>>) -> bool {
    v.as_ref().map_or(false, |v| !v.is_empty())
}

fn is_true(b: Option<bool>) -> bool {
    b == Some(true)
}

/// One-line summary of what the model understood, e.g.
/// `Tipo: Japonesa • Preço: $ • Aberto agora`.
pub fn describe_interpretation(ai: &SearchFilters) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(categories) = ai.categories.as_ref().filter(|c| !c.is_empty()) {
        parts.push(format!("Tipo: {}", categories.join(", ")));
    }
    if let Some(city) = non_empty(&ai.city) {
        parts.push(format!("Cidade: {city}"));
    }
    if let Some(level) = ai.price_level.filter(|l| *l > 0) {
        parts.push(format!("Preço: {}", pricing::symbols(level)));
    }
    if is_true(ai.open_now) {
        parts.push("Aberto agora".to_string());
    }
    if let Some(km) = ai.max_distance_km.filter(|km| *km > 0.0) {
        parts.push(format!("Até {km}km"));
    }
    if let Some(sort) = ai.sort_by {
        parts.push(format!("Ordenar: {sort}"));
    }
    if is_true(ai.is_perola) {
        parts.push("Pérolas".to_string());
    }
    if is_true(ai.has_promotions) {
        parts.push("Com promoção".to_string());
    }
    if let Some(vibes) = ai.vibes.as_ref().filter(|v| !v.is_empty()) {
        parts.push(format!("Vibe: {}", vibes.join(", ")));
    }
    if let Some(attributes) = &ai.attributes {
        let keys: Vec<&str> = attributes.keys().map(String::as_str).collect();
        parts.push(format!("Diferenciais: {}", keys.join(", ")));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" • "))
    }
}

/// Folds the model's filters into the caller's.
///
/// Lists are additive and attributes merge with the model winning per key.
/// Scalars only fill values the caller left unset.
pub fn merge_interpretation(filters: &mut SearchFilters, ai: SearchFilters) {
    if let Some(query) = non_empty(&ai.query) {
        filters.query = Some(query.to_string());
    } else if has_items(&ai.categories) || non_empty(&ai.city).is_some() || ai.attributes.is_some()
    {
        // fully structured: the raw words would only filter twice
        filters.query = None;
    }

    if let Some(categories) = ai.categories {
        filters
            .categories
            .get_or_insert_with(Vec::new)
            .extend(categories);
    }

    if non_empty(&filters.city).is_none() {
        if let Some(city) = non_empty(&ai.city) {
            filters.city = Some(city.to_string());
        }
    }
    if non_empty(&filters.state).is_none() {
        if let Some(state) = non_empty(&ai.state) {
            filters.state = Some(state.to_string());
        }
    }

    if let Some(attributes) = ai.attributes {
        let merged: &mut BTreeMap<String, Value> =
            filters.attributes.get_or_insert_with(BTreeMap::new);
        merged.extend(attributes);
    }

    if filters.price_level.filter(|l| *l > 0).is_none() {
        if let Some(level) = ai.price_level.filter(|l| *l > 0) {
            filters.price_level = Some(level);
        }
    }
    if is_true(ai.open_now) {
        filters.open_now = Some(true);
    }
    if filters.max_distance_km.filter(|km| *km > 0.0).is_none() {
        if let Some(km) = ai.max_distance_km.filter(|km| *km > 0.0) {
            filters.max_distance_km = Some(km);
        }
    }
    if filters.sort_by.is_none() {
        filters.sort_by = ai.sort_by;
    }
    if is_true(ai.is_perola) {
        filters.is_perola = Some(true);
    }
    if is_true(ai.has_promotions) {
        filters.has_promotions = Some(true);
    }

    if let Some(vibes) = ai.vibes.filter(|v| !v.is_empty()) {
        filters.vibes.get_or_insert_with(Vec::new).extend(vibes);
    }
}

/// Stable sort by the requested order; popularity (rating count) otherwise.
pub fn sort_restaurants(restaurants: &mut [Restaurant], sort_by: Option<SortBy>) {
    let distance = |r: &Restaurant| {
        r.distance_meters
            .filter(|d| *d > 0.0)
            .unwrap_or(MISSING_DISTANCE_M)
    };
    let price = |r: &Restaurant| {
        r.price_level
            .filter(|p| *p > 0)
            .unwrap_or(MISSING_PRICE_LEVEL)
    };

    match sort_by.unwrap_or_default() {
        SortBy::Rating => restaurants.sort_by(|a, b| {
            b.rating_avg
                .partial_cmp(&a.rating_avg)
                .unwrap_or(Ordering::Equal)
        }),
        SortBy::Distance => restaurants.sort_by(|a, b| {
            distance(a)
                .partial_cmp(&distance(b))
                .unwrap_or(Ordering::Equal)
        }),
        SortBy::Price => restaurants.sort_by_key(|r| price(r)),
        SortBy::Popularity => restaurants.sort_by(|a, b| b.rating_count.cmp(&a.rating_count)),
    }
}

/// Placeholder promotion rule until promotions are stored per restaurant.
pub fn has_promotion(restaurant: &Restaurant) -> bool {
    restaurant
        .id
        .chars()
        .next()
        .map_or(false, |c| c as u32 % 3 == 0)
}

fn attributes_match(restaurant: &Restaurant, wanted: &BTreeMap<String, Value>) -> bool {
    wanted
        .iter()
        .all(|(key, value)| restaurant.attributes.get(key) == Some(value))
}

fn matches_text(restaurant: &Restaurant, query: &str) -> bool {
    let q = query.to_lowercase();
    restaurant.name.to_lowercase().contains(&q)
        || restaurant
            .categories
            .iter()
            .any(|c| c.to_lowercase().contains(&q))
}

/// Keeps the first restaurant of every (case-insensitive) name.
fn dedupe_by_name(restaurants: Vec<Restaurant>) -> Vec<Restaurant> {
    let mut seen = HashSet::new();
    restaurants
        .into_iter()
        .filter(|r| seen.insert(r.name.to_lowercase()))
        .collect()
}

impl App {
    pub fn search_restaurants(&self, filters: SearchFilters) -> SearchResult {
        self.search_restaurants_at(filters, Local::now().naive_local())
    }

    /// Search with `at` as the local time for the `open_now` filter.
    pub fn search_restaurants_at(&self, mut filters: SearchFilters, at: NaiveDateTime) -> SearchResult {
        let settings = &self.config.search;

        // the raw text feeds dish search and Google even after the model rewrites it
        let raw_query = filters.query.clone().unwrap_or_default();
        let mut interpretation = None;

        if raw_query.chars().count() > settings.min_query_len {
            if let Some(llm) = &self.llm {
                match gemini::interpret_search_query(llm.as_ref(), &self.config, &raw_query) {
                    Some(ai) => {
                        interpretation = describe_interpretation(&ai);
                        merge_interpretation(&mut filters, ai);
                    }
                    None => log::warn!("interpretation unavailable, using basic search"),
                }
            }
        }

        let query = RestaurantQuery {
            categories: filters.categories.clone().unwrap_or_default(),
            vibes: filters.vibes.clone().unwrap_or_default(),
            max_price: filters.price_level.filter(|p| *p > 0),
            city: non_empty(&filters.city).map(str::to_owned),
            state: non_empty(&filters.state).map(str::to_owned),
        };

        let mut results = match self.store.query_restaurants(&query) {
            Ok(rows) => rows,
            Err(err) => {
                log::error!("store={} restaurant query failed: {err}", self.store.name());
                return SearchResult {
                    restaurants: Vec::new(),
                    distance: 0.0,
                    ai_interpretation: None,
                };
            }
        };

        if let Some(q) = non_empty(&filters.query) {
            results.retain(|r| matches_text(r, q));
        }

        self.add_dish_matches(&mut results, raw_query.trim(), query.city.as_deref());

        if let Some(wanted) = &filters.attributes {
            results.retain(|r| attributes_match(r, wanted));
        }

        let google = if results.len() < settings.places_fallback_threshold
            && raw_query.chars().count() > settings.min_query_len
        {
            self.places_fallback(&raw_query, &filters)
        } else {
            Vec::new()
        };

        results.extend(google);
        let mut results = dedupe_by_name(results);

        if is_true(filters.open_now) {
            results.retain(|r| hours::open_status(&r.opening_hours, at).is_open);
        }

        if let Some(origin) = filters.coordinates() {
            apply_distance(&mut results, origin, filters.max_distance_km.filter(|km| *km > 0.0));
        }

        sort_restaurants(&mut results, filters.sort_by);

        if is_true(filters.is_perola) {
            results.retain(|r| {
                r.rating_avg >= settings.perola_min_rating
                    && r.rating_count >= settings.perola_min_reviews
            });
        }

        if is_true(filters.has_promotions) {
            results.retain(has_promotion);
        }

        log::info!(
            "search query={:?} results={} live={} interpretation={:?}",
            raw_query,
            results.len(),
            results.iter().filter(|r| r.is_from_places()).count(),
            interpretation
        );

        SearchResult {
            restaurants: results,
            distance: filters
                .max_distance_km
                .filter(|km| *km > 0.0)
                .unwrap_or(settings.default_distance_km),
            ai_interpretation: interpretation,
        }
    }

    /// Tags results that serve a matching dish and appends the restaurants
    /// found only through their menu.
    fn add_dish_matches(&self, results: &mut Vec<Restaurant>, dish: &str, city: Option<&str>) {
        if dish.chars().count() <= self.config.search.min_query_len {
            return;
        }

        let matches = match self
            .store
            .match_dishes(dish, self.config.search.dish_match_limit)
        {
            Ok(matches) => matches,
            Err(err) => {
                log::warn!("dish search failed, continuing without it: {err}");
                return;
            }
        };

        // first matching dish per restaurant, in match order
        let mut dish_by_restaurant: Vec<(String, String)> = Vec::new();
        for m in matches {
            if !dish_by_restaurant.iter().any(|(id, _)| *id == m.restaurant_id) {
                dish_by_restaurant.push((m.restaurant_id, m.name));
            }
        }
        if dish_by_restaurant.is_empty() {
            return;
        }

        let dish_for = |id: &str| {
            dish_by_restaurant
                .iter()
                .find(|(rid, _)| rid == id)
                .map(|(_, name)| name.clone())
        };

        for r in results.iter_mut() {
            if let Some(name) = dish_for(&r.id) {
                r.matched_dish = Some(name);
            }
        }

        let new_ids: Vec<String> = dish_by_restaurant
            .iter()
            .map(|(id, _)| id.clone())
            .filter(|id| !results.iter().any(|r| r.id == *id))
            .collect();
        if new_ids.is_empty() {
            return;
        }

        match self.store.active_restaurants_by_ids(&new_ids, city) {
            Ok(found) => {
                log::debug!("dish {dish:?} added {} restaurants", found.len());
                for mut r in found {
                    r.matched_dish = dish_for(&r.id);
                    results.push(r);
                }
            }
            Err(err) => log::warn!("dish restaurants lookup failed: {err}"),
        }
    }

    fn places_fallback(&self, raw_query: &str, filters: &SearchFilters) -> Vec<Restaurant> {
        let Some(provider) = &self.places else {
            return Vec::new();
        };

        let city = non_empty(&filters.city);
        let mut term = raw_query.to_string();
        if let Some(place) = city.or_else(|| non_empty(&filters.state)) {
            term = format!("{term} em {place}");
        }

        let city_fallback = city.unwrap_or(&self.config.default_city);
        let mut found = places::fetch_places_by_query(
            provider.as_ref(),
            &self.config,
            &term,
            city_fallback,
            filters.coordinates(),
        );

        // keep other cities out of a city-scoped search
        if let Some(city) = city {
            let city = city.to_lowercase();
            found.retain(|r| r.city.to_lowercase() == city);
        }

        log::info!("google fallback for {term:?}: {} places", found.len());
        found
    }
}

/// Sets `distance_meters` from `origin` and, with a limit, drops whatever
/// is farther or has no coordinates.
fn apply_distance(restaurants: &mut Vec<Restaurant>, origin: Coordinates, max_km: Option<f64>) {
    restaurants.retain_mut(|r| {
        let Some(at) = r.coordinates() else {
            return max_km.is_none();
        };
        let km = geo::distance_km(origin, at);
        r.distance_meters = Some((km * 1000.0).round());
        max_km.map_or(true, |max| km <= max)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_interpretation() {
        let ai = SearchFilters {
            categories: Some(vec!["Japonesa".to_string()]),
            price_level: Some(1),
            open_now: Some(true),
            max_distance_km: Some(5.0),
            sort_by: Some(SortBy::Rating),
            ..Default::default()
        };
        assert_eq!(
            describe_interpretation(&ai).unwrap(),
            "Tipo: Japonesa • Preço: $ • Aberto agora • Até 5km • Ordenar: rating"
        );
        assert_eq!(describe_interpretation(&SearchFilters::default()), None);

        // an empty attribute object still shows up
        let ai = SearchFilters {
            attributes: Some(BTreeMap::new()),
            ..Default::default()
        };
        assert_eq!(describe_interpretation(&ai).unwrap(), "Diferenciais: ");
    }

    #[test]
    fn test_merge_interpretation() {
        let mut filters = SearchFilters {
            query: Some("sushi barato em taubaté".to_string()),
            categories: Some(vec!["Bar".to_string()]),
            city: Some("Taubaté".to_string()),
            price_level: Some(3),
            attributes: Some(BTreeMap::from([
                ("wifi".to_string(), Value::Bool(true)),
                ("parking".to_string(), Value::Bool(true)),
            ])),
            ..Default::default()
        };
        let ai = SearchFilters {
            categories: Some(vec!["Japonesa".to_string()]),
            city: Some("São Paulo".to_string()),
            state: Some("SP".to_string()),
            price_level: Some(1),
            attributes: Some(BTreeMap::from([("parking".to_string(), Value::Bool(false))])),
            vibes: Some(vec!["tranquilo".to_string()]),
            is_perola: Some(true),
            ..Default::default()
        };

        merge_interpretation(&mut filters, ai);

        assert_eq!(filters.query, None);
        assert_eq!(
            filters.categories,
            Some(vec!["Bar".to_string(), "Japonesa".to_string()])
        );
        assert_eq!(filters.city.as_deref(), Some("Taubaté"));
        assert_eq!(filters.state.as_deref(), Some("SP"));
        assert_eq!(filters.price_level, Some(3));
        let attrs = filters.attributes.unwrap();
        assert_eq!(attrs["wifi"], Value::Bool(true));
        assert_eq!(attrs["parking"], Value::Bool(false));
        assert_eq!(filters.vibes, Some(vec!["tranquilo".to_string()]));
        assert_eq!(filters.is_perola, Some(true));
    }

    #[test]
    fn test_merge_keeps_query_keyword() {
        let mut filters = SearchFilters {
            query: Some("outback perto".to_string()),
            ..Default::default()
        };
        merge_interpretation(
            &mut filters,
            SearchFilters {
                query: Some("Outback".to_string()),
                max_distance_km: Some(5.0),
                ..Default::default()
            },
        );
        assert_eq!(filters.query.as_deref(), Some("Outback"));
        assert_eq!(filters.max_distance_km, Some(5.0));

        // nothing structured and no keyword: the raw text stays
        let mut filters = SearchFilters {
            query: Some("algo aberto".to_string()),
            ..Default::default()
        };
        merge_interpretation(
            &mut filters,
            SearchFilters {
                open_now: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(filters.query.as_deref(), Some("algo aberto"));
        assert_eq!(filters.open_now, Some(true));
    }

    fn ranked(id: &str, rating: f64, count: u64, price: Option<u8>, dist: Option<f64>) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: id.to_string(),
            rating_avg: rating,
            rating_count: count,
            price_level: price,
            distance_meters: dist,
            ..Default::default()
        }
    }

    fn ids(restaurants: &[Restaurant]) -> Vec<&str> {
        restaurants.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_sort_restaurants() {
        let base = vec![
            ranked("a", 4.0, 10, Some(2), Some(300.0)),
            ranked("b", 4.9, 5, None, None),
            ranked("c", 4.0, 50, Some(1), Some(100.0)),
        ];

        let mut rs = base.clone();
        sort_restaurants(&mut rs, Some(SortBy::Rating));
        assert_eq!(ids(&rs), vec!["b", "a", "c"]);

        let mut rs = base.clone();
        sort_restaurants(&mut rs, Some(SortBy::Distance));
        assert_eq!(ids(&rs), vec!["c", "a", "b"]);

        let mut rs = base.clone();
        sort_restaurants(&mut rs, Some(SortBy::Price));
        assert_eq!(ids(&rs), vec!["c", "a", "b"]);

        let mut rs = base;
        sort_restaurants(&mut rs, None);
        assert_eq!(ids(&rs), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_has_promotion() {
        // '0' is 48, 'a' is 97
        assert!(has_promotion(&ranked("0abc", 0.0, 0, None, None)));
        assert!(!has_promotion(&ranked("abc", 0.0, 0, None, None)));
        assert!(!has_promotion(&ranked("", 0.0, 0, None, None)));
    }

    #[test]
    fn test_apply_distance() {
        let origin = Coordinates::new(-23.023419, -45.556276);
        let mut near = ranked("near", 0.0, 0, None, None);
        near.lat = Some(-23.03);
        near.lng = Some(-45.56);
        let mut far = ranked("far", 0.0, 0, None, None);
        far.lat = Some(-23.55);
        far.lng = Some(-46.63);
        let unknown = ranked("unknown", 0.0, 0, None, None);

        let mut rs = vec![near.clone(), far.clone(), unknown.clone()];
        apply_distance(&mut rs, origin, None);
        assert_eq!(ids(&rs), vec!["near", "far", "unknown"]);
        assert!(rs[0].distance_meters.unwrap() < 1500.0);

        let mut rs = vec![near, far, unknown];
        apply_distance(&mut rs, origin, Some(10.0));
        assert_eq!(ids(&rs), vec!["near"]);
    }
}
