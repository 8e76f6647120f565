use chrono::NaiveDate;

use super::{create_app, fixture, ids};
use crate::feed::RestaurantDetails;
use crate::model::Coordinates;
use crate::utils::photos::FALLBACK_PHOTO_URL;

fn taubate() -> Coordinates {
    Coordinates::new(-23.023419, -45.556276)
}

#[test]
pub fn test_home_feed() {
    let (app, _store) = create_app();

    let feed = app.home_feed(None);

    assert_eq!(ids(&feed.highlights), vec!["r1", "r2"]);

    let promo: Vec<&str> = feed.promotions.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(promo, vec!["promo-r2", "promo-r3"]);
    assert!(feed.promotions.iter().all(|c| c.code == "DEGUSTE20"));
    assert_eq!(feed.promotions[0].description, "Desconto especial");
    assert_eq!(feed.promotions[1].description, "Almoço com desconto");
    assert_eq!(feed.promotions[1].title, "Oferta em Burger Mania");

    let videos: Vec<&str> = feed.videos.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(
        videos,
        vec!["video-r5", "video-r1", "video-r2", "video-r3", "video-r4"]
    );
    assert_eq!(feed.videos[0].views_count, 300 * 153);
    assert_eq!(feed.videos[0].title, "Melhor Bar da Cidade?");

    let titles: Vec<&str> = feed.rankings.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Top 5 Pizzarias", "Melhores Avaliados"]);
    assert_eq!(ids(&feed.rankings[0].restaurants), vec!["r4", "r2"]);
    assert_eq!(
        ids(&feed.rankings[1].restaurants),
        vec!["r4", "r1", "r2", "r3", "r5"]
    );
}

#[test]
pub fn test_home_feed_near_location() {
    let (app, _store) = create_app();

    let feed = app.home_feed(Some(taubate()));

    // nearest first
    assert_eq!(ids(&feed.highlights), vec!["r1", "r2"]);
    assert_eq!(feed.videos.len(), 5);
    assert!(feed.videos[0]
        .restaurant
        .as_ref()
        .unwrap()
        .distance_meters
        .is_some());
}

#[test]
pub fn test_highlights() {
    let (app, _store) = create_app();

    assert_eq!(ids(&app.highlights(None)), vec!["r1", "r2"]);
    assert_eq!(ids(&app.highlights(Some(taubate()))), vec!["r1", "r2"]);
}

#[test]
pub fn test_promotions() {
    let (app, _store) = create_app();

    let catalogue = app.promotions(None);
    let ids: Vec<&str> = catalogue.iter().map(|c| c.restaurant_id.as_str()).collect();
    assert_eq!(ids, vec!["r2", "r3"]);
    assert!(catalogue.iter().all(|c| c.code == "DEGUSTE15"));
    assert!(catalogue.iter().all(|c| c.current_redemptions == 5));
    assert!(catalogue[0].valid_until > catalogue[0].valid_from);

    let nearby = app.promotions(Some(taubate()));
    let burger = nearby.iter().find(|c| c.restaurant_id == "r3").unwrap();
    assert_eq!(burger.code, "DEGUSTE20");
    assert_eq!(burger.description, "Almoço completo com desconto");
    assert_eq!(burger.discount_value, 20.0);
}

#[test]
pub fn test_restaurant_lookups() {
    let (app, _store) = create_app();

    assert_eq!(app.restaurant_by_id("r4").unwrap().name, "Cantina do Vale");
    assert!(app.restaurant_by_id("missing").is_none());

    let menu: Vec<String> = app.menu_items("r1").into_iter().map(|m| m.name).collect();
    assert_eq!(menu, vec!["Combinado Sushi", "Temaki de salmão"]);

    assert!(app.restaurant_videos("r1").is_empty());
    assert_eq!(app.restaurants(None).len(), 5);
}

#[test]
pub fn test_available_locations() {
    let (app, _store) = create_app();

    let locations = app.available_locations();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].state, "SP");

    let cities: Vec<&str> = locations[0].cities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        cities,
        vec!["Pindamonhangaba", "São José dos Campos", "Taubaté"]
    );

    // first row of the city wins
    let taubate = &locations[0].cities[2];
    assert_eq!((taubate.lat, taubate.lng), (-23.024, -45.557));
}

#[test]
pub fn test_nearest_city() {
    let (app, _store) = create_app();

    let nearest = app.nearest_city(Coordinates::new(-22.93, -45.47));
    assert_eq!(nearest.city, "Pindamonhangaba");
    assert_eq!(nearest.state, "SP");

    let nearest = app.nearest_city(Coordinates::new(-23.2, -45.9));
    assert_eq!(nearest.city, "São José dos Campos");
}

#[test]
pub fn test_restaurant_details() {
    let mut kyoko = fixture().restaurants.remove(0);
    kyoko.attributes.set("live_music", true);
    kyoko.attributes.set("delivery", true);
    let monday_lunch = NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap();

    let details = RestaurantDetails::new(kyoko, monday_lunch);
    assert_eq!(details.cover_photo_url, FALLBACK_PHOTO_URL);
    assert_eq!(details.price_range, Some("R$ 30–60"));
    assert_eq!(details.highlight, Some("🎵 Som ao Vivo"));
    assert!(details.open_status.is_open);
    assert_eq!(details.open_status.closes_at.as_deref(), Some("23:00"));

    let json = serde_json::to_value(&details).unwrap();
    assert_eq!(json["name"], "Kyoko Sushi");
    assert_eq!(json["open_status"]["is_open"], true);

    let (app, _store) = create_app();
    assert_eq!(app.restaurant_details("r5").unwrap().highlight, None);
    assert!(app.restaurant_details("missing").is_none());
}
