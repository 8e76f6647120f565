//! Photo decoding and fallback image selection.
//!
//! `photos` columns arrive as a JSON array, as a JSON-encoded string, or
//! occasionally as a string that was encoded twice. Everything here is
//! lenient: unreadable values decode to an empty list.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::RestaurantPhoto;
use crate::utils::text::comparable;

pub const FALLBACK_PHOTO_URL: &str =
    "https://images.unsplash.com/photo-1504674900247-0877df9cc836?w=800&q=80";

pub const DEFAULT_FOOD_IMAGE: &str =
    "https://images.unsplash.com/photo-1546069901-ba9599a7e63c?w=400&q=80";

/// Thumbnail used for feed entries whose restaurant has no photo.
pub const DEFAULT_THUMBNAIL: &str =
    "https://images.unsplash.com/photo-1555939594-58d7cb561ad1?w=400&q=80";

/// Keyword to image, checked in order against menu category and name.
const MENU_FALLBACK_IMAGES: [(&str, &str); 39] = [
    ("carnes", "https://images.unsplash.com/photo-1558030006-450675393462?w=400&q=80"),
    ("churrasco", "https://images.unsplash.com/photo-1558030006-450675393462?w=400&q=80"),
    ("sushi", "https://images.unsplash.com/photo-1579871494447-9811cf80d66c?w=400&q=80"),
    ("japonesa", "https://images.unsplash.com/photo-1579871494447-9811cf80d66c?w=400&q=80"),
    ("pizza", "https://images.unsplash.com/photo-1565299624946-b28f40a0ae38?w=400&q=80"),
    ("pizzas", "https://images.unsplash.com/photo-1565299624946-b28f40a0ae38?w=400&q=80"),
    ("massa", "https://images.unsplash.com/photo-1551183053-bf91a1d81141?w=400&q=80"),
    ("italiana", "https://images.unsplash.com/photo-1551183053-bf91a1d81141?w=400&q=80"),
    ("hamburger", "https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80"),
    ("hamburguer", "https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80"),
    ("lanche", "https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80"),
    ("lanches", "https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80"),
    ("sobremesa", "https://images.unsplash.com/photo-1551024601-bec78aea704b?w=400&q=80"),
    ("sobremesas", "https://images.unsplash.com/photo-1551024601-bec78aea704b?w=400&q=80"),
    ("doce", "https://images.unsplash.com/photo-1551024601-bec78aea704b?w=400&q=80"),
    ("cafe", "https://images.unsplash.com/photo-1509042239860-f550ce710b93?w=400&q=80"),
    ("café", "https://images.unsplash.com/photo-1509042239860-f550ce710b93?w=400&q=80"),
    ("bebida", "https://images.unsplash.com/photo-1544145945-f90425340c7e?w=400&q=80"),
    ("bebidas", "https://images.unsplash.com/photo-1544145945-f90425340c7e?w=400&q=80"),
    ("drinks", "https://images.unsplash.com/photo-1544145945-f90425340c7e?w=400&q=80"),
    ("refrigerante", "https://images.unsplash.com/photo-1622483767028-3f66f32aef97?w=400&q=80"),
    ("coca", "https://images.unsplash.com/photo-1622483767028-3f66f32aef97?w=400&q=80"),
    ("suco", "https://images.unsplash.com/photo-1622483767028-3f66f32aef97?w=400&q=80"),
    ("cerveja", "https://images.unsplash.com/photo-1559526324-4b87b5e36e44?w=400&q=80"),
    ("chopp", "https://images.unsplash.com/photo-1559526324-4b87b5e36e44?w=400&q=80"),
    ("salada", "https://images.unsplash.com/photo-1512621776951-a57141f2eefd?w=400&q=80"),
    ("saudavel", "https://images.unsplash.com/photo-1512621776951-a57141f2eefd?w=400&q=80"),
    ("frutos do mar", "https://images.unsplash.com/photo-1615141982883-c7ad0e69fd62?w=400&q=80"),
    ("peixe", "https://images.unsplash.com/photo-1615141982883-c7ad0e69fd62?w=400&q=80"),
    ("brasileira", "https://images.unsplash.com/photo-1598514983318-2f64f8f4796c?w=400&q=80"),
    ("entrada", "https://images.unsplash.com/photo-1541014741259-de529411b96a?w=400&q=80"),
    ("entradas", "https://images.unsplash.com/photo-1541014741259-de529411b96a?w=400&q=80"),
    ("petisco", "https://images.unsplash.com/photo-1541014741259-de529411b96a?w=400&q=80"),
    ("acai", "https://images.unsplash.com/photo-1590301157890-4810ed352733?w=400&q=80"),
    ("açaí", "https://images.unsplash.com/photo-1590301157890-4810ed352733?w=400&q=80"),
    ("prato", "https://images.unsplash.com/photo-1544025162-8a1152575293?w=400&q=80"),
    ("pratos", "https://images.unsplash.com/photo-1544025162-8a1152575293?w=400&q=80"),
    ("principais", "https://images.unsplash.com/photo-1544025162-8a1152575293?w=400&q=80"),
    ("porção", "https://images.unsplash.com/photo-1541014741259-de529411b96a?w=400&q=80"),
];

/// Decodes whatever shape a `photos` column holds.
pub fn decode(value: &Value) -> Vec<RestaurantPhoto> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value::<RestaurantPhoto>(item.clone()).ok())
            .collect(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::String(inner)) => serde_json::from_str::<Value>(&inner)
                .map(|v| match v {
                    Value::Array(_) => decode(&v),
                    _ => Vec::new(),
                })
                .unwrap_or_default(),
            Ok(v @ Value::Array(_)) => decode(&v),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// serde adapter for `Restaurant::photos`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<RestaurantPhoto>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decode(&value))
}

fn fallback_photo() -> RestaurantPhoto {
    RestaurantPhoto {
        id: "fallback-0".to_string(),
        url: FALLBACK_PHOTO_URL.to_string(),
        source: "deguste_fallback".to_string(),
        is_cover: true,
    }
}

/// Never empty: a single fallback photo stands in when there are no real
/// ones.
pub fn with_fallback(mut photos: Vec<RestaurantPhoto>) -> Vec<RestaurantPhoto> {
    if photos.is_empty() {
        photos.push(fallback_photo());
    }
    photos
}

/// URL of the cover photo, else the first photo, else the fallback photo.
pub fn cover_photo_url(photos: &[RestaurantPhoto]) -> String {
    let photos = with_fallback(photos.to_vec());
    photos
        .iter()
        .find(|p| p.is_cover)
        .map(|p| p.url.clone())
        .filter(|url| !url.is_empty())
        .or_else(|| photos.first().map(|p| p.url.clone()))
        .unwrap_or_default()
}

/// Image for a menu item.
///
/// Real uploads win. Unsplash URLs are placeholders injected into the
/// catalogue, so those are replaced by a keyword match on the category or
/// name, then by a generic food image.
pub fn menu_item_image(image_url: Option<&str>, category: Option<&str>, name: Option<&str>) -> String {
    if let Some(url) = image_url {
        if !url.is_empty() && !url.contains("images.unsplash.com") {
            return url.to_string();
        }
    }

    let terms = format!(
        "{} {}",
        comparable(category.unwrap_or_default()),
        comparable(name.unwrap_or_default())
    );

    MENU_FALLBACK_IMAGES
        .iter()
        .find(|(key, _)| terms.contains(&comparable(key)))
        .map(|(_, url)| url.to_string())
        .unwrap_or_else(|| DEFAULT_FOOD_IMAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_shapes() {
        let array = json!([{ "id": "1", "url": "https://a/1.jpg", "source": "google", "is_cover": true }]);
        assert_eq!(decode(&array).len(), 1);

        let encoded = Value::String(array.to_string());
        assert_eq!(decode(&encoded).len(), 1);

        let twice = Value::String(Value::String(array.to_string()).to_string());
        assert_eq!(decode(&twice).len(), 1);

        assert!(decode(&Value::Null).is_empty());
        assert!(decode(&Value::String("not json".to_string())).is_empty());
    }

    #[test]
    fn test_with_fallback() {
        let photos = with_fallback(decode(&Value::Null));
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].source, "deguste_fallback");
        assert!(photos[0].is_cover);
    }

    #[test]
    fn test_cover_photo_url() {
        let photos = decode(&json!([
            { "id": "0", "url": "https://a/0.jpg", "is_cover": false },
            { "id": "1", "url": "https://a/1.jpg", "is_cover": true }
        ]));
        assert_eq!(cover_photo_url(&photos), "https://a/1.jpg");

        let photos = decode(&json!([{ "id": "0", "url": "https://a/0.jpg" }]));
        assert_eq!(cover_photo_url(&photos), "https://a/0.jpg");

        assert_eq!(cover_photo_url(&[]), FALLBACK_PHOTO_URL);
    }

    #[test]
    fn test_menu_item_image() {
        assert_eq!(
            menu_item_image(Some("https://storage.example/menu/1.png"), None, None),
            "https://storage.example/menu/1.png"
        );

        let generic = "https://images.unsplash.com/photo-xyz";
        assert!(menu_item_image(Some(generic), Some("Sushi"), None).contains("1579871494447"));
        assert!(menu_item_image(None, None, Some("Açaí na tigela")).contains("1590301157890"));
        assert!(menu_item_image(None, Some("Café da manhã"), None).contains("1509042239860"));
        assert_eq!(menu_item_image(None, Some("Outros"), Some("Combo")), DEFAULT_FOOD_IMAGE);
    }
}
