use crate::config::{Config, Credentials};

const ENV_VARS: [&str; 8] = [
    "SUPABASE_URL",
    "VITE_SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "VITE_SUPABASE_ANON_KEY",
    "GOOGLE_MAPS_API_KEY",
    "VITE_GOOGLE_MAPS_API_KEY",
    "GEMINI_API_KEY",
    "VITE_GEMINI_API_KEY",
];

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

#[test]
pub fn test_load_creates_default_config() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let base_path = tmp.path().to_str().unwrap();

    let config = Config::load_with(base_path).unwrap();
    assert!(tmp.path().join("config.yaml").exists());
    assert_eq!(config.default_city, "Taubaté");
    assert_eq!(config.listen_addr, "0.0.0.0:8080");
    assert_eq!(config.search.places_fallback_threshold, 3);
    assert_eq!(config.base_path(), base_path);

    let reloaded = Config::load_with(base_path).unwrap();
    assert_eq!(config, reloaded);
}

#[test]
pub fn test_load_fills_missing_fields() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(
        tmp.path().join("config.yaml"),
        "default_city: Pindamonhangaba\nsearch:\n  perola_min_rating: 4.5\n",
    )
    .unwrap();

    let config = Config::load_with(tmp.path().to_str().unwrap()).unwrap();
    assert_eq!(config.default_city, "Pindamonhangaba");
    assert_eq!(config.search.perola_min_rating, 4.5);
    assert_eq!(config.search.perola_min_reviews, 30);
    assert_eq!(config.places.language_code, "pt-BR");

    // upgraded file now lists every field
    let saved = std::fs::read_to_string(tmp.path().join("config.yaml")).unwrap();
    assert!(saved.contains("listen_addr"));
    assert!(saved.contains("fallback_models"));
}

#[test]
pub fn test_load_rejects_invalid_config() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let base_path = tmp.path().to_str().unwrap();

    std::fs::write(tmp.path().join("config.yaml"), "default_city: ''\n").unwrap();
    assert!(Config::load_with(base_path).is_err());

    std::fs::write(
        tmp.path().join("config.yaml"),
        "default_location:\n  lat: 120.0\n  lng: 0.0\n",
    )
    .unwrap();
    assert!(Config::load_with(base_path).is_err());

    std::fs::write(tmp.path().join("config.yaml"), "search: [not, a, map]\n").unwrap();
    assert!(Config::load_with(base_path).is_err());
}

#[test]
pub fn test_validate() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.gemini.chat_temperature = 3.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.gemini.fallback_models.clear();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.places.radius_m = 0.0;
    assert!(config.validate().is_err());
}

#[test]
#[serial_test::serial]
pub fn test_credentials_from_env() {
    clear_env();

    let credentials = Credentials::from_env();
    assert!(credentials.is_mock_mode());
    assert_eq!(credentials, Credentials::default());

    std::env::set_var("VITE_SUPABASE_URL", "https://project.supabase.co");
    std::env::set_var("SUPABASE_ANON_KEY", "   ");
    std::env::set_var("VITE_SUPABASE_ANON_KEY", "anon-secret");
    std::env::set_var("GEMINI_API_KEY", "gemini-secret");

    let credentials = Credentials::from_env();
    clear_env();

    assert!(!credentials.is_mock_mode());
    assert_eq!(
        credentials.supabase(),
        Some(("https://project.supabase.co", "anon-secret"))
    );
    assert_eq!(credentials.gemini_api_key.as_deref(), Some("gemini-secret"));
    assert_eq!(credentials.google_maps_api_key, None);

    let debug = format!("{credentials:?}");
    assert!(!debug.contains("anon-secret"));
    assert!(!debug.contains("gemini-secret"));
    assert!(debug.contains("[REDACTED]"));
}
