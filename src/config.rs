use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::model::Coordinates;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CITY: &str = "Taubaté";
const DEFAULT_STATE: &str = "SP";

/// Taubaté city centre, used as location bias when the caller sends none.
const DEFAULT_LAT: f64 = -23.023419;
const DEFAULT_LNG: f64 = -45.556276;

/// Search pipeline tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Google Places is queried when the database yields fewer results.
    #[serde(default = "default_places_fallback_threshold")]
    pub places_fallback_threshold: usize,

    /// Distance reported in results when the caller sets no limit.
    #[serde(default = "default_distance_km")]
    pub default_distance_km: f64,

    #[serde(default = "default_dish_match_limit")]
    pub dish_match_limit: usize,

    #[serde(default = "default_perola_min_rating")]
    pub perola_min_rating: f64,

    #[serde(default = "default_perola_min_reviews")]
    pub perola_min_reviews: u64,

    /// Queries of this length or shorter skip interpretation and dish search.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            places_fallback_threshold: default_places_fallback_threshold(),
            default_distance_km: default_distance_km(),
            dish_match_limit: default_dish_match_limit(),
            perola_min_rating: default_perola_min_rating(),
            perola_min_reviews: default_perola_min_reviews(),
            min_query_len: default_min_query_len(),
        }
    }
}

fn default_places_fallback_threshold() -> usize {
    3
}

fn default_distance_km() -> f64 {
    50.0
}

fn default_dish_match_limit() -> usize {
    30
}

fn default_perola_min_rating() -> f64 {
    4.7
}

fn default_perola_min_reviews() -> u64 {
    30
}

fn default_min_query_len() -> usize {
    2
}

/// Google Places text search settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacesConfig {
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,

    #[serde(default = "default_max_photos")]
    pub max_photos: usize,

    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// City spellings that, when present in a query, suppress the
    /// `em <city>` suffix.
    #[serde(default = "default_known_cities")]
    pub known_cities: Vec<String>,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            radius_m: default_radius_m(),
            max_photos: default_max_photos(),
            language_code: default_language_code(),
            known_cities: default_known_cities(),
        }
    }
}

fn default_radius_m() -> f64 {
    5000.0
}

fn default_max_photos() -> usize {
    3
}

fn default_language_code() -> String {
    "pt-BR".to_string()
}

fn default_known_cities() -> Vec<String> {
    [
        "taubaté",
        "taubate",
        "pindamonhangaba",
        "pinda",
        "tremembé",
        "tremembe",
        "caçapava",
        "cacapava",
        "são josé dos campos",
        "sjc",
        "ubatuba",
        "campos do jordão",
        "juiz de fora",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Language model settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the Supabase edge function that proxies Gemini.
    #[serde(default = "default_proxy_function")]
    pub proxy_function: String,

    /// Models tried in order when calling Gemini directly.
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,

    /// Primary and secondary model used by the proxy endpoint.
    #[serde(default = "default_proxy_models")]
    pub proxy_models: Vec<String>,

    #[serde(default = "default_search_temperature")]
    pub search_temperature: f32,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            proxy_function: default_proxy_function(),
            fallback_models: default_fallback_models(),
            proxy_models: default_proxy_models(),
            search_temperature: default_search_temperature(),
            chat_temperature: default_chat_temperature(),
        }
    }
}

fn default_proxy_function() -> String {
    "gemini-proxy".to_string()
}

fn default_fallback_models() -> Vec<String> {
    [
        "gemini-2.0-flash-lite",
        "gemini-2.0-flash",
        "gemini-1.5-flash-8b",
        "gemini-1.5-flash",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_proxy_models() -> Vec<String> {
    vec!["gemini-2.5-flash".to_string(), "gemini-1.5-flash".to_string()]
}

fn default_search_temperature() -> f32 {
    0.1
}

fn default_chat_temperature() -> f32 {
    0.7
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default = "default_state")]
    pub default_state: String,

    #[serde(default = "default_location")]
    pub default_location: Coordinates,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub places: PlacesConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    /// JSON fixture loaded into the in-memory store in mock mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_data_path: Option<String>,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            default_city: default_city(),
            default_state: default_state(),
            default_location: default_location(),
            search: SearchConfig::default(),
            places: PlacesConfig::default(),
            gemini: GeminiConfig::default(),
            mock_data_path: None,
            base_path: String::new(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

fn default_state() -> String {
    DEFAULT_STATE.to_string()
}

fn default_location() -> Coordinates {
    Coordinates::new(DEFAULT_LAT, DEFAULT_LNG)
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_city.trim().is_empty() {
            bail!("default_city must not be empty");
        }

        let loc = self.default_location;
        if !loc.lat.is_finite() || !(-90.0..=90.0).contains(&loc.lat) {
            bail!("default_location.lat must be between -90 and 90, got {}", loc.lat);
        }
        if !loc.lng.is_finite() || !(-180.0..=180.0).contains(&loc.lng) {
            bail!("default_location.lng must be between -180 and 180, got {}", loc.lng);
        }

        if !(self.places.radius_m > 0.0) {
            bail!("places.radius_m must be greater than 0");
        }
        if self.places.max_photos == 0 {
            bail!("places.max_photos must be greater than 0");
        }

        if self.gemini.fallback_models.is_empty() {
            bail!("gemini.fallback_models must list at least one model");
        }
        if self.gemini.proxy_models.is_empty() {
            bail!("gemini.proxy_models must list at least one model");
        }
        for (name, t) in [
            ("search_temperature", self.gemini.search_temperature),
            ("chat_temperature", self.gemini.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                bail!("gemini.{name} must be between 0.0 and 2.0, got {t}");
            }
        }

        if !(0.0..=5.0).contains(&self.search.perola_min_rating) {
            bail!(
                "search.perola_min_rating must be between 0 and 5, got {}",
                self.search.perola_min_rating
            );
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str =
            String::from_utf8(store.read("config.yaml")?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write("config.yaml", config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// Secrets for the remote services. Read from the environment only.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "[REDACTED]" } else { "None" };
        write!(
            f,
            "Credentials {{ supabase_url: {:?}, supabase_anon_key: {}, google_maps_api_key: {}, gemini_api_key: {} }}",
            self.supabase_url,
            mask(&self.supabase_anon_key),
            mask(&self.google_maps_api_key),
            mask(&self.gemini_api_key)
        )
    }
}

fn env_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            supabase_url: env_var(&["SUPABASE_URL", "VITE_SUPABASE_URL"]),
            supabase_anon_key: env_var(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]),
            google_maps_api_key: env_var(&["GOOGLE_MAPS_API_KEY", "VITE_GOOGLE_MAPS_API_KEY"]),
            gemini_api_key: env_var(&["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"]),
        }
    }

    /// URL and anon key, when both are present.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }

    /// Without Supabase the app serves data from the in-memory store.
    pub fn is_mock_mode(&self) -> bool {
        self.supabase().is_none()
    }
}
