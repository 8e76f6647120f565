use crate::{
    app::App,
    config::{Config, Credentials},
    gemini::{EdgeFunction, Gemini, GeminiDirect, GeminiProxy, GenerativeApi, LanguageModel},
    places::{GooglePlaces, PlacesProvider},
    store::{MemoryStore, Store, SupabaseStore},
    supabase::SupabaseClient,
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::sync::Arc;

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Builds the app from the configuration in `paths` and the given
    /// credentials.
    ///
    /// Supabase credentials select the Supabase store; without them the app
    /// runs in mock mode over an in-memory store.
    pub fn create_app(paths: &AppPaths, credentials: &Credentials) -> Result<App> {
        let config = Self::create_config(&paths.base_path)?;
        Self::create_app_with(config, credentials)
    }

    pub fn create_app_with(config: Arc<Config>, credentials: &Credentials) -> Result<App> {
        log::debug!("credentials: {credentials:?}");
        if credentials.is_mock_mode() {
            log::warn!("Supabase is not configured, running in mock mode");
        }

        let supabase = Self::create_supabase(credentials)?;
        let store = Self::create_store(&config, supabase.clone())?;
        let places = Self::create_places(credentials)?;
        let llm = Self::create_llm(&config, supabase, credentials)?;

        let app = App::new(config, store, places, llm);
        log::info!("{app:?}");
        Ok(app)
    }

    fn create_supabase(credentials: &Credentials) -> Result<Option<SupabaseClient>> {
        match credentials.supabase() {
            Some((url, key)) => Ok(Some(
                SupabaseClient::new(url, key).context("Failed to create Supabase client")?,
            )),
            None => Ok(None),
        }
    }

    fn create_store(config: &Config, supabase: Option<SupabaseClient>) -> Result<Arc<dyn Store>> {
        if let Some(client) = supabase {
            return Ok(Arc::new(SupabaseStore::new(client)));
        }

        match &config.mock_data_path {
            Some(path) => Ok(Arc::new(
                MemoryStore::load(path).with_context(|| format!("Failed to load mock data from {path}"))?,
            )),
            None => Ok(Arc::new(MemoryStore::default())),
        }
    }

    fn create_places(credentials: &Credentials) -> Result<Option<Arc<dyn PlacesProvider>>> {
        match &credentials.google_maps_api_key {
            Some(key) => Ok(Some(Arc::new(
                GooglePlaces::new(key).context("Failed to create Google Places client")?,
            ))),
            None => {
                log::warn!("GOOGLE_MAPS_API_KEY is not set, live place search disabled");
                Ok(None)
            }
        }
    }

    fn create_llm(
        config: &Config,
        supabase: Option<SupabaseClient>,
        credentials: &Credentials,
    ) -> Result<Option<Arc<dyn LanguageModel>>> {
        let direct = Self::create_gemini_direct(credentials)?;

        if supabase.is_none() && direct.is_none() {
            log::warn!("no Gemini access configured, AI features disabled");
            return Ok(None);
        }

        let edge = supabase.map(|client| Box::new(client) as Box<dyn EdgeFunction>);
        let direct = direct.map(|api| Box::new(api) as Box<dyn GenerativeApi>);

        Ok(Some(Arc::new(Gemini::new(edge, direct, config.gemini.clone()))))
    }

    /// Backs `/api/gemini-proxy`, when `GEMINI_API_KEY` is set.
    pub fn create_gemini_proxy(credentials: &Credentials) -> Result<Option<GeminiProxy>> {
        let direct = Self::create_gemini_direct(credentials)?;
        Ok(direct.map(|api| GeminiProxy::new(Box::new(api))))
    }

    /// Direct Gemini client, when `GEMINI_API_KEY` is set.
    fn create_gemini_direct(credentials: &Credentials) -> Result<Option<GeminiDirect>> {
        match &credentials.gemini_api_key {
            Some(key) => Ok(Some(
                GeminiDirect::new(key).context("Failed to create Gemini client")?,
            )),
            None => Ok(None),
        }
    }

    /// Get application paths with validation
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        Self::paths_in(&base_path)
    }

    pub fn paths_in(base_path: &str) -> Result<AppPaths> {
        // Ensure base directory exists
        std::fs::create_dir_all(base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths {
            base_path: base_path.to_string(),
        })
    }

    /// Create configuration with validation
    pub fn create_config(base_path: &str) -> Result<Arc<Config>> {
        let config = Config::load_with(base_path)?;
        Ok(Arc::new(config))
    }

    /// Get the base path for the application
    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("DEGUSTE_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(format!("{}/.local/share/deguste", home.to_string_lossy()))
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
}
