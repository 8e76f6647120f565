pub mod errors;
pub mod factory;

pub use errors::AppError;
pub use factory::AppFactory;

use std::sync::Arc;

use crate::config::Config;
use crate::gemini::LanguageModel;
use crate::places::PlacesProvider;
use crate::store::Store;

/// Everything a request needs: configuration, data access and the optional
/// remote services. Cheap to clone.
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub places: Option<Arc<dyn PlacesProvider>>,
    pub llm: Option<Arc<dyn LanguageModel>>,
}

impl App {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        places: Option<Arc<dyn PlacesProvider>>,
        llm: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            config,
            store,
            places,
            llm,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("store", &self.store.name())
            .field("places", &self.places.as_ref().map(|p| p.name()))
            .field("llm", &self.llm.as_ref().map(|l| l.name()))
            .finish()
    }
}
