use crate::app::errors::AppError;
use crate::app::App;
use crate::model::{Favorite, Restaurant};

impl App {
    pub fn favorites(&self, user_id: &str) -> Vec<Favorite> {
        self.store.favorites(user_id).unwrap_or_else(|err| {
            log::error!("error fetching favorites: {err}");
            Vec::new()
        })
    }

    /// Adds or removes the favorite. Returns `true` when it was added.
    pub fn toggle_favorite(&self, user_id: &str, restaurant_id: &str) -> Result<bool, AppError> {
        match self.store.find_favorite(user_id, restaurant_id)? {
            Some(existing) => {
                self.store.delete_favorite(&existing.id)?;
                log::info!("user {user_id} unfavorited {restaurant_id}");
                Ok(false)
            }
            None => {
                self.store.insert_favorite(user_id, restaurant_id)?;
                log::info!("user {user_id} favorited {restaurant_id}");
                Ok(true)
            }
        }
    }

    pub fn favorite_ids(&self, user_id: &str) -> Vec<String> {
        self.favorites(user_id)
            .into_iter()
            .map(|f| f.restaurant_id)
            .collect()
    }

    pub fn favorite_restaurants(&self, user_id: &str) -> Vec<Restaurant> {
        self.store.favorite_restaurants(user_id).unwrap_or_else(|err| {
            log::error!("error fetching favorite restaurants: {err}");
            Vec::new()
        })
    }
}
