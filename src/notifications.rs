use crate::app::errors::AppError;
use crate::app::App;
use crate::model::Notification;

const PAGE_SIZE: usize = 30;

impl App {
    /// Newest first.
    pub fn notifications(&self, user_id: &str) -> Vec<Notification> {
        self.store
            .notifications(user_id, PAGE_SIZE)
            .unwrap_or_else(|err| {
                log::error!("error fetching notifications: {err}");
                Vec::new()
            })
    }

    pub fn mark_as_read(&self, notification_id: &str) -> Result<(), AppError> {
        self.store.mark_notification_read(notification_id)
    }

    pub fn mark_all_as_read(&self, user_id: &str) -> Result<(), AppError> {
        self.store.mark_all_notifications_read(user_id)
    }

    pub fn unread_count(&self, user_id: &str) -> u64 {
        self.store.unread_notifications(user_id).unwrap_or_else(|err| {
            log::warn!("unread count unavailable: {err}");
            0
        })
    }
}
