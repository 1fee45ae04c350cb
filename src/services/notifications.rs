use super::auth::Identity;
use super::{RequestHandler, Service, ServiceError};

use crate::models::notifications::{NotificationPreferences, PreferencesUpdate};
use crate::repositories::notifications::NotificationRepository;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

pub enum NotificationRequest {
    Preferences {
        identity: Identity,
        response: oneshot::Sender<Result<NotificationPreferences, ServiceError>>,
    },
    UpdatePreferences {
        identity: Identity,
        update: PreferencesUpdate,
        response: oneshot::Sender<Result<NotificationPreferences, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct NotificationRequestHandler {
    repository: Arc<dyn NotificationRepository>,
}

impl NotificationRequestHandler {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        NotificationRequestHandler { repository }
    }

    /// Stored preferences, or the all-enabled defaults.
    async fn preferences(&self, user_id: &str) -> Result<NotificationPreferences, ServiceError> {
        let prefs = self
            .repository
            .get_preferences(user_id)
            .await
            .map_err(ServiceError::repository("NotificationRepository"))?;

        Ok(prefs.unwrap_or_default())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreferences, ServiceError> {
        let mut prefs = self.preferences(user_id).await?;
        update.apply(&mut prefs);

        self.repository
            .save_preferences(user_id, &prefs)
            .await
            .map_err(ServiceError::repository("NotificationRepository"))
    }
}

#[async_trait]
impl RequestHandler<NotificationRequest> for NotificationRequestHandler {
    async fn handle_request(&self, request: NotificationRequest) {
        match request {
            NotificationRequest::Preferences { identity, response } => {
                let _ = response.send(self.preferences(&identity.user_id).await);
            }
            NotificationRequest::UpdatePreferences {
                identity,
                update,
                response,
            } => {
                let prefs = self.update_preferences(&identity.user_id, update).await;
                let _ = response.send(prefs);
            }
        }
    }
}

pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        NotificationService {}
    }
}

#[async_trait]
impl Service<NotificationRequest, NotificationRequestHandler> for NotificationService {}
