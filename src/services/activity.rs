use super::RequestHandler;
use super::Service;
use super::ServiceError;

use crate::models::activity::{ActionType, ActivityEntry};
use crate::repositories::activity::ActivityRepository;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

pub enum ActivityRequest {
    Recent {
        user_id: String,
        limit: Option<i64>,
        response: oneshot::Sender<Result<Vec<ActivityEntry>, ServiceError>>,
    },
}

/// Appends an activity entry. Failures are logged and dropped.
pub async fn log_activity(
    repository: &dyn ActivityRepository,
    user_id: &str,
    action_type: ActionType,
    description: &str,
    ride_id: Option<&str>,
) {
    if let Err(e) = repository
        .record(user_id, action_type, description, ride_id)
        .await
    {
        log::warn!(
            "Could not record {:?} activity for {}: {}",
            action_type,
            user_id,
            e
        );
    }
}

#[derive(Clone)]
pub struct ActivityRequestHandler {
    repository: Arc<dyn ActivityRepository>,
}

impl ActivityRequestHandler {
    pub fn new(repository: Arc<dyn ActivityRepository>) -> Self {
        ActivityRequestHandler { repository }
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityEntry>, ServiceError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ServiceError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        self.repository
            .recent(user_id, limit)
            .await
            .map_err(ServiceError::repository("ActivityRepository"))
    }
}

#[async_trait]
impl RequestHandler<ActivityRequest> for ActivityRequestHandler {
    async fn handle_request(&self, request: ActivityRequest) {
        match request {
            ActivityRequest::Recent {
                user_id,
                limit,
                response,
            } => {
                let _ = response.send(self.recent(&user_id, limit).await);
            }
        }
    }
}

pub struct ActivityService;

impl ActivityService {
    pub fn new() -> Self {
        ActivityService {}
    }
}

#[async_trait]
impl Service<ActivityRequest, ActivityRequestHandler> for ActivityService {}
