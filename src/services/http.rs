use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::activity::ActivityRequest;
use super::auth::{self, AuthError, Identity, IdentityVerifier};
use super::badges::BadgeRequest;
use super::credits::CreditRequest;
use super::groups::GroupRequest;
use super::notifications::NotificationRequest;
use super::personal_rides::PersonalRideRequest;
use super::planning::PlanningRequest;
use super::rides::RideRequest;
use super::users::UserRequest;
use super::ServiceError;
use crate::settings;

mod activity;
mod badges;
mod credits;
mod extract;
mod groups;
mod notifications;
mod personal_rides;
mod planning;
mod rides;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub ride_channel: mpsc::Sender<RideRequest>,
    pub credit_channel: mpsc::Sender<CreditRequest>,
    pub badge_channel: mpsc::Sender<BadgeRequest>,
    pub group_channel: mpsc::Sender<GroupRequest>,
    pub planning_channel: mpsc::Sender<PlanningRequest>,
    pub personal_ride_channel: mpsc::Sender<PersonalRideRequest>,
    pub notification_channel: mpsc::Sender<NotificationRequest>,
    pub user_channel: mpsc::Sender<UserRequest>,
    pub activity_channel: mpsc::Sender<ActivityRequest>,
}

/// The authenticated caller of a route.
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::MalformedHeader))
            .transpose()?;

        let identity = auth::authenticate(state.verifier.as_ref(), header).await?;
        Ok(CurrentUser(identity))
    }
}

/// Sends one request to a service and waits for its answer.
pub(crate) async fn dispatch<R, T>(
    channel: &mpsc::Sender<R>,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication("Failed to process request".to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication("Failed to receive response".to_string(), e.to_string()))?
}

fn error_body(status: StatusCode, code: &str, description: String) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "description": description
        })),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ServiceError::InvalidState(_) => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            ServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ServiceError::InsufficientCredits => {
                (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_CREDITS")
            }
            ServiceError::DuplicateInvitation(_) => {
                (StatusCode::CONFLICT, "DUPLICATE_INVITATION")
            }
            ServiceError::Repository(..) | ServiceError::Communication(..) => {
                log::error!("{}", self);
                return error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error.".to_string(),
                );
            }
        };

        error_body(status, code, self.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = match &self {
            AuthError::MissingHeader | AuthError::MalformedHeader => "UNAUTHENTICATED",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
            AuthError::InvalidToken(_) => "INVALID_CREDENTIAL",
            AuthError::Provider(_) => {
                log::error!("{}", self);
                return error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error.".to_string(),
                );
            }
        };

        error_body(StatusCode::UNAUTHORIZED, code, self.to_string())
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/rides", post(rides::publish_ride).get(rides::list_rides))
        .route(
            "/rides/{id}",
            get(rides::get_ride).delete(rides::delete_ride),
        )
        .route("/rides/{id}/claim", post(rides::claim_ride))
        .route("/rides/{id}/complete", post(rides::complete_ride))
        .route("/my-rides", get(rides::my_rides))
        .route("/credits", get(credits::get_balance))
        .route("/credits/history", get(credits::get_history))
        .route("/admin/users/{user_id}/credits", post(credits::adjust_credits))
        .route("/badges", get(badges::get_catalog))
        .route("/users/{id}/badges", get(badges::get_user_badges))
        .route("/users/{id}/badges/{badge_id}", post(badges::award_badge))
        .route("/users/me", get(users::get_profile))
        .route("/users/me/verification", post(users::submit_verification))
        .route("/admin/verifications", get(users::get_pending_verifications))
        .route(
            "/admin/verifications/{user_id}",
            post(users::review_verification),
        )
        .route("/groups", post(groups::create_group).get(groups::list_groups))
        .route("/groups/{id}", get(groups::get_group))
        .route("/groups/{id}/invite", post(groups::invite_member))
        .route(
            "/personal-rides",
            post(personal_rides::create_personal_ride).get(personal_rides::list_personal_rides),
        )
        .route(
            "/personal-rides/stats/summary",
            get(personal_rides::get_stats),
        )
        .route(
            "/personal-rides/{id}",
            get(personal_rides::get_personal_ride)
                .put(personal_rides::update_personal_ride)
                .delete(personal_rides::delete_personal_ride),
        )
        .route(
            "/planning/events",
            get(planning::list_events).post(planning::create_event),
        )
        .route(
            "/planning/events/{id}",
            get(planning::get_event)
                .put(planning::update_event)
                .delete(planning::delete_event),
        )
        .route("/planning/conflicts", get(planning::get_conflicts))
        .route(
            "/notifications/preferences",
            get(notifications::get_preferences).put(notifications::update_preferences),
        )
        .route("/activity", get(activity::get_activity))
}

/// Every route is served at the root and under `/api/v1`.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(api_routes())
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    state: AppState,
    server: &settings::Server,
) -> Result<(), anyhow::Error> {
    let app = router(state, &server.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&server.listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
