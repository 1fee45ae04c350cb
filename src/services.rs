use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::repositories::Repositories;
use crate::settings::{self, Settings};

mod activity;
pub mod auth;
mod badges;
mod credits;
mod groups;
pub mod http;
mod notifications;
mod personal_rides;
mod planning;
mod rides;
mod users;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Insufficient credits")]
    InsufficientCredits,
    #[error("Duplicate invitation: {0}")]
    DuplicateInvitation(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

impl ServiceError {
    pub fn repository(context: &'static str) -> impl Fn(anyhow::Error) -> ServiceError {
        move |e| ServiceError::Repository(context.to_string(), e.to_string())
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Starts one service per domain and returns the router state wired to
/// their channels.
pub fn spawn_services(
    repositories: Repositories,
    credits: &settings::Credits,
    badge_settings: &settings::Badges,
    verifier: Arc<dyn auth::IdentityVerifier>,
) -> http::AppState {
    let (ride_tx, mut ride_rx) = mpsc::channel(512);
    let (credit_tx, mut credit_rx) = mpsc::channel(512);
    let (badge_tx, mut badge_rx) = mpsc::channel(512);
    let (group_tx, mut group_rx) = mpsc::channel(512);
    let (planning_tx, mut planning_rx) = mpsc::channel(512);
    let (personal_ride_tx, mut personal_ride_rx) = mpsc::channel(512);
    let (notification_tx, mut notification_rx) = mpsc::channel(512);
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (activity_tx, mut activity_rx) = mpsc::channel(512);

    let evaluator = badges::BadgeEvaluator::new(
        repositories.badges.clone(),
        repositories.activity.clone(),
    );
    let accounts = users::Accounts::new(
        repositories.users.clone(),
        repositories.groups.clone(),
        evaluator.clone(),
        credits.starting_balance,
        badge_settings.early_adopter_cutoff,
    );

    log::info!("Starting ride service.");
    let mut ride_service = rides::RideService::new();
    let ride_handler = rides::RideRequestHandler::new(
        repositories.rides.clone(),
        repositories.groups.clone(),
        repositories.activity.clone(),
        accounts.clone(),
        evaluator.clone(),
    );
    tokio::spawn(async move {
        ride_service.run(ride_handler, &mut ride_rx).await;
    });

    log::info!("Starting credit service.");
    let mut credit_service = credits::CreditService::new();
    let credit_handler = credits::CreditRequestHandler::new(
        credits::Ledger::new(repositories.users.clone()),
        accounts.clone(),
        evaluator.clone(),
    );
    tokio::spawn(async move {
        credit_service.run(credit_handler, &mut credit_rx).await;
    });

    log::info!("Starting badge service.");
    let mut badge_service = badges::BadgeService::new();
    let badge_handler = badges::BadgeRequestHandler::new(evaluator.clone(), accounts.clone());
    tokio::spawn(async move {
        badge_service.run(badge_handler, &mut badge_rx).await;
    });

    log::info!("Starting group service.");
    let mut group_service = groups::GroupService::new();
    let group_handler = groups::GroupRequestHandler::new(
        repositories.groups.clone(),
        repositories.users.clone(),
        accounts.clone(),
    );
    tokio::spawn(async move {
        group_service.run(group_handler, &mut group_rx).await;
    });

    log::info!("Starting planning service.");
    let mut planning_service = planning::PlanningService::new();
    let planning_handler = planning::PlanningRequestHandler::new(repositories.planning.clone());
    tokio::spawn(async move {
        planning_service.run(planning_handler, &mut planning_rx).await;
    });

    log::info!("Starting personal ride service.");
    let mut personal_ride_service = personal_rides::PersonalRideService::new();
    let personal_ride_handler = personal_rides::PersonalRideRequestHandler::new(
        repositories.personal_rides.clone(),
        repositories.activity.clone(),
    );
    tokio::spawn(async move {
        personal_ride_service
            .run(personal_ride_handler, &mut personal_ride_rx)
            .await;
    });

    log::info!("Starting notification service.");
    let mut notification_service = notifications::NotificationService::new();
    let notification_handler =
        notifications::NotificationRequestHandler::new(repositories.notifications.clone());
    tokio::spawn(async move {
        notification_service
            .run(notification_handler, &mut notification_rx)
            .await;
    });

    log::info!("Starting user service.");
    let mut user_service = users::UserService::new();
    let user_handler = users::UserRequestHandler::new(accounts, repositories.users.clone());
    tokio::spawn(async move {
        user_service.run(user_handler, &mut user_rx).await;
    });

    log::info!("Starting activity service.");
    let mut activity_service = activity::ActivityService::new();
    let activity_handler = activity::ActivityRequestHandler::new(repositories.activity);
    tokio::spawn(async move {
        activity_service.run(activity_handler, &mut activity_rx).await;
    });

    http::AppState {
        verifier,
        ride_channel: ride_tx,
        credit_channel: credit_tx,
        badge_channel: badge_tx,
        group_channel: group_tx,
        planning_channel: planning_tx,
        personal_ride_channel: personal_ride_tx,
        notification_channel: notification_tx,
        user_channel: user_tx,
        activity_channel: activity_tx,
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let verifier = auth::build_verifier(&settings.auth);
    let state = spawn_services(
        Repositories::postgres(pool),
        &settings.credits,
        &settings.badges,
        verifier,
    );

    log::info!("Starting HTTP server.");
    http::start_http_server(state, &settings.server).await
}
