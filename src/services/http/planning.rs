use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::extract::{Json, Path, Query};
use super::{dispatch, AppState, CurrentUser};
use crate::models::planning::{
    ConflictQuery, ConflictReport, EventOutcome, EventWindow, NewPlanningEvent, PlanningEvent,
    PlanningEventUpdate,
};
use crate::services::planning::PlanningRequest;
use crate::services::ServiceError;

/// A conflicting create or update is answered with 200 and the conflicting
/// events instead of an error.
fn outcome_response(outcome: EventOutcome, flag: &str, saved_status: StatusCode) -> Response {
    let mut body = serde_json::Map::new();
    let status = match outcome {
        EventOutcome::Saved(event) => {
            body.insert(flag.to_string(), json!(true));
            body.insert("event".to_string(), json!(event));
            body.insert("conflicts".to_string(), json!([]));
            saved_status
        }
        EventOutcome::Conflicts(conflicts) => {
            body.insert(flag.to_string(), json!(false));
            body.insert("conflicts".to_string(), json!(conflicts));
            StatusCode::OK
        }
    };

    (status, Json(serde_json::Value::Object(body))).into_response()
}

pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(window): Query<EventWindow>,
) -> Result<Json<Vec<PlanningEvent>>, ServiceError> {
    let events = dispatch(&state.planning_channel, |response| PlanningRequest::List {
        identity,
        window,
        response,
    })
    .await?;

    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(event_id): Path<String>,
) -> Result<Json<PlanningEvent>, ServiceError> {
    let event = dispatch(&state.planning_channel, |response| PlanningRequest::Get {
        identity,
        event_id,
        response,
    })
    .await?;

    Ok(Json(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(event): Json<NewPlanningEvent>,
) -> Result<Response, ServiceError> {
    let outcome = dispatch(&state.planning_channel, |response| PlanningRequest::Create {
        identity,
        event,
        response,
    })
    .await?;

    Ok(outcome_response(outcome, "created", StatusCode::CREATED))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(event_id): Path<String>,
    Json(update): Json<PlanningEventUpdate>,
) -> Result<Response, ServiceError> {
    let outcome = dispatch(&state.planning_channel, |response| PlanningRequest::Update {
        identity,
        event_id,
        update,
        response,
    })
    .await?;

    Ok(outcome_response(outcome, "updated", StatusCode::OK))
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(event_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    dispatch(&state.planning_channel, |response| PlanningRequest::Delete {
        identity,
        event_id,
        response,
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_conflicts(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<ConflictQuery>,
) -> Result<Json<ConflictReport>, ServiceError> {
    let report = dispatch(&state.planning_channel, |response| {
        PlanningRequest::Conflicts {
            identity,
            query,
            response,
        }
    })
    .await?;

    Ok(Json(report))
}
