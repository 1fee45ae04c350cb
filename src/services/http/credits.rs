use axum::extract::State;
use serde::Deserialize;

use super::extract::{Json, Path, Query};
use super::{dispatch, AppState, CurrentUser};
use crate::models::users::{CreditBalance, CreditTransaction};
use crate::services::credits::CreditRequest;
use crate::services::ServiceError;

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct Adjustment {
    amount: i64,
}

pub async fn get_balance(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<CreditBalance>, ServiceError> {
    let balance = dispatch(&state.credit_channel, |response| CreditRequest::Balance {
        identity,
        response,
    })
    .await?;

    Ok(Json(balance))
}

pub async fn get_history(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CreditTransaction>>, ServiceError> {
    let history = dispatch(&state.credit_channel, |response| CreditRequest::History {
        identity,
        limit: query.limit,
        response,
    })
    .await?;

    Ok(Json(history))
}

pub async fn adjust_credits(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(user_id): Path<String>,
    Json(adjustment): Json<Adjustment>,
) -> Result<Json<CreditBalance>, ServiceError> {
    let balance = dispatch(&state.credit_channel, |response| CreditRequest::Adjust {
        identity,
        user_id,
        amount: adjustment.amount,
        response,
    })
    .await?;

    Ok(Json(balance))
}
