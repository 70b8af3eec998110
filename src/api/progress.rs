use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::extract::{Json, Path};
use super::{AppState, Credential};
use crate::cards::CardId;
use crate::error::{Result, ServiceError};
use crate::progress::{Progress, ProgressLedger, ProgressPatch, ReviewOutcome, ReviewRating};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/progress/{card}",
            get(get_progress)
                .post(create_progress)
                .put(upsert_progress)
                .delete(delete_progress),
        )
        .route("/progress/{card}/review", post(review))
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    /// 1 = again, 2 = hard, 3 = good, 4 = easy
    rating: u8,
}

async fn get_progress(
    State(state): State<AppState>,
    credential: Credential,
    Path(card): Path<CardId>,
) -> Result<Json<Progress>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            ProgressLedger::new(conn).get(account.id, card)
        })
        .await
        .map(Json)
}

async fn create_progress(
    State(state): State<AppState>,
    credential: Credential,
    Path(card): Path<CardId>,
) -> Result<(StatusCode, Json<Progress>)> {
    let progress = state
        .run(move |conn| {
            let account = credential.require(conn)?;
            ProgressLedger::new(conn).create(account.id, card)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(progress)))
}

async fn upsert_progress(
    State(state): State<AppState>,
    credential: Credential,
    Path(card): Path<CardId>,
    Json(patch): Json<ProgressPatch>,
) -> Result<Json<Progress>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            ProgressLedger::new(conn).upsert(account.id, card, patch)
        })
        .await
        .map(Json)
}

async fn delete_progress(
    State(state): State<AppState>,
    credential: Credential,
    Path(card): Path<CardId>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            ProgressLedger::new(conn).delete(account.id, card)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn review(
    State(state): State<AppState>,
    credential: Credential,
    Path(card): Path<CardId>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<ReviewOutcome>> {
    let rating = ReviewRating::from_index(body.rating)
        .ok_or_else(|| ServiceError::bad_request("rating must be between 1 and 4"))?;
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            ProgressLedger::new(conn).record_review(account.id, card, rating)
        })
        .await
        .map(Json)
}
