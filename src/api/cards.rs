use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};

use super::extract::{Json, Path};
use super::{AppState, Credential};
use crate::cards::{Card, CardId, CardStore, CardUpdate, NewCard};
use crate::decks::DeckId;
use crate::error::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/decks/{deck}/cards", get(list_cards).post(create_card))
        .route(
            "/decks/{deck}/cards/{card}",
            get(get_card).patch(update_card).delete(delete_card),
        )
}

async fn list_cards(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<Vec<Card>>> {
    state
        .run(move |conn| {
            let requester = credential.optional(conn)?;
            CardStore::new(conn).list(deck, requester)
        })
        .await
        .map(Json)
}

async fn create_card(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
    Json(new_card): Json<NewCard>,
) -> Result<(StatusCode, Json<Card>)> {
    let card = state
        .run(move |conn| {
            let account = credential.require(conn)?;
            CardStore::new(conn).create(deck, Some(account.id), new_card)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn get_card(
    State(state): State<AppState>,
    credential: Credential,
    Path((deck, card)): Path<(DeckId, CardId)>,
) -> Result<Json<Card>> {
    state
        .run(move |conn| {
            let requester = credential.optional(conn)?;
            CardStore::new(conn).get(deck, card, requester)
        })
        .await
        .map(Json)
}

async fn update_card(
    State(state): State<AppState>,
    credential: Credential,
    Path((deck, card)): Path<(DeckId, CardId)>,
    Json(update): Json<CardUpdate>,
) -> Result<Json<Card>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            CardStore::new(conn).update(deck, card, Some(account.id), update)
        })
        .await
        .map(Json)
}

async fn delete_card(
    State(state): State<AppState>,
    credential: Credential,
    Path((deck, card)): Path<(DeckId, CardId)>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            CardStore::new(conn).delete(deck, card, Some(account.id))
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
