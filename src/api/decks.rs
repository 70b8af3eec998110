use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::extract::{Json, Path};
use super::{AppState, Credential};
use crate::accounts::AccountRef;
use crate::cards::Card;
use crate::decks::{
    CreatedDeck, Deck, DeckDetails, DeckId, DeckRatings, DeckStore, DeckUpdate, DeckView, NewDeck,
    RatingSummary,
};
use crate::error::Result;
use crate::progress::DueCardSelector;
use crate::subscriptions::SubscriptionRegistry;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/decks", get(my_decks).post(create_deck))
        .route(
            "/decks/{deck}",
            get(owner_view).patch(update_deck).delete(delete_deck),
        )
        .route("/decks/{deck}/progress", get(subscriber_view))
        .route("/decks/{deck}/due", get(due_cards))
        .route(
            "/decks/{deck}/subscription",
            get(subscription_status).post(subscribe).delete(unsubscribe),
        )
        .route(
            "/decks/{deck}/rating",
            get(my_rating).put(rate_deck).delete(remove_rating),
        )
        .route("/shop/{deck}", get(shop_view))
        .route("/shop/{deck}/ratings", get(rating_summary))
}

#[derive(Debug, Serialize)]
struct SubscriptionStatus {
    subscribed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct RatingBody {
    rating: Option<u8>,
}

async fn my_decks(State(state): State<AppState>, credential: Credential) -> Result<Json<Vec<Deck>>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).owned_by(&AccountRef::Id(account.id), Some(account.id))
        })
        .await
        .map(Json)
}

async fn create_deck(
    State(state): State<AppState>,
    credential: Credential,
    Json(new_deck): Json<NewDeck>,
) -> Result<(StatusCode, Json<CreatedDeck>)> {
    let created = state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).create(account.id, new_deck)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn owner_view(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<DeckDetails>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).details(deck, Some(account.id), DeckView::Owner)
        })
        .await
        .map(Json)
}

async fn update_deck(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
    Json(update): Json<DeckUpdate>,
) -> Result<Json<Deck>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).update(deck, Some(account.id), update)
        })
        .await
        .map(Json)
}

async fn delete_deck(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).delete(deck, Some(account.id))
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriber_view(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<DeckDetails>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).details(deck, Some(account.id), DeckView::Subscriber)
        })
        .await
        .map(Json)
}

async fn due_cards(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<Vec<Card>>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DueCardSelector::new(conn).due_cards(account.id, deck)
        })
        .await
        .map(Json)
}

async fn subscription_status(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<SubscriptionStatus>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckStore::new(conn).get(deck, Some(account.id))?;
            let subscribed = SubscriptionRegistry::new(conn).is_subscribed(account.id, deck)?;
            Ok(SubscriptionStatus { subscribed })
        })
        .await
        .map(Json)
}

async fn subscribe(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            SubscriptionRegistry::new(conn).subscribe(account.id, deck)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unsubscribe(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            SubscriptionRegistry::new(conn).unsubscribe(account.id, deck)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_rating(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<RatingBody>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            let rating = DeckRatings::new(conn).rating_of(account.id, deck)?;
            Ok(RatingBody { rating })
        })
        .await
        .map(Json)
}

async fn rate_deck(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
    Json(body): Json<RatingBody>,
) -> Result<Json<RatingSummary>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            // absent rating falls through to the range check
            DeckRatings::new(conn).rate(account.id, deck, body.rating.unwrap_or(0))
        })
        .await
        .map(Json)
}

async fn remove_rating(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            DeckRatings::new(conn).remove(account.id, deck)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn shop_view(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<DeckDetails>> {
    state
        .run(move |conn| {
            let requester = credential.optional(conn)?;
            DeckStore::new(conn).details(deck, requester, DeckView::Shop)
        })
        .await
        .map(Json)
}

async fn rating_summary(
    State(state): State<AppState>,
    credential: Credential,
    Path(deck): Path<DeckId>,
) -> Result<Json<RatingSummary>> {
    state
        .run(move |conn| {
            let requester = credential.optional(conn)?;
            DeckRatings::new(conn).summary(deck, requester)
        })
        .await
        .map(Json)
}
